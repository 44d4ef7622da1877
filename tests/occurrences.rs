//! Recurrence projection scenarios run through the reminder store.

use daygrid::datemath::{self, CalendarDate};
use daygrid::locale::{FirstWeekday, Locale};
use daygrid::model::{Reminder, RepeatKind, RepeatRule, WeekdaySet};
use daygrid::store::ReminderStore;

fn store_at(today: CalendarDate) -> ReminderStore {
    let mut store = ReminderStore::new(FirstWeekday::Monday, Locale::default(), today);
    store.load(Vec::new(), Vec::new());
    store
}

fn repeating(id: &str, date: CalendarDate, kind: RepeatKind, count: u32) -> Reminder {
    let mut reminder = Reminder::new(id.into(), format!("reminder {}", id), date);
    reminder.repeat = Some(RepeatRule {
        kind,
        count,
        end_date: None,
    });
    reminder
}

fn mon_wed_fri() -> WeekdaySet {
    let mut set = WeekdaySet::none();
    set.selected[0] = true;
    set.selected[2] = true;
    set.selected[4] = true;
    set
}

#[test]
fn finite_rule_emits_exactly_count_occurrences() {
    let mut store = store_at(CalendarDate::new(2024, 0, 1));
    store
        .add(repeating("a", CalendarDate::new(2024, 1, 5), RepeatKind::Week, 5))
        .unwrap();
    assert_eq!(store.occurrences("a").len(), 5);
}

#[test]
fn day_rule_with_count_three() {
    // anchor 2024-01-15, repeat daily, 3 occurrences total
    let mut store = store_at(CalendarDate::new(2024, 0, 1));
    store
        .add(repeating("a", CalendarDate::new(2024, 0, 15), RepeatKind::Day, 3))
        .unwrap();
    assert_eq!(
        store.occurrences("a"),
        vec![
            CalendarDate::new(2024, 0, 15),
            CalendarDate::new(2024, 0, 16),
            CalendarDate::new(2024, 0, 17),
        ]
    );
}

#[test]
fn day_rule_crosses_short_february() {
    // February 2023 has 28 days: the third daily occurrence lands on March 1st
    let mut store = store_at(CalendarDate::new(2023, 1, 27));
    store
        .add(repeating("a", CalendarDate::new(2023, 1, 27), RepeatKind::Day, 0))
        .unwrap();
    let dates = store.occurrences("a");
    assert_eq!(dates[0], CalendarDate::new(2023, 1, 27));
    assert_eq!(dates[1], CalendarDate::new(2023, 1, 28));
    assert_eq!(dates[2], CalendarDate::new(2023, 2, 1));
}

#[test]
fn day_rule_lands_on_leap_day() {
    let mut store = store_at(CalendarDate::new(2024, 1, 28));
    store
        .add(repeating("a", CalendarDate::new(2024, 1, 28), RepeatKind::Day, 2))
        .unwrap();
    assert_eq!(
        store.occurrences("a"),
        vec![CalendarDate::new(2024, 1, 28), CalendarDate::new(2024, 1, 29)]
    );
}

#[test]
fn weekday_rule_advances_seven_days_per_cycle() {
    // 2024-01-15 is a Monday; Mon/Wed/Fri selected
    let mut store = store_at(CalendarDate::new(2024, 0, 1));
    store
        .add(repeating(
            "a",
            CalendarDate::new(2024, 0, 15),
            RepeatKind::Weekday {
                weekdays: mon_wed_fri(),
                first_weekday: FirstWeekday::Monday,
            },
            9,
        ))
        .unwrap();
    let dates = store.occurrences("a");
    assert_eq!(dates.len(), 9);
    let deltas: Vec<i64> = dates
        .windows(2)
        .map(|pair| datemath::days_between(pair[0], pair[1]))
        .collect();
    assert_eq!(deltas, vec![2, 2, 3, 2, 2, 3, 2, 2]);
    // one full cycle spans exactly a week
    assert_eq!(
        datemath::days_between(dates[0], dates[3]),
        7,
    );
}

#[test]
fn first_weekday_change_keeps_weekday_rule_dates() {
    let mut store = store_at(CalendarDate::new(2024, 0, 1));
    store
        .add(repeating(
            "a",
            CalendarDate::new(2024, 0, 15),
            RepeatKind::Weekday {
                weekdays: mon_wed_fri(),
                first_weekday: FirstWeekday::Monday,
            },
            12,
        ))
        .unwrap();
    let before = store.occurrences("a");
    store.change_first_weekday(FirstWeekday::Sunday);
    assert_eq!(store.occurrences("a"), before);
}

#[test]
fn month_rule_clamps_to_short_months_and_recovers() {
    // anchored on day-of-month 31
    let mut store = store_at(CalendarDate::new(2024, 0, 1));
    store
        .add(repeating("a", CalendarDate::new(2024, 0, 31), RepeatKind::Month, 6))
        .unwrap();
    assert_eq!(
        store.occurrences("a"),
        vec![
            CalendarDate::new(2024, 0, 31),
            CalendarDate::new(2024, 1, 29), // clamped to leap February's last day
            CalendarDate::new(2024, 2, 31), // true day-of-month recovered
            CalendarDate::new(2024, 3, 30), // April clamps again
            CalendarDate::new(2024, 4, 31),
            CalendarDate::new(2024, 5, 30),
        ]
    );
}

#[test]
fn end_date_exactly_on_occurrence_is_last() {
    let mut store = store_at(CalendarDate::new(2024, 0, 1));
    let mut reminder = repeating("a", CalendarDate::new(2024, 0, 10), RepeatKind::Week, 0);
    if let Some(rule) = reminder.repeat.as_mut() {
        rule.end_date = Some(CalendarDate::new(2024, 0, 24));
    }
    store.add(reminder).unwrap();
    assert_eq!(
        store.occurrences("a"),
        vec![
            CalendarDate::new(2024, 0, 10),
            CalendarDate::new(2024, 0, 17),
            CalendarDate::new(2024, 0, 24),
        ]
    );
}

#[test]
fn end_date_between_occurrences_truncates_before_it() {
    let mut store = store_at(CalendarDate::new(2024, 0, 1));
    let mut reminder = repeating("a", CalendarDate::new(2024, 0, 10), RepeatKind::Week, 0);
    if let Some(rule) = reminder.repeat.as_mut() {
        rule.end_date = Some(CalendarDate::new(2024, 0, 20));
    }
    store.add(reminder).unwrap();
    assert_eq!(
        store.occurrences("a"),
        vec![CalendarDate::new(2024, 0, 10), CalendarDate::new(2024, 0, 17)]
    );
}

#[test]
fn removal_purges_and_identical_rule_reprojects_identically() {
    let mut store = store_at(CalendarDate::new(2024, 0, 1));
    store
        .add(repeating("a", CalendarDate::new(2024, 0, 31), RepeatKind::Month, 8))
        .unwrap();
    let original = store.occurrences("a");
    assert!(!original.is_empty());

    store.remove("a").unwrap();
    assert!(store.occurrences("a").is_empty());

    store
        .add(repeating("b", CalendarDate::new(2024, 0, 31), RepeatKind::Month, 8))
        .unwrap();
    assert_eq!(store.occurrences("b"), original);
}

#[test]
fn infinite_rule_resumes_when_navigation_crosses_the_year() {
    let mut store = store_at(CalendarDate::new(2024, 11, 15));
    store
        .add(repeating("a", CalendarDate::new(2024, 11, 30), RepeatKind::Day, 0))
        .unwrap();
    let dates = store.occurrences("a");
    assert_eq!(*dates.last().unwrap(), CalendarDate::new(2024, 11, 31));

    // December -> January materializes the next year and resumes the rule
    store.change_month(1);
    let dates = store.occurrences("a");
    assert!(dates.contains(&CalendarDate::new(2025, 0, 1)));
    assert_eq!(*dates.last().unwrap(), CalendarDate::new(2025, 11, 31));
}

#[test]
fn ensure_year_drains_pending_rules() {
    let mut store = store_at(CalendarDate::new(2024, 10, 1));
    store
        .add(repeating("a", CalendarDate::new(2024, 10, 20), RepeatKind::Week, 0))
        .unwrap();
    assert!(!store
        .occurrences("a")
        .iter()
        .any(|d| d.year == 2025));
    store.ensure_year(2025);
    assert!(store.occurrences("a").iter().any(|d| d.year == 2025));
}

#[test]
fn dormant_past_anchor_fast_forwards_without_skipping() {
    // anchor two years before "today": every intervening year is
    // materialized so no occurrence is silently dropped
    let mut store = store_at(CalendarDate::new(2024, 5, 1));
    store
        .add(repeating("a", CalendarDate::new(2022, 0, 1), RepeatKind::Week, 0))
        .unwrap();
    let dates = store.occurrences("a");
    assert_eq!(dates[0], CalendarDate::new(2022, 0, 1));
    assert!(dates.iter().any(|d| d.year == 2023));
    assert!(dates.iter().any(|d| d.year == 2024));
    for pair in dates.windows(2) {
        assert_eq!(datemath::days_between(pair[0], pair[1]), 7);
    }
}

#[test]
fn custom_rule_in_weeks() {
    let mut store = store_at(CalendarDate::new(2024, 0, 1));
    store
        .add(repeating(
            "a",
            CalendarDate::new(2024, 0, 3),
            RepeatKind::Custom {
                gap: 2,
                unit: daygrid::model::CustomUnit::Weeks,
            },
            3,
        ))
        .unwrap();
    assert_eq!(
        store.occurrences("a"),
        vec![
            CalendarDate::new(2024, 0, 3),
            CalendarDate::new(2024, 0, 17),
            CalendarDate::new(2024, 0, 31),
        ]
    );
}

#[test]
fn custom_month_rule_clamps_without_carry() {
    // anchored on the 31st, stepping one calendar month at a time:
    // short months clamp to their last day, long months restore the 31st
    let mut store = store_at(CalendarDate::new(2024, 0, 1));
    store
        .add(repeating(
            "a",
            CalendarDate::new(2024, 0, 31),
            RepeatKind::Custom {
                gap: 1,
                unit: daygrid::model::CustomUnit::Months,
            },
            4,
        ))
        .unwrap();
    assert_eq!(
        store.occurrences("a"),
        vec![
            CalendarDate::new(2024, 0, 31),
            CalendarDate::new(2024, 1, 29),
            CalendarDate::new(2024, 2, 31),
            CalendarDate::new(2024, 3, 30),
        ]
    );
}
