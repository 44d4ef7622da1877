use crate::calendar::Calendar;
use crate::datemath::{self, CalendarDate};
use crate::locale::FirstWeekday;
use crate::model::{Cursor, CustomUnit, Reminder, RepeatKind, WeekdaySet};

/// Result of one projection pass over a repeating reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// The rule is exhausted (finite count reached or end date hit) or
    /// the reminder has no repeat rule. Nothing left to resume.
    Done,
    /// The next occurrence falls in a future year that is not yet
    /// materialized. The cursor holds the corrected position; the store
    /// queues the reminder and resumes it when that year is created.
    Suspended,
}

/// Projects the next occurrences of `reminder` onto the calendar,
/// starting from its cursor (or from the anchor date when no cursor
/// exists yet). Re-entrant: called once at creation and again whenever a
/// new year is materialized.
///
/// Years at or before `today`'s are materialized eagerly while the cursor
/// is fast-forwarded, so a long-dormant rule with a past anchor never
/// skips occurrences. Future years suspend instead.
pub fn project(calendar: &mut Calendar, reminder: &mut Reminder, today: CalendarDate) -> Projection {
    let Some(rule) = reminder.repeat.clone() else {
        return Projection::Done;
    };
    let anchor_day = reminder.day;
    let id = reminder.id.clone();

    if reminder.next_repeat.is_none() {
        let gaps = match &rule.kind {
            RepeatKind::Weekday {
                weekdays,
                first_weekday,
            } => weekday_gaps(
                weekdays,
                *first_weekday,
                calendar.first_weekday,
                reminder.anchor(),
            ),
            _ => Vec::new(),
        };
        reminder.next_repeat = Some(Cursor {
            year: reminder.year,
            month: reminder.month,
            day_index: reminder.day as i64 - 1,
            repeats_remaining: rule.count,
            gap_index: 0,
            gaps,
            overflow_days: 0,
            done: false,
        });
    }
    let Some(cursor) = reminder.next_repeat.as_mut() else {
        return Projection::Done;
    };
    if cursor.done {
        return Projection::Done;
    }

    loop {
        let (year, month, day) = datemath::normalize(cursor.year, cursor.month, cursor.day_index);

        if !calendar.contains_year(year) {
            if year <= today.year {
                calendar.ensure_year(year);
            } else {
                cursor.year = year;
                cursor.month = month;
                cursor.day_index = day as i64;
                return Projection::Suspended;
            }
        }
        cursor.year = year;
        cursor.month = month;
        cursor.day_index = day as i64;

        let occurrence = CalendarDate::new(year, month, day + 1);

        if let Some(end) = rule.end_date {
            if occurrence > end {
                cursor.done = true;
                return Projection::Done;
            }
        }

        if let Some(slot) = calendar.day_mut(occurrence) {
            slot.reminders.push(id.clone());
        }

        if rule.end_date == Some(occurrence) {
            cursor.done = true;
            return Projection::Done;
        }

        if rule.count > 0 {
            cursor.repeats_remaining -= 1;
            if cursor.repeats_remaining == 0 {
                cursor.done = true;
                return Projection::Done;
            }
        }

        match &rule.kind {
            RepeatKind::Day => cursor.day_index += 1,
            RepeatKind::Week => cursor.day_index += 7,
            RepeatKind::Weekday { .. } => {
                cursor.day_index += cursor.gaps[cursor.gap_index] as i64;
                cursor.gap_index = (cursor.gap_index + 1) % cursor.gaps.len();
            }
            RepeatKind::Custom { gap, unit } => {
                let gap = (*gap).max(1) as i64;
                match unit {
                    CustomUnit::Days => cursor.day_index += gap,
                    CustomUnit::Weeks => cursor.day_index += gap * 7,
                    CustomUnit::Months => {
                        cursor.day_index += month_jump_days(
                            cursor.year,
                            cursor.month,
                            cursor.day_index,
                            gap,
                            anchor_day,
                        );
                    }
                }
            }
            RepeatKind::Month => {
                let next_len = datemath::days_in_month(cursor.year, cursor.month as i64 + 1);
                if anchor_day > next_len {
                    // The next month cannot hold the anchor day-of-month:
                    // land on its last day and carry the shortfall. The
                    // carry is recomputed from the anchor each time, so
                    // consecutive short months each clamp independently.
                    cursor.overflow_days = anchor_day - next_len;
                    cursor.day_index += next_len as i64;
                } else {
                    let len = datemath::days_in_month(cursor.year, cursor.month as i64);
                    cursor.day_index += len as i64 + cursor.overflow_days as i64;
                    cursor.overflow_days = 0;
                }
            }
        }
    }
}

/// Day-count delta that moves the cursor `gap` calendar months forward,
/// landing on the anchor day-of-month clamped to the target month length.
fn month_jump_days(year: i32, month: usize, day_index: i64, gap: i64, anchor_day: u32) -> i64 {
    let mut delta = -(day_index + 1);
    for i in 0..gap {
        delta += datemath::days_in_month(year, month as i64 + i) as i64;
    }
    let target_len = datemath::days_in_month(year, month as i64 + gap);
    delta + anchor_day.min(target_len) as i64
}

/// Cyclic day-deltas between consecutive selected weekdays, starting from
/// the anchor's display position under the current first-weekday setting.
/// For a selection of W weekdays (anchor included) the sequence has W
/// entries and sums to 7 per full cycle.
fn weekday_gaps(
    set: &WeekdaySet,
    recorded: FirstWeekday,
    current: FirstWeekday,
    anchor: CalendarDate,
) -> Vec<u32> {
    let dynamic = set.dynamic(recorded, current);
    let anchor_pos =
        current.display_position(datemath::weekday_of(anchor.year, anchor.month, anchor.day));
    let mut gaps = Vec::new();
    let mut gap = 0u32;
    let mut pos = anchor_pos;
    loop {
        pos = (pos + 1) % 7;
        gap += 1;
        if pos == anchor_pos {
            gaps.push(gap);
            break;
        }
        if dynamic[pos] {
            gaps.push(gap);
            gap = 0;
        }
    }
    gaps
}
