use crate::cli::{FirstWeekdayArg, RepeatArg, UnitArg};
use crate::datemath::{self, CalendarDate};
use crate::external::{ExternalSource, FileSource};
use crate::locale::FirstWeekday;
use crate::model::{
    CustomUnit, Origin, Reminder, RepeatKind, RepeatRule, TimeRange, WeekdaySet,
};
use crate::storage::{self, Settings, StoreLocation};
use crate::store::ReminderStore;
use crate::ui;
use anyhow::{anyhow, bail, Result};
use rand::{distributions::Alphanumeric, Rng};

pub struct RepeatArgs {
    pub repeat: Option<RepeatArg>,
    pub every: Option<u32>,
    pub unit: Option<UnitArg>,
    pub count: Option<u32>,
    pub until: Option<String>,
    pub on: Option<String>,
}

impl RepeatArgs {
    fn is_empty(&self) -> bool {
        self.repeat.is_none()
            && self.every.is_none()
            && self.unit.is_none()
            && self.count.is_none()
            && self.until.is_none()
            && self.on.is_none()
    }
}

pub fn add(
    title: String,
    date: String,
    time: Option<String>,
    repeat: RepeatArgs,
    color: Option<String>,
) -> Result<()> {
    let (mut store, location, _) = load_store()?;
    let anchor = parse_date(&date)?;
    let mut reminder = Reminder::new(generate_id(), title, anchor);
    reminder.range = time.as_deref().map(parse_time).transpose()?;
    reminder.color = color.unwrap_or_else(random_hsl_color);
    reminder.repeat = build_rule(&repeat, store.first_weekday(), None)?;
    let id = reminder.id.clone();
    store.add(reminder)?;
    persist(&store, &location)?;
    println!("Added reminder {} on {}", id, anchor);
    Ok(())
}

pub fn list(month: Option<String>) -> Result<()> {
    let (mut store, _, _) = load_store()?;
    let (year, month) = match month {
        Some(m) => parse_month(&m)?,
        None => {
            let today = store.today();
            (today.year, today.month)
        }
    };
    store.ensure_year(year);
    let days = datemath::days_in_month(year, month as i64);
    let mut empty = true;
    for day in 1..=days {
        let date = CalendarDate::new(year, month, day);
        let Some(view) = store.day_view(date) else {
            continue;
        };
        if view.reminders.is_empty() {
            continue;
        }
        empty = false;
        println!("{} ({})", date, view.weekday_name);
        for reminder in view.reminders {
            let mut line = format!("  - {}: {}", reminder.id, reminder.title);
            if let Some(range) = &reminder.range {
                line.push_str(&format!(" [{}]", range.text()));
            }
            if let Some(rule) = &reminder.repeat {
                line.push_str(&format!(" ({})", rule.summary()));
            }
            if reminder.origin == Origin::External {
                line.push_str(" (external)");
            }
            println!("{}", line);
        }
    }
    if empty {
        println!("No reminders in {}", store.month_label(year, month));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn edit(
    id: String,
    title: Option<String>,
    date: Option<String>,
    time: Option<String>,
    repeat: RepeatArgs,
    color: Option<String>,
    clear_repeat: bool,
) -> Result<()> {
    let (mut store, location, _) = load_store()?;
    let anchor = date.as_deref().map(parse_date).transpose()?;
    let range = time.as_deref().map(parse_time).transpose()?;
    let existing = store
        .reminder(&id)
        .ok_or_else(|| anyhow!("reminder {} not found", id))?
        .repeat
        .clone();
    // rule flags without --repeat merge into the existing rule
    let rule = if clear_repeat {
        None
    } else {
        build_rule(&repeat, store.first_weekday(), existing.as_ref())?
    };
    store.update(&id, |reminder| {
        if let Some(t) = title {
            reminder.title = t;
        }
        if let Some(a) = anchor {
            reminder.year = a.year;
            reminder.month = a.month;
            reminder.day = a.day;
        }
        if let Some(r) = range {
            reminder.range = Some(r);
        }
        if let Some(c) = color {
            reminder.color = c;
        }
        reminder.repeat = rule;
    })?;
    persist(&store, &location)?;
    println!("Updated reminder {}", id);
    Ok(())
}

pub fn remove(id: String) -> Result<()> {
    let (mut store, location, _) = load_store()?;
    let origin = store
        .reminder(&id)
        .map(|r| (r.origin, r.source_id.clone()))
        .ok_or_else(|| anyhow!("reminder {} not found", id))?;
    if let (Origin::External, Some(source_id)) = origin {
        let mut source = FileSource::new(location.external_feed.clone());
        source
            .remove_event(&source_id, &id)
            .map_err(|e| anyhow!("unable to delete the external event: {}", e))?;
    }
    store.remove(&id)?;
    persist(&store, &location)?;
    println!("Removed reminder {}", id);
    Ok(())
}

pub fn show(month: Option<String>) -> Result<()> {
    let (mut store, _, _) = load_store()?;
    let (year, month) = match month {
        Some(m) => parse_month(&m)?,
        None => {
            let today = store.today();
            (today.year, today.month)
        }
    };
    store.ensure_year(year);
    while store.visible() != (year, month) {
        let (vy, vm) = store.visible();
        let direction = if (year, month) < (vy, vm) { -1 } else { 1 };
        store.change_month(direction);
    }
    let window = store.view_window();
    println!("{}", window.current.date_string);
    let header = store
        .weekday_header()
        .iter()
        .map(|name| format!("{:>4}", name))
        .collect::<String>();
    println!("{}", header);

    let mut cells: Vec<String> = Vec::with_capacity(42);
    for day in &window.previous.days {
        cells.push(format!("{:>4}", format!("({})", day.day)));
    }
    for day in &window.current.days {
        let mark = if day.is_current_day {
            format!("*{}", day.day)
        } else if !day.reminders.is_empty() {
            format!("{}.", day.day)
        } else {
            day.day.to_string()
        };
        cells.push(format!("{:>4}", mark));
    }
    for day in &window.next.days {
        cells.push(format!("{:>4}", format!("({})", day.day)));
    }
    for row in cells.chunks(7) {
        println!("{}", row.concat());
    }
    Ok(())
}

pub fn config(first_weekday: Option<FirstWeekdayArg>) -> Result<()> {
    let location = storage::default_location()?;
    let mut settings = storage::load_settings(&location.settings)?;
    if let Some(value) = first_weekday {
        settings.first_weekday = match value {
            FirstWeekdayArg::Monday => FirstWeekday::Monday,
            FirstWeekdayArg::Sunday => FirstWeekday::Sunday,
        };
        storage::save_settings(&location.settings, &settings)?;
        println!("First weekday set to {:?}", settings.first_weekday);
    } else {
        println!("first-weekday: {:?}", settings.first_weekday);
    }
    Ok(())
}

pub fn tui() -> Result<()> {
    let (store, location, settings) = load_store()?;
    ui::run(store, location, settings)
}

fn load_store() -> Result<(ReminderStore, StoreLocation, Settings)> {
    let location = storage::default_location()?;
    let settings = storage::load_settings(&location.settings)?;
    let reminders = storage::load_reminders(&location.reminders)?;
    let mut store = ReminderStore::new(
        settings.first_weekday,
        settings.locale.clone(),
        CalendarDate::today(),
    );
    // an unreachable external feed degrades to local reminders only
    let external = match FileSource::new(location.external_feed.clone()).fetch() {
        Ok(feed) => feed.reminders,
        Err(err) => {
            eprintln!("warning: {}", err);
            Vec::new()
        }
    };
    store.load(reminders, external);
    Ok((store, location, settings))
}

fn persist(store: &ReminderStore, location: &StoreLocation) -> Result<()> {
    let report = storage::save_reminders(&location.reminders, &store.local_reminders())?;
    if !report.written {
        eprintln!("warning: reminder storage is full; changes were not persisted");
    }
    Ok(())
}

fn parse_date(input: &str) -> Result<CalendarDate> {
    let parts: Vec<&str> = input.trim().split('-').collect();
    if parts.len() != 3 {
        bail!("invalid date format (use YYYY-MM-DD): {}", input);
    }
    let year: i32 = parts[0].parse()?;
    let month: usize = parts[1].parse()?;
    let day: u32 = parts[2].parse()?;
    if !(1..=12).contains(&month) {
        bail!("month out of range in {}", input);
    }
    let month = month - 1;
    if day == 0 || day > datemath::days_in_month(year, month as i64) {
        bail!("day out of range in {}", input);
    }
    Ok(CalendarDate::new(year, month, day))
}

fn parse_month(input: &str) -> Result<(i32, usize)> {
    let parts: Vec<&str> = input.trim().split('-').collect();
    if parts.len() != 2 {
        bail!("invalid month format (use YYYY-MM): {}", input);
    }
    let year: i32 = parts[0].parse()?;
    let month: usize = parts[1].parse()?;
    if !(1..=12).contains(&month) {
        bail!("month out of range in {}", input);
    }
    Ok((year, month - 1))
}

fn parse_time(input: &str) -> Result<TimeRange> {
    let mut parts = input.trim().splitn(2, '-');
    let from = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| anyhow!("invalid time range: {}", input))?;
    let validate = |t: &str| -> Result<String> {
        chrono::NaiveTime::parse_from_str(t, "%H:%M")
            .map_err(|_| anyhow!("invalid time (use HH:MM): {}", t))?;
        Ok(t.to_string())
    };
    Ok(TimeRange {
        from: validate(from)?,
        to: parts.next().map(validate).transpose()?,
    })
}

fn parse_weekdays(input: &str, first_weekday: FirstWeekday) -> Result<WeekdaySet> {
    let mut set = WeekdaySet::none();
    for name in input.split(',') {
        let canonical = match name.trim().to_lowercase().as_str() {
            "mon" | "monday" => 0,
            "tue" | "tuesday" => 1,
            "wed" | "wednesday" => 2,
            "thu" | "thursday" => 3,
            "fri" | "friday" => 4,
            "sat" | "saturday" => 5,
            "sun" | "sunday" => 6,
            other => bail!("unknown weekday: {}", other),
        };
        set.selected[first_weekday.display_position(canonical)] = true;
    }
    Ok(set)
}

/// Builds a repeat rule from CLI flags. With `--repeat` the kind is built
/// fresh; without it the remaining flags edit `base` in place, so
/// `edit <id> --count 5` adjusts the existing rule instead of being
/// dropped. Unspecified count/end-date fields inherit from `base`.
fn build_rule(
    args: &RepeatArgs,
    first_weekday: FirstWeekday,
    base: Option<&RepeatRule>,
) -> Result<Option<RepeatRule>> {
    if args.is_empty() {
        return Ok(base.cloned());
    }
    if args.every == Some(0) {
        bail!("--every must be at least 1");
    }
    let kind = match args.repeat {
        Some(RepeatArg::Day) => RepeatKind::Day,
        Some(RepeatArg::Week) => RepeatKind::Week,
        Some(RepeatArg::Month) => RepeatKind::Month,
        Some(RepeatArg::Weekday) => {
            let on = args
                .on
                .as_deref()
                .ok_or_else(|| anyhow!("weekday repeats need --on (e.g. --on mon,wed,fri)"))?;
            RepeatKind::Weekday {
                weekdays: parse_weekdays(on, first_weekday)?,
                first_weekday,
            }
        }
        Some(RepeatArg::Custom) => {
            let unit = args
                .unit
                .ok_or_else(|| anyhow!("custom repeats need --unit days|weeks|months"))?;
            RepeatKind::Custom {
                gap: args.every.unwrap_or(1),
                unit: custom_unit(unit),
            }
        }
        None => {
            let base = base.ok_or_else(|| {
                anyhow!("--every/--unit/--count/--until/--on need --repeat or an existing repeat rule")
            })?;
            let mut kind = base.kind.clone();
            if let Some(on) = args.on.as_deref() {
                match &mut kind {
                    RepeatKind::Weekday {
                        weekdays,
                        first_weekday: recorded,
                    } => {
                        *weekdays = parse_weekdays(on, first_weekday)?;
                        *recorded = first_weekday;
                    }
                    _ => bail!("--on applies to weekday repeats"),
                }
            }
            if args.every.is_some() || args.unit.is_some() {
                match &mut kind {
                    RepeatKind::Custom { gap, unit } => {
                        if let Some(every) = args.every {
                            *gap = every;
                        }
                        if let Some(u) = args.unit {
                            *unit = custom_unit(u);
                        }
                    }
                    _ => bail!("--every and --unit apply to custom repeats"),
                }
            }
            kind
        }
    };
    Ok(Some(RepeatRule {
        kind,
        count: args.count.or(base.map(|b| b.count)).unwrap_or(0),
        end_date: match args.until.as_deref() {
            Some(until) => Some(parse_date(until)?),
            None => base.and_then(|b| b.end_date),
        },
    }))
}

fn custom_unit(unit: UnitArg) -> CustomUnit {
    match unit {
        UnitArg::Days => CustomUnit::Days,
        UnitArg::Weeks => CustomUnit::Weeks,
        UnitArg::Months => CustomUnit::Months,
    }
}

fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

pub fn random_hsl_color() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "hsl({}, {}%, {}%)",
        rng.gen_range(0..360),
        rng.gen_range(60..90),
        rng.gen_range(50..70)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datemath::CalendarDate;

    fn no_flags() -> RepeatArgs {
        RepeatArgs {
            repeat: None,
            every: None,
            unit: None,
            count: None,
            until: None,
            on: None,
        }
    }

    fn daily(count: u32) -> RepeatRule {
        RepeatRule {
            kind: RepeatKind::Day,
            count,
            end_date: None,
        }
    }

    #[test]
    fn count_flag_alone_edits_the_existing_rule() {
        let base = daily(0);
        let args = RepeatArgs {
            count: Some(5),
            ..no_flags()
        };
        let rule = build_rule(&args, FirstWeekday::Monday, Some(&base))
            .unwrap()
            .unwrap();
        assert_eq!(rule.kind, RepeatKind::Day);
        assert_eq!(rule.count, 5);
    }

    #[test]
    fn until_flag_alone_sets_the_end_date() {
        let base = daily(3);
        let args = RepeatArgs {
            until: Some("2025-01-01".into()),
            ..no_flags()
        };
        let rule = build_rule(&args, FirstWeekday::Monday, Some(&base))
            .unwrap()
            .unwrap();
        assert_eq!(rule.end_date, Some(CalendarDate::new(2025, 0, 1)));
        assert_eq!(rule.count, 3);
    }

    #[test]
    fn new_kind_inherits_count_and_end_date() {
        let base = RepeatRule {
            kind: RepeatKind::Day,
            count: 4,
            end_date: Some(CalendarDate::new(2025, 5, 1)),
        };
        let args = RepeatArgs {
            repeat: Some(RepeatArg::Week),
            ..no_flags()
        };
        let rule = build_rule(&args, FirstWeekday::Monday, Some(&base))
            .unwrap()
            .unwrap();
        assert_eq!(rule.kind, RepeatKind::Week);
        // a kind change alone must not reset a finite rule to infinite
        assert_eq!(rule.count, 4);
        assert_eq!(rule.end_date, Some(CalendarDate::new(2025, 5, 1)));
    }

    #[test]
    fn every_flag_adjusts_a_custom_rule() {
        let base = RepeatRule {
            kind: RepeatKind::Custom {
                gap: 2,
                unit: CustomUnit::Weeks,
            },
            count: 0,
            end_date: None,
        };
        let args = RepeatArgs {
            every: Some(3),
            ..no_flags()
        };
        let rule = build_rule(&args, FirstWeekday::Monday, Some(&base))
            .unwrap()
            .unwrap();
        assert_eq!(
            rule.kind,
            RepeatKind::Custom {
                gap: 3,
                unit: CustomUnit::Weeks,
            }
        );
    }

    #[test]
    fn rule_flags_without_a_rule_are_an_error() {
        let args = RepeatArgs {
            count: Some(5),
            ..no_flags()
        };
        assert!(build_rule(&args, FirstWeekday::Monday, None).is_err());
    }

    #[test]
    fn mismatched_kind_flags_are_an_error() {
        let base = daily(0);
        let on = RepeatArgs {
            on: Some("mon".into()),
            ..no_flags()
        };
        assert!(build_rule(&on, FirstWeekday::Monday, Some(&base)).is_err());
        let every = RepeatArgs {
            every: Some(2),
            ..no_flags()
        };
        assert!(build_rule(&every, FirstWeekday::Monday, Some(&base)).is_err());
    }

    #[test]
    fn no_flags_leave_the_rule_unchanged() {
        let base = daily(7);
        let rule = build_rule(&no_flags(), FirstWeekday::Monday, Some(&base)).unwrap();
        assert_eq!(rule, Some(base));
        assert_eq!(build_rule(&no_flags(), FirstWeekday::Monday, None).unwrap(), None);
    }
}
