use crate::calendar::{Calendar, Day, Month};
use crate::datemath::{self, CalendarDate};
use crate::locale::{FirstWeekday, Locale};
use crate::model::{Origin, Reminder, ReminderId, RepeatKind, StoreError};
use crate::recurrence::{self, Projection};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Days of a neighboring month that pad the 6x7 grid.
#[derive(Debug, Clone)]
pub struct MonthSlice {
    pub name: String,
    pub days: Vec<Day>,
}

/// The previous/current/next month window used for grid display.
#[derive(Debug, Clone)]
pub struct ViewWindow {
    pub previous: MonthSlice,
    pub current: Month,
    pub next: MonthSlice,
}

#[derive(Debug, Clone)]
pub struct MonthSummary {
    pub index: usize,
    pub name: String,
    pub is_current_month: bool,
}

/// A day with its reminder references resolved to full records.
#[derive(Debug, Clone)]
pub struct DayView {
    pub day: Day,
    pub weekday_name: String,
    pub reminders: Vec<Reminder>,
}

/// Read-only state handed to rendering.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub current_day: Option<DayView>,
    pub window: ViewWindow,
    pub visible_year: i32,
    pub visible_month: usize,
    pub year_view: Vec<MonthSummary>,
}

/// Owns the canonical reminder set (local and external) and the lazily
/// materialized calendar. All mutation re-enters through here; every
/// mutation bumps `version` so consumers can cheaply detect staleness.
pub struct ReminderStore {
    calendar: Calendar,
    reminders: Vec<Reminder>,
    today: CalendarDate,
    visible_year: i32,
    visible_month: usize,
    /// Reminders whose projection suspended at a not-yet-materialized
    /// year, drained whenever a new year is created.
    pending: Vec<ReminderId>,
    version: u64,
}

impl ReminderStore {
    pub fn new(first_weekday: FirstWeekday, locale: Locale, today: CalendarDate) -> Self {
        ReminderStore {
            calendar: Calendar::new(first_weekday, locale),
            reminders: Vec::new(),
            today,
            visible_year: today.year,
            visible_month: today.month,
            pending: Vec::new(),
            version: 0,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn today(&self) -> CalendarDate {
        self.today
    }

    pub fn first_weekday(&self) -> FirstWeekday {
        self.calendar.first_weekday
    }

    /// Short weekday labels in display order for the grid header.
    pub fn weekday_header(&self) -> Vec<String> {
        self.calendar.locale.weekday_row(self.calendar.first_weekday)
    }

    /// Localized "January 2024"-style label for a month.
    pub fn month_label(&self, year: i32, month: usize) -> String {
        self.calendar.locale.month_date_string(year, month)
    }

    pub fn visible(&self) -> (i32, usize) {
        (self.visible_year, self.visible_month)
    }

    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn local_reminders(&self) -> Vec<Reminder> {
        self.reminders
            .iter()
            .filter(|r| r.origin == Origin::Local)
            .cloned()
            .collect()
    }

    pub fn reminder(&self, id: &str) -> Option<&Reminder> {
        self.reminders.iter().find(|r| r.id == id)
    }

    /// Every materialized date the reminder currently occupies, in
    /// chronological order.
    pub fn occurrences(&self, id: &str) -> Vec<CalendarDate> {
        let mut dates = Vec::new();
        for (_, months) in self.calendar.years() {
            for month in months {
                for day in &month.days {
                    if day.reminders.iter().any(|r| r == id) {
                        dates.push(day.date());
                    }
                }
            }
        }
        dates
    }

    /// Seeds the calendar with the current year and projects every
    /// reminder. Replaces whatever was loaded before.
    pub fn load(&mut self, local: Vec<Reminder>, external: Vec<Reminder>) {
        self.reminders = local
            .into_iter()
            .map(|mut r| {
                r.origin = Origin::Local;
                r
            })
            .chain(external.into_iter().map(|mut r| {
                r.origin = Origin::External;
                r
            }))
            .collect();
        self.reinit();
    }

    /// Replaces the external reminder set, keeping local reminders.
    pub fn set_external(&mut self, external: Vec<Reminder>) {
        self.reminders.retain(|r| r.origin == Origin::Local);
        self.reminders.extend(external.into_iter().map(|mut r| {
            r.origin = Origin::External;
            r
        }));
        self.reinit();
    }

    pub fn add(&mut self, reminder: Reminder) -> Result<(), StoreError> {
        self.validate(&reminder)?;
        self.reminders.push(reminder);
        let index = self.reminders.len() - 1;
        self.place(index);
        // placing may have materialized a new year; queued reminders
        // suspended at it can now resume
        self.drain_pending();
        self.bump();
        Ok(())
    }

    pub fn update<F>(&mut self, id: &str, edit: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Reminder),
    {
        let index = self
            .index_of(id)
            .ok_or_else(|| StoreError::ReminderNotFound(id.to_string()))?;
        if self.reminders[index].origin == Origin::External {
            return Err(StoreError::ReadOnlyReminder(id.to_string()));
        }
        // validate the edit before touching the calendar so a rejected
        // edit leaves the store unchanged
        let mut edited = self.reminders[index].clone();
        edit(&mut edited);
        edited.reset_cursor();
        self.validate(&edited)?;
        self.calendar.purge_reminder(id);
        self.pending.retain(|p| p != id);
        self.reminders[index] = edited;
        self.place(index);
        self.drain_pending();
        self.bump();
        Ok(())
    }

    /// Removes a reminder and purges every materialized occurrence of it.
    pub fn remove(&mut self, id: &str) -> Result<Reminder, StoreError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| StoreError::ReminderNotFound(id.to_string()))?;
        self.calendar.purge_reminder(id);
        self.pending.retain(|p| p != id);
        let removed = self.reminders.remove(index);
        self.bump();
        Ok(removed)
    }

    /// Weekday-relative gaps and grid offsets become invalid when the
    /// first weekday changes: every cursor is discarded and the full set
    /// is re-projected onto a regenerated calendar.
    pub fn change_first_weekday(&mut self, value: FirstWeekday) {
        if value == self.calendar.first_weekday {
            return;
        }
        let locale = self.calendar.locale.clone();
        self.calendar.regenerate(value, locale);
        self.reinit();
    }

    pub fn change_locale(&mut self, locale: Locale) {
        if locale == self.calendar.locale {
            return;
        }
        let first_weekday = self.calendar.first_weekday;
        self.calendar.regenerate(first_weekday, locale);
        self.reinit();
    }

    /// Materializes a year on demand and resumes any reminder whose
    /// cursor can now land in it.
    pub fn ensure_year(&mut self, year: i32) {
        if self.calendar.ensure_year(year) {
            self.drain_pending();
            self.bump();
        }
    }

    pub fn change_month(&mut self, direction: i32) {
        let mut year = self.visible_year;
        let mut month = self.visible_month as i32 + direction;
        if month < 0 {
            month = 11;
            year -= 1;
        } else if month > 11 {
            month = 0;
            year += 1;
        }
        self.ensure_year(year);
        self.visible_year = year;
        self.visible_month = month as usize;
        self.bump();
    }

    pub fn change_year(&mut self, direction: i32) {
        let year = self.visible_year + direction;
        self.ensure_year(year);
        self.visible_year = year;
        self.bump();
    }

    pub fn jump_to_today(&mut self) {
        self.ensure_year(self.today.year);
        self.visible_year = self.today.year;
        self.visible_month = self.today.month;
        self.bump();
    }

    /// Re-flags the current day/month when the wall-clock date rolls
    /// over. Cheap no-op while the date is unchanged.
    pub fn refresh_date(&mut self, today: CalendarDate) {
        if today == self.today {
            return;
        }
        self.calendar.set_current_day(self.today, false);
        self.calendar
            .set_current_month(self.today.year, self.today.month, false);
        self.today = today;
        self.ensure_year(today.year);
        self.calendar.set_current_day(today, true);
        self.calendar.set_current_month(today.year, today.month, true);
        self.bump();
    }

    /// Previous/current/next slice padding a fixed 6x7 grid: the trailing
    /// `first_day_index` days of the previous month and however many
    /// leading days of the next month fill the remaining cells.
    pub fn view_window(&mut self) -> ViewWindow {
        self.ensure_year(self.visible_year);
        let (year, month) = (self.visible_year, self.visible_month);
        let (prev_year, prev_month) = if month == 0 {
            (year - 1, 11)
        } else {
            (year, month - 1)
        };
        let (next_year, next_month) = if month == 11 {
            (year + 1, 0)
        } else {
            (year, month + 1)
        };
        self.ensure_year(prev_year);
        self.ensure_year(next_year);

        // the months exist after ensure_year; the empty fallbacks are unreachable
        let current = self
            .calendar
            .month(year, month)
            .cloned()
            .unwrap_or_else(|| empty_month(year, month));
        let previous = self.calendar.month(prev_year, prev_month);
        let next = self.calendar.month(next_year, next_month);

        let trailing = current.first_day_index;
        let leading = 42usize.saturating_sub(current.days.len() + trailing);
        ViewWindow {
            previous: MonthSlice {
                name: previous.map(|m| m.name.clone()).unwrap_or_default(),
                days: previous
                    .map(|m| {
                        if trailing > 0 {
                            m.days[m.days.len() - trailing..].to_vec()
                        } else {
                            Vec::new()
                        }
                    })
                    .unwrap_or_default(),
            },
            current,
            next: MonthSlice {
                name: next.map(|m| m.name.clone()).unwrap_or_default(),
                days: next
                    .map(|m| m.days[..leading.min(m.days.len())].to_vec())
                    .unwrap_or_default(),
            },
        }
    }

    pub fn day_view(&self, date: CalendarDate) -> Option<DayView> {
        let day = self.calendar.day(date)?.clone();
        let weekday = datemath::weekday_of(date.year, date.month, date.day);
        let reminders = day
            .reminders
            .iter()
            .filter_map(|id| self.reminder(id).cloned())
            .collect();
        Some(DayView {
            day,
            weekday_name: self.calendar.locale.weekday_name(weekday).to_string(),
            reminders,
        })
    }

    pub fn snapshot(&mut self) -> Snapshot {
        self.ensure_year(self.today.year);
        let window = self.view_window();
        let year_view = self
            .calendar
            .years()
            .find(|(y, _)| **y == self.visible_year)
            .map(|(_, months)| {
                months
                    .iter()
                    .map(|m| MonthSummary {
                        index: m.index,
                        name: m.name.clone(),
                        is_current_month: m.is_current_month,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Snapshot {
            version: self.version,
            current_day: self.day_view(self.today),
            window,
            visible_year: self.visible_year,
            visible_month: self.visible_month,
            year_view,
        }
    }

    fn validate(&self, reminder: &Reminder) -> Result<(), StoreError> {
        let anchor = reminder.anchor();
        if anchor.month > 11
            || anchor.day == 0
            || anchor.day > datemath::days_in_month(anchor.year, anchor.month as i64)
        {
            return Err(StoreError::InvalidDate(anchor));
        }
        if let Some(rule) = &reminder.repeat {
            if let RepeatKind::Weekday { weekdays, .. } = &rule.kind {
                if weekdays.count() == 0 {
                    return Err(StoreError::EmptyWeekdaySet);
                }
            }
        }
        Ok(())
    }

    /// Full re-derivation: day slots emptied, current year seeded, flags
    /// set, cursors reset, every reminder projected, day slots sorted by
    /// creation date. Clearing first keeps a re-load from leaving stale
    /// ids behind or double-placing retained reminders.
    fn reinit(&mut self) {
        self.calendar.clear_reminders();
        for reminder in &mut self.reminders {
            reminder.reset_cursor();
        }
        self.pending.clear();
        self.calendar.ensure_year(self.today.year);
        self.calendar.set_current_day(self.today, true);
        self.calendar
            .set_current_month(self.today.year, self.today.month, true);
        for index in 0..self.reminders.len() {
            self.place(index);
        }
        self.drain_pending();
        self.bump();
    }

    /// Projects one reminder: repeating rules run through the recurrence
    /// engine, one-off reminders land straight on their anchor day.
    fn place(&mut self, index: usize) {
        let anchor = self.reminders[index].anchor();
        self.calendar.ensure_year(anchor.year);

        if self.reminders[index].repeat.is_some() {
            let outcome =
                recurrence::project(&mut self.calendar, &mut self.reminders[index], self.today);
            let id = self.reminders[index].id.clone();
            self.pending.retain(|p| p != &id);
            if outcome == Projection::Suspended {
                self.pending.push(id);
            }
        } else {
            let id = self.reminders[index].id.clone();
            if let Some(day) = self.calendar.day_mut(anchor) {
                day.reminders.push(id);
            }
        }
    }

    /// Resumes every queued reminder whose cursor year is materialized.
    /// Projection can itself materialize historical years, which may make
    /// further queued reminders resumable, so this loops to a fixed point.
    fn drain_pending(&mut self) {
        loop {
            let mut progressed = false;
            let queued = std::mem::take(&mut self.pending);
            for id in queued {
                let resumable = self
                    .index_of(&id)
                    .map(|i| {
                        self.reminders[i]
                            .next_repeat
                            .as_ref()
                            .map(|c| !c.done && self.calendar.contains_year(c.year))
                            .unwrap_or(false)
                    })
                    .unwrap_or(false);
                if !resumable {
                    if self.index_of(&id).is_some() {
                        self.pending.push(id);
                    }
                    continue;
                }
                progressed = true;
                if let Some(index) = self.index_of(&id) {
                    let outcome = recurrence::project(
                        &mut self.calendar,
                        &mut self.reminders[index],
                        self.today,
                    );
                    if outcome == Projection::Suspended {
                        self.pending.push(id);
                    }
                }
            }
            if !progressed {
                break;
            }
        }
        self.sort_days();
    }

    fn sort_days(&mut self) {
        let by_creation: HashMap<ReminderId, DateTime<Utc>> = self
            .reminders
            .iter()
            .map(|r| (r.id.clone(), r.creation_date))
            .collect();
        self.calendar
            .sort_reminders(|id| by_creation.get(id).copied().unwrap_or_default());
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.reminders.iter().position(|r| r.id == id)
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

fn empty_month(year: i32, index: usize) -> Month {
    Month {
        year,
        index,
        name: String::new(),
        date_string: String::new(),
        first_day_index: 0,
        is_current_month: false,
        days: Vec::new(),
    }
}
