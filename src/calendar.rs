use crate::datemath::{self, CalendarDate};
use crate::locale::{FirstWeekday, Locale};
use crate::model::ReminderId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Day {
    pub year: i32,
    pub month: usize,
    pub day: u32,
    pub id: String,
    pub date_string: String,
    pub is_current_day: bool,
    pub reminders: Vec<ReminderId>,
}

impl Day {
    pub fn date(&self) -> CalendarDate {
        CalendarDate::new(self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Month {
    pub year: i32,
    pub index: usize,
    pub name: String,
    pub date_string: String,
    /// Grid column of day 1 under the configured first weekday.
    pub first_day_index: usize,
    pub is_current_month: bool,
    pub days: Vec<Day>,
}

/// The year → month → day structure. Years are materialized on first
/// access and never dropped; recurrence cursors index straight into
/// `days`, so regenerating (locale or first-weekday change) requires
/// discarding those cursors first.
#[derive(Debug, Clone)]
pub struct Calendar {
    years: BTreeMap<i32, Vec<Month>>,
    pub first_weekday: FirstWeekday,
    pub locale: Locale,
}

impl Calendar {
    pub fn new(first_weekday: FirstWeekday, locale: Locale) -> Self {
        Calendar {
            years: BTreeMap::new(),
            first_weekday,
            locale,
        }
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.years.contains_key(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = (&i32, &Vec<Month>)> {
        self.years.iter()
    }

    /// Materializes `year` if missing. Returns true when the year was
    /// newly created, so callers can drain pending recurrence resumptions.
    pub fn ensure_year(&mut self, year: i32) -> bool {
        if self.years.contains_key(&year) {
            return false;
        }
        let months = generate_year(year, self.first_weekday, &self.locale);
        self.years.insert(year, months);
        true
    }

    /// Rebuilds every already-materialized year, e.g. after a locale or
    /// first-weekday change. Day reminder lists are emptied; the caller
    /// re-projects all reminders afterwards.
    pub fn regenerate(&mut self, first_weekday: FirstWeekday, locale: Locale) {
        self.first_weekday = first_weekday;
        self.locale = locale;
        let existing: Vec<i32> = self.years.keys().copied().collect();
        self.years.clear();
        for year in existing {
            self.ensure_year(year);
        }
    }

    pub fn month(&self, year: i32, month: usize) -> Option<&Month> {
        self.years.get(&year).and_then(|months| months.get(month))
    }

    pub fn month_mut(&mut self, year: i32, month: usize) -> Option<&mut Month> {
        self.years
            .get_mut(&year)
            .and_then(|months| months.get_mut(month))
    }

    pub fn day(&self, date: CalendarDate) -> Option<&Day> {
        self.month(date.year, date.month)
            .and_then(|m| m.days.get(date.day as usize - 1))
    }

    pub fn day_mut(&mut self, date: CalendarDate) -> Option<&mut Day> {
        self.month_mut(date.year, date.month)
            .and_then(|m| m.days.get_mut(date.day as usize - 1))
    }

    /// Empties every day's reminder list across all materialized years,
    /// ahead of a full re-projection.
    pub fn clear_reminders(&mut self) {
        for months in self.years.values_mut() {
            for month in months {
                for day in &mut month.days {
                    day.reminders.clear();
                }
            }
        }
    }

    /// Removes every occurrence of a reminder from every materialized day.
    pub fn purge_reminder(&mut self, id: &str) {
        for months in self.years.values_mut() {
            for month in months {
                for day in &mut month.days {
                    if !day.reminders.is_empty() {
                        day.reminders.retain(|r| r != id);
                    }
                }
            }
        }
    }

    /// Re-sorts every day's reminder list with the given ordering key
    /// (creation date lookup supplied by the store).
    pub fn sort_reminders<F>(&mut self, mut key: F)
    where
        F: FnMut(&ReminderId) -> chrono::DateTime<chrono::Utc>,
    {
        for months in self.years.values_mut() {
            for month in months {
                for day in &mut month.days {
                    if day.reminders.len() > 1 {
                        day.reminders.sort_by_key(|id| key(id));
                    }
                }
            }
        }
    }

    pub fn set_current_day(&mut self, date: CalendarDate, flag: bool) {
        if let Some(day) = self.day_mut(date) {
            day.is_current_day = flag;
        }
    }

    pub fn set_current_month(&mut self, year: i32, month: usize, flag: bool) {
        if let Some(m) = self.month_mut(year, month) {
            m.is_current_month = flag;
        }
    }
}

/// Builds the 12 months of one year. Pure for a fixed
/// (year, firstWeekday, locale): calling it twice yields identical
/// content, so the store caches by year.
pub fn generate_year(year: i32, first_weekday: FirstWeekday, locale: &Locale) -> Vec<Month> {
    (0..12)
        .map(|index| {
            let day_count = datemath::days_in_month(year, index as i64);
            let first_day_index =
                first_weekday.display_position(datemath::weekday_of(year, index, 1));
            let days = (1..=day_count)
                .map(|day| Day {
                    year,
                    month: index,
                    day,
                    id: format!("{:04}-{:02}-{:02}", year, index + 1, day),
                    date_string: locale.day_date_string(year, index, day),
                    is_current_day: false,
                    reminders: Vec::new(),
                })
                .collect();
            Month {
                year,
                index,
                name: locale.month_name(index).to_string(),
                date_string: locale.month_date_string(year, index),
                first_day_index,
                is_current_month: false,
                days,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_year_shape() {
        let locale = Locale::default();
        let months = generate_year(2024, FirstWeekday::Monday, &locale);
        assert_eq!(months.len(), 12);
        assert_eq!(months[1].days.len(), 29); // leap February
        assert_eq!(months[1].days[0].day, 1);
        assert_eq!(months[1].days[28].day, 29);
        // January 1st 2024 was a Monday: column 0 under Monday-first
        assert_eq!(months[0].first_day_index, 0);
        assert_eq!(months[0].date_string, "January 2024");
    }

    #[test]
    fn first_day_offset_respects_week_start() {
        let locale = Locale::default();
        let months = generate_year(2024, FirstWeekday::Sunday, &locale);
        // Monday lands in column 1 when the week starts on Sunday
        assert_eq!(months[0].first_day_index, 1);
    }

    #[test]
    fn generation_is_idempotent() {
        let locale = Locale::default();
        let a = generate_year(2023, FirstWeekday::Monday, &locale);
        let b = generate_year(2023, FirstWeekday::Monday, &locale);
        assert_eq!(a, b);
    }

    #[test]
    fn ensure_year_is_lazy() {
        let mut calendar = Calendar::new(FirstWeekday::Monday, Locale::default());
        assert!(!calendar.contains_year(2024));
        assert!(calendar.ensure_year(2024));
        assert!(!calendar.ensure_year(2024));
        assert!(calendar.day(CalendarDate::new(2024, 1, 29)).is_some());
        assert!(calendar.day(CalendarDate::new(2025, 0, 1)).is_none());
    }

    #[test]
    fn purge_clears_all_slots() {
        let mut calendar = Calendar::new(FirstWeekday::Monday, Locale::default());
        calendar.ensure_year(2024);
        calendar
            .day_mut(CalendarDate::new(2024, 0, 15))
            .unwrap()
            .reminders
            .push("abc".into());
        calendar
            .day_mut(CalendarDate::new(2024, 5, 2))
            .unwrap()
            .reminders
            .push("abc".into());
        calendar.purge_reminder("abc");
        for (_, months) in calendar.years() {
            for month in months {
                for day in &month.days {
                    assert!(day.reminders.is_empty());
                }
            }
        }
    }
}
