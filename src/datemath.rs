use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A plain local calendar date with no time-of-day or zone component.
/// Month is a 0-based index, day is 1-based, matching the calendar grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i32,
    pub month: usize,
    pub day: u32,
}

impl CalendarDate {
    pub fn new(year: i32, month: usize, day: u32) -> Self {
        CalendarDate { year, month, day }
    }

    pub fn today() -> Self {
        let now = chrono::Local::now().date_naive();
        CalendarDate {
            year: now.year(),
            month: now.month0() as usize,
            day: now.day(),
        }
    }
}

impl std::fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month + 1, self.day)
    }
}

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Days in the given month. `month` may be out of the 0..12 range;
/// it is folded into the correct year first, so callers can ask about
/// "month 12 of 2023" and get January 2024.
pub fn days_in_month(year: i32, month: i64) -> u32 {
    let (year, month) = fold_month(year, month);
    match month {
        0 => 31,
        1 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        2 => 31,
        3 => 30,
        4 => 31,
        5 => 30,
        6 => 31,
        7 => 31,
        8 => 30,
        9 => 31,
        10 => 30,
        11 => 31,
        _ => unreachable!(),
    }
}

/// Canonical weekday index of a date: 0 = Monday .. 6 = Sunday.
/// Independent of the configured first weekday; display offsets are
/// applied by the caller.
pub fn weekday_of(year: i32, month: usize, day: u32) -> usize {
    // Anchor dates are always constructed from a valid materialized
    // grid position, so the lookup cannot fail for month 0..12.
    NaiveDate::from_ymd_opt(year, month as u32 + 1, day)
        .map(|d| d.weekday().num_days_from_monday() as usize)
        .unwrap_or(0)
}

fn fold_month(mut year: i32, mut month: i64) -> (i32, usize) {
    while month < 0 {
        month += 12;
        year -= 1;
    }
    while month > 11 {
        month -= 12;
        year += 1;
    }
    (year, month as usize)
}

/// Normalizes an out-of-range 0-based day index (negative or past the
/// end of the month) into a concrete (year, month, dayIndex), borrowing
/// and carrying across as many month/year boundaries as the delta spans.
pub fn normalize(year: i32, month: usize, day_index: i64) -> (i32, usize, u32) {
    let mut year = year;
    let mut month = month as i64;
    let mut day_index = day_index;

    while day_index < 0 {
        let (y, m) = fold_month(year, month - 1);
        day_index += days_in_month(y, m as i64) as i64;
        year = y;
        month = m as i64;
    }
    loop {
        let (y, m) = fold_month(year, month);
        let len = days_in_month(y, m as i64) as i64;
        if day_index < len {
            return (y, m, day_index as u32);
        }
        day_index -= len;
        year = y;
        month = m as i64 + 1;
    }
}

/// Number of days from `from` to `to` (positive when `to` is later).
pub fn days_between(from: CalendarDate, to: CalendarDate) -> i64 {
    fn rata(d: CalendarDate) -> i64 {
        // NaiveDate covers every year the calendar grid can reach.
        NaiveDate::from_ymd_opt(d.year, d.month as u32 + 1, d.day)
            .map(|n| n.num_days_from_ce() as i64)
            .unwrap_or(0)
    }
    rata(to) - rata(from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_years() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2023));
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 1), 29);
        assert_eq!(days_in_month(2023, 1), 28);
        assert_eq!(days_in_month(2023, 0), 31);
        assert_eq!(days_in_month(2023, 3), 30);
        // month 12 of 2023 is January 2024
        assert_eq!(days_in_month(2023, 12), 31);
        // month 13 of 2023 is February 2024, a leap year
        assert_eq!(days_in_month(2023, 13), 29);
        assert_eq!(days_in_month(2024, -1), 31);
    }

    #[test]
    fn weekdays() {
        // 2024-01-15 was a Monday
        assert_eq!(weekday_of(2024, 0, 15), 0);
        // 2024-01-01 was a Monday
        assert_eq!(weekday_of(2024, 0, 1), 0);
        // 2023-01-01 was a Sunday
        assert_eq!(weekday_of(2023, 0, 1), 6);
    }

    #[test]
    fn normalize_in_range_is_identity() {
        assert_eq!(normalize(2024, 0, 14), (2024, 0, 14));
    }

    #[test]
    fn normalize_carries_across_months() {
        // index 31 in January is February 1st (index 0)
        assert_eq!(normalize(2024, 0, 31), (2024, 1, 0));
        // index 59 in non-leap February lands in April
        assert_eq!(normalize(2023, 1, 59), (2023, 3, 0));
    }

    #[test]
    fn normalize_carries_across_years() {
        assert_eq!(normalize(2023, 11, 31), (2024, 0, 0));
        // spans two year boundaries in one call
        assert_eq!(normalize(2023, 11, 31 + 366), (2025, 0, 0));
    }

    #[test]
    fn normalize_borrows_backwards() {
        assert_eq!(normalize(2024, 0, -1), (2023, 11, 30));
        // 29 days before March 1st of a leap year is February 1st
        assert_eq!(normalize(2024, 2, -29), (2024, 1, 0));
    }

    #[test]
    fn day_distance() {
        let jan15 = CalendarDate::new(2024, 0, 15);
        let feb15 = CalendarDate::new(2024, 1, 15);
        assert_eq!(days_between(jan15, feb15), 31);
        assert_eq!(days_between(feb15, jan15), -31);
    }
}
