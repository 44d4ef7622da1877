use serde::{Deserialize, Serialize};

/// User-configurable start-of-week. Affects only display offsets and the
/// rotation of weekday-rule selections, never which absolute dates a rule
/// lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirstWeekday {
    #[default]
    Monday,
    Sunday,
}

impl FirstWeekday {
    /// Canonical weekday index (0 = Monday .. 6 = Sunday) of the first
    /// display column.
    pub fn start_index(self) -> usize {
        match self {
            FirstWeekday::Monday => 0,
            FirstWeekday::Sunday => 6,
        }
    }

    /// Display column of a canonical weekday under this setting.
    pub fn display_position(self, weekday: usize) -> usize {
        (weekday + 7 - self.start_index()) % 7
    }

    pub fn toggled(self) -> Self {
        match self {
            FirstWeekday::Monday => FirstWeekday::Sunday,
            FirstWeekday::Sunday => FirstWeekday::Monday,
        }
    }
}

const MONTHS_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS_EN: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Display names for months and weekdays. Name lookup is the narrow
/// interface the calendar consumes; callers can swap in translated sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    pub months: Vec<String>,
    pub weekdays: Vec<String>,
}

impl Default for Locale {
    fn default() -> Self {
        Locale {
            months: MONTHS_EN.iter().map(|s| s.to_string()).collect(),
            weekdays: WEEKDAYS_EN.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Locale {
    pub fn month_name(&self, month: usize) -> &str {
        &self.months[month % 12]
    }

    /// Name of a canonical weekday (0 = Monday).
    pub fn weekday_name(&self, weekday: usize) -> &str {
        &self.weekdays[weekday % 7]
    }

    /// Short weekday labels in display order for a grid header row.
    pub fn weekday_row(&self, first: FirstWeekday) -> Vec<String> {
        (0..7)
            .map(|col| {
                let weekday = (col + first.start_index()) % 7;
                let name = self.weekday_name(weekday);
                name.chars().take(3).collect()
            })
            .collect()
    }

    pub fn month_date_string(&self, year: i32, month: usize) -> String {
        format!("{} {}", self.month_name(month), year)
    }

    pub fn day_date_string(&self, year: i32, month: usize, day: u32) -> String {
        format!("{} {}, {}", self.month_name(month), day, year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_positions() {
        // Monday-first: Monday is column 0, Sunday is column 6
        assert_eq!(FirstWeekday::Monday.display_position(0), 0);
        assert_eq!(FirstWeekday::Monday.display_position(6), 6);
        // Sunday-first: Sunday is column 0, Monday is column 1
        assert_eq!(FirstWeekday::Sunday.display_position(6), 0);
        assert_eq!(FirstWeekday::Sunday.display_position(0), 1);
    }

    #[test]
    fn weekday_rows() {
        let locale = Locale::default();
        let row = locale.weekday_row(FirstWeekday::Sunday);
        assert_eq!(row[0], "Sun");
        assert_eq!(row[1], "Mon");
    }
}
