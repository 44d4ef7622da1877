use crate::datemath::CalendarDate;
use crate::locale::FirstWeekday;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ReminderId = String;

/// Where a reminder came from. External reminders are read-only and are
/// never written to local persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    Local,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl TimeRange {
    pub fn text(&self) -> String {
        match &self.to {
            Some(to) => format!("{} - {}", self.from, to),
            None => self.from.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomUnit {
    Days,
    Weeks,
    Months,
}

/// A 7-slot weekday selection stored in the display order of the first
/// weekday that was configured when the rule was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdaySet {
    pub selected: [bool; 7],
}

impl WeekdaySet {
    pub fn none() -> Self {
        WeekdaySet {
            selected: [false; 7],
        }
    }

    pub fn count(&self) -> usize {
        self.selected.iter().filter(|s| **s).count()
    }

    /// The selection realigned to the current first-weekday setting.
    /// Switching Monday-first to Sunday-first shifts every column one to
    /// the right; the opposite switch shifts one to the left.
    pub fn dynamic(&self, recorded: FirstWeekday, current: FirstWeekday) -> [bool; 7] {
        if recorded == current {
            return self.selected;
        }
        let mut rotated = [false; 7];
        match current {
            FirstWeekday::Sunday => {
                for (i, sel) in self.selected.iter().enumerate() {
                    rotated[(i + 1) % 7] = *sel;
                }
            }
            FirstWeekday::Monday => {
                for (i, sel) in self.selected.iter().enumerate() {
                    rotated[(i + 6) % 7] = *sel;
                }
            }
        }
        rotated
    }
}

/// One payload shape per repeat kind, dispatched by exhaustive match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepeatKind {
    Day,
    Week,
    Month,
    Weekday {
        weekdays: WeekdaySet,
        /// First-weekday setting in effect when the rule was created;
        /// the selection array is indexed in that display order.
        first_weekday: FirstWeekday,
    },
    Custom {
        gap: u32,
        unit: CustomUnit,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatRule {
    #[serde(flatten)]
    pub kind: RepeatKind,
    /// Total number of occurrences, anchor included. 0 means infinite.
    #[serde(default)]
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<CalendarDate>,
}

impl RepeatRule {
    pub fn summary(&self) -> String {
        let base = match &self.kind {
            RepeatKind::Day => "every day".to_string(),
            RepeatKind::Week => "every week".to_string(),
            RepeatKind::Month => "every month".to_string(),
            RepeatKind::Weekday { weekdays, .. } => {
                format!("{} weekdays each week", weekdays.count())
            }
            RepeatKind::Custom { gap, unit } => {
                let unit = match unit {
                    CustomUnit::Days => "day",
                    CustomUnit::Weeks => "week",
                    CustomUnit::Months => "month",
                };
                if *gap == 1 {
                    format!("every {}", unit)
                } else {
                    format!("every {} {}s", gap, unit)
                }
            }
        };
        match (self.count, &self.end_date) {
            (0, None) => base,
            (0, Some(end)) => format!("{} until {}", base, end),
            (n, None) => format!("{} ({} times)", base, n),
            (n, Some(end)) => format!("{} ({} times, until {})", base, n, end),
        }
    }
}

/// Resumable recurrence state for one repeating reminder. `day_index` is
/// 0-based and may run past the end of its month between an advance and
/// the next normalization pass. Absent cursor = generation not started;
/// `done` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub year: i32,
    pub month: usize,
    pub day_index: i64,
    pub repeats_remaining: u32,
    pub gap_index: usize,
    pub gaps: Vec<u32>,
    pub overflow_days: u32,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    pub year: i32,
    pub month: usize,
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<TimeRange>,
    pub color: String,
    #[serde(default = "Utc::now")]
    pub creation_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<RepeatRule>,
    /// Sub-source the reminder belongs to when it came from the external
    /// feed; absent for local reminders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip)]
    pub next_repeat: Option<Cursor>,
    #[serde(skip)]
    pub origin: Origin,
}

impl Reminder {
    pub fn new(id: ReminderId, title: String, date: CalendarDate) -> Self {
        Reminder {
            id,
            title,
            year: date.year,
            month: date.month,
            day: date.day,
            range: None,
            color: String::new(),
            creation_date: Utc::now(),
            repeat: None,
            source_id: None,
            next_repeat: None,
            origin: Origin::Local,
        }
    }

    pub fn anchor(&self) -> CalendarDate {
        CalendarDate::new(self.year, self.month, self.day)
    }

    /// Drops recurrence state so the next projection starts over from the
    /// anchor. Used whenever the first weekday or locale changes.
    pub fn reset_cursor(&mut self) {
        self.next_repeat = None;
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("reminder not found: {0}")]
    ReminderNotFound(String),
    #[error("reminder {0} is read-only (external source)")]
    ReadOnlyReminder(String),
    #[error("invalid anchor date: {0}")]
    InvalidDate(CalendarDate),
    #[error("weekday rule selects no weekdays")]
    EmptyWeekdaySet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_rotation_round_trips() {
        let mut set = WeekdaySet::none();
        set.selected[0] = true; // Monday column under Monday-first
        set.selected[4] = true; // Friday

        let under_sunday = set.dynamic(FirstWeekday::Monday, FirstWeekday::Sunday);
        // Monday moves to column 1, Friday to column 5
        assert!(under_sunday[1]);
        assert!(under_sunday[5]);
        assert_eq!(under_sunday.iter().filter(|s| **s).count(), 2);

        // rotating back restores the original alignment
        let back = WeekdaySet {
            selected: under_sunday,
        }
        .dynamic(FirstWeekday::Sunday, FirstWeekday::Monday);
        assert_eq!(back, set.selected);
    }

    #[test]
    fn unchanged_setting_is_identity() {
        let mut set = WeekdaySet::none();
        set.selected[3] = true;
        assert_eq!(
            set.dynamic(FirstWeekday::Monday, FirstWeekday::Monday),
            set.selected
        );
    }

    #[test]
    fn rule_summaries() {
        let rule = RepeatRule {
            kind: RepeatKind::Custom {
                gap: 2,
                unit: CustomUnit::Weeks,
            },
            count: 5,
            end_date: None,
        };
        assert_eq!(rule.summary(), "every 2 weeks (5 times)");
    }
}
