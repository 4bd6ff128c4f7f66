//! Monday-to-Sunday weeks

use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;

/// Weeks a student may browse before the current one
pub const STUDENT_WEEKS_BACK: i64 = 1;
/// Weeks a student may browse after the current one
pub const STUDENT_WEEKS_AHEAD: i64 = 3;

/// A calendar week, identified by its Monday
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Week {
    start: NaiveDate,
}

impl Week {
    /// The week `date` falls in
    pub fn containing(date: NaiveDate) -> Self {
        let offset = i64::from(date.weekday().num_days_from_monday());
        Self {
            start: date - Duration::days(offset),
        }
    }

    /// Monday
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Sunday
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(6)
    }

    /// The seven days, Monday first
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..7).map(move |i| self.start + Duration::days(i))
    }

    pub fn prev(&self) -> Self {
        self.offset(-1)
    }

    pub fn next(&self) -> Self {
        self.offset(1)
    }

    pub fn offset(&self, weeks: i64) -> Self {
        Self {
            start: self.start + Duration::weeks(weeks),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end()
    }

    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.contains(today)
    }

    /// `M/D ~ M/D`
    pub fn label(&self) -> String {
        let end = self.end();
        format!(
            "{}/{} ~ {}/{}",
            self.start.month(),
            self.start.day(),
            end.month(),
            end.day()
        )
    }

    /// `YYYY-MM-DD` bounds for range queries
    pub fn iso_bounds(&self) -> (String, String) {
        (
            self.start.format("%Y-%m-%d").to_string(),
            self.end().format("%Y-%m-%d").to_string(),
        )
    }

    /// Whether a student may navigate to this week
    pub fn within_student_window(&self, today: NaiveDate) -> bool {
        let current = Week::containing(today);
        let first = current.offset(-STUDENT_WEEKS_BACK);
        let last = current.offset(STUDENT_WEEKS_AHEAD);
        first <= *self && *self <= last
    }
}

impl fmt::Display for Week {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
