//! Time types for scraped events.
//!
//! [`EventTime`] is either a calendar date (all-day) or a wall-clock
//! date-time. Both are local values, interpreted in the destination's
//! configured time zone; source offsets are discarded on parse.

use chrono::{LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Start or end of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A date without time of day.
    Date(NaiveDate),
    /// A local wall-clock date-time.
    DateTime(NaiveDateTime),
}

impl EventTime {
    /// Creates an all-day time.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// Creates a timed value.
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self::DateTime(dt)
    }

    /// Returns `true` if this carries no time of day.
    ///
    /// A date-time at exactly midnight counts as no time of day.
    pub fn is_all_day(&self) -> bool {
        match self {
            Self::Date(_) => true,
            Self::DateTime(dt) => dt.time() == NaiveTime::MIN,
        }
    }

    /// Returns `true` for the `Date` variant, whatever a date-time's clock says.
    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Returns the calendar date.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(d) => *d,
            Self::DateTime(dt) => dt.date(),
        }
    }

    /// Returns the value as a date-time, midnight for dates.
    pub fn naive(&self) -> NaiveDateTime {
        match self {
            Self::Date(d) => d.and_time(NaiveTime::MIN),
            Self::DateTime(dt) => *dt,
        }
    }

    /// Drops the time of day.
    pub fn to_date(self) -> Self {
        Self::Date(self.date())
    }

    /// Forces a date-time representation.
    pub fn to_datetime(self) -> Self {
        Self::DateTime(self.naive())
    }

    /// Formats the part of this value that identifies an event:
    /// `YYYY-MM-DD` for dates, `YYYY-MM-DDTHH:MM` for date-times.
    pub fn key_component(&self) -> String {
        match self {
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => format!(
                "{}T{:02}:{:02}",
                dt.date().format("%Y-%m-%d"),
                dt.hour(),
                dt.minute()
            ),
        }
    }

    /// Resolves the wall-clock value in `tz`.
    ///
    /// Ambiguous local times (DST fold) take the earlier instant; local
    /// times that do not exist (DST gap) are shifted forward by an hour.
    pub fn localize<Tz: TimeZone>(&self, tz: &Tz) -> chrono::DateTime<Tz> {
        let naive = self.naive();
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                let shifted = naive + chrono::Duration::hours(1);
                tz.from_local_datetime(&shifted)
                    .earliest()
                    .unwrap_or_else(|| tz.from_utc_datetime(&naive))
            }
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.naive().cmp(&other.naive())
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn all_day_detection() {
        assert!(EventTime::from_date(date(2025, 3, 10)).is_all_day());
        assert!(EventTime::from_datetime(at(2025, 3, 10, 0, 0)).is_all_day());
        assert!(!EventTime::from_datetime(at(2025, 3, 10, 18, 30)).is_all_day());
        assert!(EventTime::from_date(date(2025, 3, 10)).is_date());
        assert!(!EventTime::from_datetime(at(2025, 3, 10, 0, 0)).is_date());
    }

    #[test]
    fn key_component_formats() {
        assert_eq!(
            EventTime::from_date(date(2025, 6, 1)).key_component(),
            "2025-06-01"
        );
        assert_eq!(
            EventTime::from_datetime(at(2025, 6, 1, 9, 5)).key_component(),
            "2025-06-01T09:05"
        );
    }

    #[test]
    fn dates_order_before_same_day_times() {
        let day = EventTime::from_date(date(2025, 6, 1));
        let morning = EventTime::from_datetime(at(2025, 6, 1, 9, 0));
        assert!(day < morning);
        assert_eq!(day.cmp(&day.to_datetime()), Ordering::Equal);
    }

    #[test]
    fn localize_in_fixed_offset() {
        let tz = chrono::FixedOffset::east_opt(3600).unwrap();
        let local = EventTime::from_datetime(at(2025, 1, 15, 10, 0)).localize(&tz);
        assert_eq!(local.to_rfc3339(), "2025-01-15T10:00:00+01:00");
    }

    #[test]
    fn display() {
        assert_eq!(EventTime::from_date(date(2025, 3, 10)).to_string(), "2025-03-10");
        assert_eq!(
            EventTime::from_datetime(at(2025, 3, 10, 18, 0)).to_string(),
            "2025-03-10 18:00"
        );
    }
}
