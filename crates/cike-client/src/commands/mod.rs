//! Subcommand implementations.

pub mod config;
pub mod inspect;
pub mod scrape;
pub mod sync;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

/// Current date in `tz`.
pub(crate) fn today_in(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}
