//! Date parsing for scraped listings.
//!
//! Listings show dates in several shapes: numeric `d.m.yyyy`, a day with
//! a localized month name, upcoming-event widgets with day and month only,
//! and ISO 8601 timestamps in structured metadata. Every parser here returns
//! `None` when it cannot resolve a concrete date; callers drop the record.
//!
//! Two parsers are heuristics and can be wrong on valid input:
//!
//! - [`infer_year`] assumes the nearest future occurrence. A page scraped
//!   long after an event took place yields next year's date for it.
//! - [`find_numeric_range`] takes the first two date-like substrings of
//!   free text. Prose mentioning unrelated dates (registration deadlines,
//!   publication dates) before the event dates anchors the range to the
//!   wrong tokens.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::months::month_number;
use crate::time::EventTime;

/// `6.10.2025`, `06.10.2025`, `6. 10. 2025`.
static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\.\s*(\d{1,2})\.\s*(\d{4})\b").expect("Invalid numeric date regex")
});

/// `6. októbra 2025`, `6 October 2025`, `6. okt`.
static HUMAN_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\.?\s*(\p{L}{3,})\.?(?:,?\s+(\d{4}))?").expect("Invalid human date regex")
});

/// A resolved date range. `end` equals `start` for single-day listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    /// First day.
    pub start: NaiveDate,
    /// Last day, inclusive.
    pub end: NaiveDate,
}

impl DateSpan {
    /// A single-day span.
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }
}

/// Parses a complete numeric `d.m.yyyy` date.
pub fn parse_numeric(text: &str) -> Option<NaiveDate> {
    let caps = NUMERIC_DATE.captures(text.trim())?;
    numeric_from_captures(&caps)
}

fn numeric_from_captures(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let day = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let year = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Finds a numeric date range in free text.
///
/// Only the first two date-like substrings are considered: the first is the
/// start, the second the end. A single match yields a one-day span. An
/// invalid second date falls back to the start; an invalid first date makes
/// the text unparseable.
pub fn find_numeric_range(text: &str) -> Option<DateSpan> {
    let mut matches = NUMERIC_DATE.captures_iter(text).take(2);
    let start = numeric_from_captures(&matches.next()?)?;
    let end = matches
        .next()
        .and_then(|caps| numeric_from_captures(&caps))
        .unwrap_or(start);
    Some(DateSpan { start, end })
}

/// Returns `true` if `text` contains a numeric date.
pub fn contains_numeric_date(text: &str) -> bool {
    NUMERIC_DATE.is_match(text)
}

/// Resolves a day of month and a month without a year.
///
/// Uses the current year unless that date already passed, in which case the
/// date rolls forward to next year. Dates that do not exist in the candidate
/// year (29 February) are unparseable.
pub fn infer_year(month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    let candidate = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if candidate >= today {
        Some(candidate)
    } else {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    }
}

/// Builds a date from day, localized month token and optional year text.
///
/// A missing or non-numeric year is inferred with [`infer_year`].
pub fn parse_day_month(
    day: &str,
    month: &str,
    year: Option<&str>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let day: u32 = day.trim().trim_end_matches('.').parse().ok()?;
    let month = month_number(month)?;
    match year.and_then(|y| y.trim().parse::<i32>().ok()) {
        Some(year) => NaiveDate::from_ymd_opt(year, month, day),
        None => infer_year(month, day, today),
    }
}

/// Parses a human-readable date: `6. októbra 2025`, `6 October 2025`, or
/// numeric `06.10.2025`.
///
/// The first day/month-name pair whose month resolves wins; a missing year
/// is inferred.
pub fn parse_human(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    for caps in HUMAN_DATE.captures_iter(&normalized) {
        let (Some(day), Some(month)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if month_number(month.as_str()).is_none() {
            continue;
        }
        let year = caps.get(3).map(|m| m.as_str());
        if let Some(date) = parse_day_month(day.as_str(), month.as_str(), year, today) {
            return Some(date);
        }
    }
    parse_numeric(&normalized)
}

/// Parses an ISO 8601 timestamp from structured metadata.
///
/// The date and the wall-clock time are preserved and any offset is
/// discarded. Accepted shapes, tried in order: RFC 3339 with offset,
/// `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD`. A space may
/// stand in for the `T`.
pub fn parse_iso(text: &str) -> Option<EventTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(EventTime::from_datetime(dt.naive_local()));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(EventTime::from_datetime(dt.naive_local()));
    }
    for (len, formats) in [
        (19, ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]),
        (16, ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]),
    ] {
        if let Some(prefix) = text.get(..len) {
            for format in formats {
                if let Ok(dt) = NaiveDateTime::parse_from_str(prefix, format) {
                    return Some(EventTime::from_datetime(dt));
                }
            }
        }
    }
    text.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .map(EventTime::from_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> EventTime {
        EventTime::from_datetime(date(y, m, d).and_hms_opt(h, min, 0).unwrap())
    }

    mod numeric {
        use super::*;

        #[test]
        fn parses_padded_and_unpadded() {
            assert_eq!(parse_numeric("06.10.2025"), Some(date(2025, 10, 6)));
            assert_eq!(parse_numeric("6.10.2025"), Some(date(2025, 10, 6)));
            assert_eq!(parse_numeric("6. 10. 2025"), Some(date(2025, 10, 6)));
        }

        #[test]
        fn rejects_impossible_dates() {
            assert_eq!(parse_numeric("31.02.2025"), None);
            assert_eq!(parse_numeric("no date here"), None);
        }

        #[test]
        fn range_takes_first_two_matches() {
            let span = find_numeric_range("Konferencia 12.05.2025 - 14.05.2025, registrácia do 30.04.2025")
                .unwrap();
            assert_eq!(span.start, date(2025, 5, 12));
            assert_eq!(span.end, date(2025, 5, 14));
        }

        #[test]
        fn range_single_date() {
            let span = find_numeric_range("Streda 04.06.2025 o 17:00").unwrap();
            assert_eq!(span, DateSpan::single(date(2025, 6, 4)));
        }

        #[test]
        fn range_anchors_to_leading_unrelated_date() {
            // Documented limitation: the publication date is taken as start.
            let span = find_numeric_range("Publikované 01.03.2025. Podujatie 20.03.2025").unwrap();
            assert_eq!(span.start, date(2025, 3, 1));
            assert_eq!(span.end, date(2025, 3, 20));
        }

        #[test]
        fn range_without_dates() {
            assert!(find_numeric_range("Košice").is_none());
            assert!(!contains_numeric_date("Košice"));
            assert!(contains_numeric_date("od 1.1.2026"));
        }
    }

    mod year_inference {
        use super::*;

        #[test]
        fn upcoming_date_stays_in_current_year() {
            let today = date(2025, 9, 15);
            assert_eq!(infer_year(10, 6, today), Some(date(2025, 10, 6)));
        }

        #[test]
        fn today_is_not_passed() {
            let today = date(2025, 9, 15);
            assert_eq!(infer_year(9, 15, today), Some(date(2025, 9, 15)));
        }

        #[test]
        fn passed_date_rolls_forward() {
            let today = date(2025, 9, 15);
            assert_eq!(infer_year(1, 20, today), Some(date(2026, 1, 20)));
        }

        #[test]
        fn leap_day_without_leap_year_is_unparseable() {
            assert_eq!(infer_year(2, 29, date(2025, 1, 1)), None);
            assert_eq!(infer_year(2, 29, date(2028, 1, 1)), Some(date(2028, 2, 29)));
        }

        #[test]
        fn day_month_with_optional_year() {
            let today = date(2025, 11, 1);
            assert_eq!(
                parse_day_month("12", "Nov", Some("2024"), today),
                Some(date(2024, 11, 12))
            );
            assert_eq!(parse_day_month("12", "Nov", None, today), Some(date(2025, 11, 12)));
            assert_eq!(parse_day_month("5", "máj", None, today), Some(date(2026, 5, 5)));
            assert_eq!(parse_day_month("5.", "máj", Some(""), today), Some(date(2026, 5, 5)));
            assert_eq!(parse_day_month("x", "máj", None, today), None);
            assert_eq!(parse_day_month("5", "smarch", None, today), None);
        }
    }

    mod human {
        use super::*;

        #[test]
        fn slovak_genitive_and_numeric_agree() {
            let today = date(2025, 1, 1);
            assert_eq!(parse_human("6. októbra 2025", today), Some(date(2025, 10, 6)));
            assert_eq!(parse_human("06.10.2025", today), Some(date(2025, 10, 6)));
        }

        #[test]
        fn collapses_whitespace_and_case() {
            let today = date(2025, 1, 1);
            assert_eq!(
                parse_human("  6.   Októbra\n 2025 ", today),
                Some(date(2025, 10, 6))
            );
            assert_eq!(parse_human("6 October 2025", today), Some(date(2025, 10, 6)));
        }

        #[test]
        fn skips_number_word_pairs_that_are_not_months() {
            let today = date(2025, 1, 1);
            assert_eq!(
                parse_human("20 miest, termín 3. marca 2025", today),
                Some(date(2025, 3, 3))
            );
        }

        #[test]
        fn missing_year_is_inferred() {
            let today = date(2025, 11, 1);
            assert_eq!(parse_human("3. marca", today), Some(date(2026, 3, 3)));
        }

        #[test]
        fn garbage_is_unparseable() {
            assert_eq!(parse_human("čoskoro", date(2025, 1, 1)), None);
        }
    }

    mod iso {
        use super::*;

        #[test]
        fn offset_is_discarded_wall_clock_kept() {
            assert_eq!(parse_iso("2025-03-10T18:00:00+01:00"), Some(at(2025, 3, 10, 18, 0)));
            assert_eq!(parse_iso("2025-03-10T18:00:00Z"), Some(at(2025, 3, 10, 18, 0)));
            assert_eq!(parse_iso("2025-03-10T18:00:00+0100"), Some(at(2025, 3, 10, 18, 0)));
        }

        #[test]
        fn naive_forms() {
            assert_eq!(parse_iso("2025-03-10T18:30:00"), Some(at(2025, 3, 10, 18, 30)));
            assert_eq!(parse_iso("2025-03-10T18:30:00.000"), Some(at(2025, 3, 10, 18, 30)));
            assert_eq!(parse_iso("2025-03-10T18:30"), Some(at(2025, 3, 10, 18, 30)));
            assert_eq!(parse_iso("2025-03-10 18:30"), Some(at(2025, 3, 10, 18, 30)));
        }

        #[test]
        fn date_only() {
            assert_eq!(
                parse_iso("2025-03-10"),
                Some(EventTime::from_date(date(2025, 3, 10)))
            );
        }

        #[test]
        fn fails_closed() {
            assert_eq!(parse_iso(""), None);
            assert_eq!(parse_iso("10.03.2025"), None);
            assert_eq!(parse_iso("March 10"), None);
        }
    }
}
