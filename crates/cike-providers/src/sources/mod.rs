//! Event sources.
//!
//! Each site is an [`EventSource`]: it scrapes its pages and returns a
//! [`ScrapeOutcome`] with raw records and counters. Sources never fail the
//! run; fetch errors are logged and reflected in [`SourceStatus`].
//!
//! Site markup is parsed synchronously from `&str` in helper functions, so
//! no parsed document is held across an await point.

pub mod amcham;
pub mod ickk;
pub mod itvalley;
pub mod pager;
pub mod sopk;

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use cike_core::{RawEventRecord, SourceTag, normalize_title};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use crate::BoxFuture;

pub use amcham::AmChamSource;
pub use ickk::IckkSource;
pub use itvalley::ItValleySource;
pub use pager::{PageFeed, RenderCommandFeed, UrlListFeed, Walk, WalkLimits, WalkStop, walk_pages};
pub use sopk::SopkSource;

/// Per-run inputs shared by all sources.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeContext {
    /// The run's current date in the destination time zone.
    pub today: NaiveDate,
    /// How far back past listings are kept.
    pub past_days: u32,
}

impl ScrapeContext {
    /// Creates a context.
    pub fn new(today: NaiveDate, past_days: u32) -> Self {
        Self { today, past_days }
    }

    /// Earliest date kept from past listings, clamped to the first
    /// representable date.
    pub fn past_cutoff(&self) -> NaiveDate {
        self.today
            .checked_sub_days(Days::new(u64::from(self.past_days)))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// How a scrape ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    /// Every page was fetched.
    Complete,
    /// Some pages were abandoned after retries.
    Partial,
    /// Nothing could be fetched.
    Failed,
    /// The source is not configured.
    Skipped,
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.pad(s)
    }
}

/// Result of one source's scrape.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    /// Tag of the source.
    pub source: SourceTag,
    /// Records in page order.
    pub records: Vec<RawEventRecord>,
    /// Listings dropped because their date could not be parsed.
    pub dropped: usize,
    /// Pages fetched successfully.
    pub pages_fetched: usize,
    /// Pages abandoned after retries.
    pub pages_failed: usize,
    /// Overall status.
    pub status: SourceStatus,
}

impl ScrapeOutcome {
    /// Creates an empty outcome, to be filled and then [`finish`](Self::finish)ed.
    pub fn new(source: SourceTag) -> Self {
        Self {
            source,
            records: Vec::new(),
            dropped: 0,
            pages_fetched: 0,
            pages_failed: 0,
            status: SourceStatus::Complete,
        }
    }

    /// Outcome of a source that did not run.
    pub fn skipped(source: SourceTag) -> Self {
        Self {
            status: SourceStatus::Skipped,
            ..Self::new(source)
        }
    }

    /// Derives the status from the page counters.
    pub fn finish(mut self) -> Self {
        if self.status != SourceStatus::Skipped {
            self.status = match (self.pages_fetched, self.pages_failed) {
                (_, 0) => SourceStatus::Complete,
                (0, _) => SourceStatus::Failed,
                _ => SourceStatus::Partial,
            };
        }
        self
    }

    /// Returns `true` unless the source failed outright.
    pub fn succeeded(&self) -> bool {
        matches!(self.status, SourceStatus::Complete | SourceStatus::Partial)
    }
}

/// A site that publishes events.
pub trait EventSource: Send + Sync {
    /// Tag attached to every record.
    fn tag(&self) -> SourceTag;

    /// Scrapes the site. Never fails; see [`ScrapeOutcome::status`].
    fn scrape<'a>(&'a self, ctx: &'a ScrapeContext) -> BoxFuture<'a, ScrapeOutcome>;
}

/// Titles already emitted by one source during one scrape.
///
/// Keyed by normalized title and start date. Lives only as long as the
/// scrape that owns it.
#[derive(Debug, Default)]
pub struct SeenSet {
    keys: HashSet<(String, NaiveDate)>,
}

impl SeenSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a listing. Returns `false` when it was already seen.
    pub fn insert(&mut self, title: &str, date: NaiveDate) -> bool {
        self.keys.insert((normalize_title(title), date))
    }

    /// Number of distinct listings.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Collapses runs of whitespace and trims.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Text content of an element, whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first element matching `selector` under `element`.
pub(crate) fn select_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Strips markup and decodes entities, twice if the text itself contained
/// escaped markup.
pub(crate) fn clean_html_text(text: &str) -> String {
    let once = fragment_text(text);
    if once.contains('<') {
        fragment_text(&once)
    } else {
        once
    }
}

fn fragment_text(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    collapse_whitespace(&fragment.root_element().text().collect::<Vec<_>>().join(" "))
}

/// Resolves `href` against `base`; returns `href` unchanged if either is
/// not a valid URL.
pub(crate) fn absolute_url(base: &str, href: &str) -> String {
    let href = href.trim();
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

/// Event description: the excerpt followed by the event link.
pub(crate) fn describe(text: &str, link: &str) -> String {
    format!("{}\n\n{}", text.trim(), link.trim()).trim().to_string()
}

/// Parses a compile-time constant selector.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Invalid CSS selector")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod outcome {
        use super::*;

        #[test]
        fn status_from_counters() {
            let mut outcome = ScrapeOutcome::new(SourceTag::Sopk);
            outcome.pages_fetched = 3;
            assert_eq!(outcome.clone().finish().status, SourceStatus::Complete);

            outcome.pages_failed = 1;
            assert_eq!(outcome.clone().finish().status, SourceStatus::Partial);

            outcome.pages_fetched = 0;
            let failed = outcome.finish();
            assert_eq!(failed.status, SourceStatus::Failed);
            assert!(!failed.succeeded());
        }

        #[test]
        fn skipped_stays_skipped() {
            let outcome = ScrapeOutcome::skipped(SourceTag::AmCham).finish();
            assert_eq!(outcome.status, SourceStatus::Skipped);
            assert!(outcome.records.is_empty());
        }

        #[test]
        fn past_cutoff() {
            let ctx = ScrapeContext::new(date(2025, 6, 1), 365);
            assert_eq!(ctx.past_cutoff(), date(2024, 6, 1));
        }

        #[test]
        fn past_cutoff_saturates() {
            let ctx = ScrapeContext::new(date(2025, 6, 1), u32::MAX);
            assert_eq!(ctx.past_cutoff(), NaiveDate::MIN);
        }
    }

    mod seen {
        use super::*;

        #[test]
        fn same_title_and_date_is_seen_once() {
            let mut seen = SeenSet::new();
            assert!(seen.insert("Demo Day", date(2025, 3, 1)));
            assert!(!seen.insert("  demo   day ", date(2025, 3, 1)));
            assert!(seen.insert("Demo Day", date(2025, 3, 2)));
            assert_eq!(seen.len(), 2);
        }
    }

    mod text {
        use super::*;

        #[test]
        fn clean_html_decodes_and_strips() {
            assert_eq!(clean_html_text("<p>Veľtrh &amp; konferencia</p>"), "Veľtrh & konferencia");
            assert_eq!(clean_html_text("&lt;b&gt;Bold&lt;/b&gt; text"), "Bold text");
            assert_eq!(clean_html_text("  plain\n text "), "plain text");
        }

        #[test]
        fn absolute_urls() {
            assert_eq!(
                absolute_url("https://ickk.sk/vzdelavanie/", "/kurz/excel/"),
                "https://ickk.sk/kurz/excel/"
            );
            assert_eq!(
                absolute_url("https://ickk.sk/vzdelavanie/", "https://other.sk/x"),
                "https://other.sk/x"
            );
        }

        #[test]
        fn description_layout() {
            assert_eq!(describe("Popis", "https://x.sk"), "Popis\n\nhttps://x.sk");
            assert_eq!(describe("", "https://x.sk"), "https://x.sk");
            assert_eq!(describe(" Popis ", ""), "Popis");
        }

        #[test]
        fn element_text_collapses() {
            let html = Html::parse_fragment("<div><span> a </span>\n<b>b</b></div>");
            let sel = selector("div");
            let div = html.select(&sel).next().unwrap();
            assert_eq!(element_text(div), "a b");
            assert_eq!(select_text(div, &selector("b")).as_deref(), Some("b"));
            assert_eq!(select_text(div, &selector("i")), None);
        }
    }
}
