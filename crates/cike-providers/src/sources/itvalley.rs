//! Košice IT Valley listing.
//!
//! The listing is paginated through a query parameter. Each card has a
//! heading, a list of icon spans (one of them a `dd.mm.yyyy` date or date
//! range, the first other one the venue), an excerpt and a link.

use std::sync::LazyLock;

use cike_core::dates::{contains_numeric_date, find_numeric_range};
use cike_core::{EventTime, RawEventRecord, SourceTag};
use scraper::{Html, Selector};
use tracing::{debug, info};

use super::pager::{UrlListFeed, WalkLimits, walk_pages};
use super::{
    EventSource, ScrapeContext, ScrapeOutcome, SeenSet, absolute_url, describe, element_text,
    select_text, selector,
};
use crate::BoxFuture;
use crate::http::HttpFetcher;

/// First listing page.
pub const BASE_URL: &str = "https://www.kosiceitvalley.sk/podujatia/";

/// Location used when a card names none.
const DEFAULT_LOCATION: &str = "Košice";

static CARD: LazyLock<Selector> = LazyLock::new(|| selector("div.e-loop-item"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h2.elementor-heading-title"));
static ICON_TEXT: LazyLock<Selector> =
    LazyLock::new(|| selector("span.elementor-icon-list-text"));
static EXCERPT: LazyLock<Selector> =
    LazyLock::new(|| selector(".elementor-widget-theme-post-excerpt"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

/// URL of listing page `page` (1-based).
pub fn page_url(base: &str, page: usize) -> String {
    if page <= 1 {
        base.to_string()
    } else {
        format!("{base}?e-page-bd2a498={page}")
    }
}

/// IT Valley event source.
#[derive(Debug)]
pub struct ItValleySource {
    fetcher: HttpFetcher,
    base_url: String,
    max_pages: usize,
}

impl ItValleySource {
    /// Creates the source.
    pub fn new(fetcher: HttpFetcher, max_pages: usize) -> Self {
        Self {
            fetcher,
            base_url: BASE_URL.to_string(),
            max_pages,
        }
    }

    /// Builder method to override the listing URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl EventSource for ItValleySource {
    fn tag(&self) -> SourceTag {
        SourceTag::ItValley
    }

    fn scrape<'a>(&'a self, _ctx: &'a ScrapeContext) -> BoxFuture<'a, ScrapeOutcome> {
        Box::pin(async move {
            let urls = (1..=self.max_pages).map(|page| page_url(&self.base_url, page));
            let mut feed = UrlListFeed::new(&self.fetcher, urls);
            let walk = walk_pages(&mut feed, WalkLimits::pages(self.max_pages), card_titles).await;
            debug!(stop = ?walk.stop, pages = walk.pages.len(), "itvalley walk finished");

            let mut outcome = ScrapeOutcome::new(SourceTag::ItValley);
            outcome.pages_fetched = walk.fetched;
            outcome.pages_failed = walk.failures;

            let mut seen = SeenSet::new();
            for page in &walk.pages {
                parse_page(page, &self.base_url, &mut seen, &mut outcome);
            }
            let outcome = outcome.finish();
            info!(
                source = %SourceTag::ItValley,
                events = outcome.records.len(),
                dropped = outcome.dropped,
                "scraped"
            );
            outcome
        })
    }
}

/// Card titles on a page, used to detect repeated pages.
pub fn card_titles(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&CARD)
        .filter_map(|card| select_text(card, &TITLE))
        .collect()
}

/// Extracts the cards of one page into `outcome`.
pub fn parse_page(html: &str, base_url: &str, seen: &mut SeenSet, outcome: &mut ScrapeOutcome) {
    let document = Html::parse_document(html);
    for card in document.select(&CARD) {
        let Some(title) = select_text(card, &TITLE) else {
            continue;
        };

        let spans: Vec<String> = card.select(&ICON_TEXT).map(element_text).collect();
        let date_text = spans.iter().find(|s| contains_numeric_date(s));
        let location = spans
            .iter()
            .find(|s| !s.is_empty() && !contains_numeric_date(s))
            .map(String::as_str)
            .unwrap_or(DEFAULT_LOCATION);

        let Some(span) = date_text.and_then(|text| find_numeric_range(text)) else {
            debug!(title, "no parseable date, dropping");
            outcome.dropped += 1;
            continue;
        };
        if !seen.insert(&title, span.start) {
            continue;
        }

        let excerpt = select_text(card, &EXCERPT).unwrap_or_default();
        let link = card
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolute_url(base_url, href))
            .unwrap_or_else(|| base_url.to_string());

        outcome.records.push(
            RawEventRecord::new(title, EventTime::from_date(span.start), SourceTag::ItValley)
                .with_end(EventTime::from_date(span.end))
                .with_location(location)
                .with_description(describe(&excerpt, &link)),
        );
    }
}
