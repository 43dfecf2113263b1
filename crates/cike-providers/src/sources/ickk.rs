//! ICKK education listing.
//!
//! One page carries two widgets: upcoming cards showing a day and a month
//! abbreviation without a year, and a grid of past posts with human dates.

use std::sync::LazyLock;

use chrono::NaiveDate;
use cike_core::dates::{parse_day_month, parse_human};
use cike_core::{EventTime, RawEventRecord, SourceTag};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use super::{
    EventSource, ScrapeContext, ScrapeOutcome, SeenSet, absolute_url, describe, element_text,
    select_text, selector,
};
use crate::BoxFuture;
use crate::http::HttpFetcher;

/// Education page.
pub const BASE_URL: &str = "https://ickk.sk/vzdelavanie/";

const DEFAULT_LOCATION: &str = "Košice";

static CARD: LazyLock<Selector> = LazyLock::new(|| selector(".ewpe-inner-wrapper"));
static CARD_MONTH: LazyLock<Selector> = LazyLock::new(|| selector(".ewpe-ev-mo"));
static CARD_DAY: LazyLock<Selector> = LazyLock::new(|| selector(".ewpe-ev-day"));
static CARD_TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".ewpe-event-title"));
static CARD_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.event-link"));
static CARD_CITY: LazyLock<Selector> =
    LazyLock::new(|| selector(".ewpe-event-venue-details .ewpe-add-city"));
static CARD_EXCERPT: LazyLock<Selector> = LazyLock::new(|| selector(".ewpe-evt-excerpt"));

static POST: LazyLock<Selector> =
    LazyLock::new(|| selector(".rt-tpg-container .tpg-post-holder"));
static POST_TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".entry-title a"));
static POST_DATE: LazyLock<Selector> = LazyLock::new(|| selector(".post-meta-tags .date a"));
static POST_EXCERPT: LazyLock<Selector> = LazyLock::new(|| selector(".tpg-excerpt-inner"));

/// ICKK event source.
#[derive(Debug)]
pub struct IckkSource {
    fetcher: HttpFetcher,
    url: String,
}

impl IckkSource {
    /// Creates the source.
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            url: BASE_URL.to_string(),
        }
    }
}

impl EventSource for IckkSource {
    fn tag(&self) -> SourceTag {
        SourceTag::Ickk
    }

    fn scrape<'a>(&'a self, ctx: &'a ScrapeContext) -> BoxFuture<'a, ScrapeOutcome> {
        Box::pin(async move {
            let mut outcome = ScrapeOutcome::new(SourceTag::Ickk);
            match self.fetcher.get_text(&self.url).await {
                Ok(body) => {
                    outcome.pages_fetched = 1;
                    parse_page(&body, &self.url, ctx, &mut outcome);
                }
                Err(e) => {
                    warn!(source = %SourceTag::Ickk, url = %self.url, error = %e, "page abandoned");
                    outcome.pages_failed = 1;
                }
            }
            let outcome = outcome.finish();
            info!(
                source = %SourceTag::Ickk,
                events = outcome.records.len(),
                dropped = outcome.dropped,
                "scraped"
            );
            outcome
        })
    }
}

/// Extracts upcoming cards and recent past posts into `outcome`.
pub fn parse_page(html: &str, base_url: &str, ctx: &ScrapeContext, outcome: &mut ScrapeOutcome) {
    let document = Html::parse_document(html);
    let mut seen = SeenSet::new();

    for card in document.select(&CARD) {
        let link = href(card, &CARD_LINK);
        let Some(title) = select_text(card, &CARD_TITLE).or_else(|| {
            card.select(&CARD_LINK)
                .next()
                .map(element_text)
                .filter(|t| !t.is_empty())
        }) else {
            continue;
        };
        let Some(start) = card_date(card, ctx.today) else {
            debug!(title, "no parseable date, dropping");
            outcome.dropped += 1;
            continue;
        };
        if !seen.insert(&title, start) {
            continue;
        }
        let location =
            select_text(card, &CARD_CITY).unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let excerpt = select_text(card, &CARD_EXCERPT).unwrap_or_default();
        let link = link.map_or_else(|| base_url.to_string(), |h| absolute_url(base_url, &h));

        outcome.records.push(
            RawEventRecord::new(title, EventTime::from_date(start), SourceTag::Ickk)
                .with_location(location)
                .with_description(describe(&excerpt, &link)),
        );
    }

    let cutoff = ctx.past_cutoff();
    for post in document.select(&POST) {
        let Some(title) = select_text(post, &POST_TITLE) else {
            continue;
        };
        let date_text = select_text(post, &POST_DATE).unwrap_or_default();
        let Some(start) = parse_human(&date_text, ctx.today) else {
            debug!(title, date_text, "no parseable date, dropping");
            outcome.dropped += 1;
            continue;
        };
        if start < cutoff || !seen.insert(&title, start) {
            continue;
        }
        let excerpt = select_text(post, &POST_EXCERPT).unwrap_or_default();
        let link = href(post, &POST_TITLE)
            .map_or_else(|| base_url.to_string(), |h| absolute_url(base_url, &h));

        outcome.records.push(
            RawEventRecord::new(title, EventTime::from_date(start), SourceTag::Ickk)
                .with_location(DEFAULT_LOCATION)
                .with_description(describe(&excerpt, &link)),
        );
    }
}

fn href(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .find_map(|a| a.value().attr("href"))
        .map(String::from)
}

fn card_date(card: ElementRef<'_>, today: NaiveDate) -> Option<NaiveDate> {
    let month = select_text(card, &CARD_MONTH)?;
    let day = select_text(card, &CARD_DAY)?;
    parse_day_month(&day, &month, None, today)
}
