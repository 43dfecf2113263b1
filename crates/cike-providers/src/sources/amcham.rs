//! AmCham Slovakia events.
//!
//! The page loads more events through a button, so it is read through a
//! [`RenderCommandFeed`] that prints the page after a number of "load more"
//! activations. Only the upcoming and past-year containers are read; other
//! `.event-item` blocks on the page belong to navigation.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use cike_core::dates::parse_day_month;
use cike_core::{EventTime, RawEventRecord, SourceTag};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use super::pager::{RenderCommandFeed, WalkLimits, walk_pages};
use super::{
    EventSource, ScrapeContext, ScrapeOutcome, SeenSet, absolute_url, collapse_whitespace,
    describe, element_text, select_text, selector,
};
use crate::BoxFuture;

/// Events page.
pub const EVENTS_URL: &str = "https://amcham.sk/events";

static CONTAINERS: LazyLock<Selector> =
    LazyLock::new(|| selector("#event-list-upcoming--24, [id^='event-list-past-year-']"));
static ITEM: LazyLock<Selector> = LazyLock::new(|| selector(".event-item"));
static DATE_BOX: LazyLock<Selector> = LazyLock::new(|| selector(".event-date"));
static DAY_START: LazyLock<Selector> = LazyLock::new(|| selector(".day.day--start"));
static DAY_END: LazyLock<Selector> = LazyLock::new(|| selector(".day.day--end"));
static MONTH_START: LazyLock<Selector> = LazyLock::new(|| selector(".month.month--start"));
static MONTH: LazyLock<Selector> = LazyLock::new(|| selector(".month"));
static YEAR: LazyLock<Selector> = LazyLock::new(|| selector(".year"));
static TITLES: LazyLock<[Selector; 2]> =
    LazyLock::new(|| [selector(".event-item__desc .event-title"), selector(".event-title")]);
static TITLED_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[title]"));
static LOCATIONS: LazyLock<[Selector; 2]> = LazyLock::new(|| {
    [
        selector(".event-item__footer span.d-flex"),
        selector(".event-item__footer span"),
    ]
});
static SHORT_DESC: LazyLock<Selector> = LazyLock::new(|| selector(".event-shortdesc"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

/// Fallback over an item's text: start day, optional end day, month, year.
static DATE_FALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\b(?:\D+?(\d{1,2}))?\D+?(\p{L}{3,})\D+?(\d{4})")
        .expect("Invalid AmCham date regex")
});

/// Renderer settings for the AmCham page.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Renderer argv; `{url}` and `{step}` are substituted.
    pub command: Vec<String>,
    /// Timeout per render.
    pub timeout: Duration,
    /// Maximum renders.
    pub max_steps: usize,
    /// Renders without new items tolerated.
    pub max_stalls: usize,
}

/// AmCham event source.
#[derive(Debug)]
pub struct AmChamSource {
    render: Option<RenderSettings>,
    url: String,
}

impl AmChamSource {
    /// Creates the source; without render settings it is skipped.
    pub fn new(render: Option<RenderSettings>) -> Self {
        Self {
            render,
            url: EVENTS_URL.to_string(),
        }
    }
}

impl EventSource for AmChamSource {
    fn tag(&self) -> SourceTag {
        SourceTag::AmCham
    }

    fn scrape<'a>(&'a self, ctx: &'a ScrapeContext) -> BoxFuture<'a, ScrapeOutcome> {
        Box::pin(async move {
            let Some(render) = &self.render else {
                warn!(source = %SourceTag::AmCham, "no render command configured, skipping");
                return ScrapeOutcome::skipped(SourceTag::AmCham);
            };
            let mut outcome = ScrapeOutcome::new(SourceTag::AmCham);
            let mut feed = match RenderCommandFeed::new(&render.command, &self.url, render.timeout)
            {
                Ok(feed) => feed,
                Err(e) => {
                    warn!(source = %SourceTag::AmCham, error = %e, "invalid render command");
                    outcome.pages_failed = 1;
                    return outcome.finish();
                }
            };

            let limits = WalkLimits::load_more(render.max_steps, render.max_stalls);
            let walk = walk_pages(&mut feed, limits, item_titles).await;
            debug!(stop = ?walk.stop, renders = walk.fetched, "amcham walk finished");
            outcome.pages_fetched = walk.fetched;
            outcome.pages_failed = walk.failures;

            // Each render contains everything loaded so far.
            if let Some(page) = walk.last_page() {
                parse_page(page, &self.url, ctx.today, &mut SeenSet::new(), &mut outcome);
            }
            let outcome = outcome.finish();
            info!(
                source = %SourceTag::AmCham,
                events = outcome.records.len(),
                dropped = outcome.dropped,
                "scraped"
            );
            outcome
        })
    }
}

/// Titles of the items in the event containers.
pub fn item_titles(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    items(&document).filter_map(item_title).collect()
}

fn items(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document
        .select(&CONTAINERS)
        .flat_map(|container| container.select(&ITEM))
}

fn item_title(item: ElementRef<'_>) -> Option<String> {
    TITLES.iter().find_map(|sel| select_text(item, sel)).or_else(|| {
        item.select(&TITLED_LINK)
            .find_map(|a| a.value().attr("title"))
            .map(collapse_whitespace)
            .filter(|title| !title.is_empty())
    })
}

/// Extracts the event items of a rendered page into `outcome`.
pub fn parse_page(
    html: &str,
    base_url: &str,
    today: NaiveDate,
    seen: &mut SeenSet,
    outcome: &mut ScrapeOutcome,
) {
    let document = Html::parse_document(html);
    for item in items(&document) {
        let Some(title) = item_title(item) else {
            continue;
        };
        let Some((start, end)) = item_dates(item, today) else {
            debug!(title, "no parseable date, dropping");
            outcome.dropped += 1;
            continue;
        };
        if !seen.insert(&title, start) {
            continue;
        }

        let location = LOCATIONS
            .iter()
            .find_map(|sel| select_text(item, sel))
            .unwrap_or_default();
        let summary = select_text(item, &SHORT_DESC).unwrap_or_default();
        let link = item
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolute_url(base_url, href))
            .unwrap_or_else(|| base_url.to_string());

        outcome.records.push(
            RawEventRecord::new(title, EventTime::from_date(start), SourceTag::AmCham)
                .with_end(EventTime::from_date(end))
                .with_location(location)
                .with_description(describe(&summary, &link)),
        );
    }
}

/// Start and end dates from the date box, falling back to the item text.
fn item_dates(item: ElementRef<'_>, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let date_box = item.select(&DATE_BOX).next();
    let part = |sel: &Selector| date_box.and_then(|b| select_text(b, sel));

    let mut day_start = part(&DAY_START);
    let mut day_end = part(&DAY_END);
    let mut month = part(&MONTH_START).or_else(|| part(&MONTH));
    let mut year = part(&YEAR);

    let build = |day: &Option<String>, month: &Option<String>, year: &Option<String>| {
        parse_day_month(day.as_deref()?, month.as_deref()?, year.as_deref(), today)
    };

    let mut start = build(&day_start, &month, &year);
    if start.is_none() {
        let text = element_text(item);
        if let Some(caps) = DATE_FALLBACK.captures(&text) {
            let group = |i| caps.get(i).map(|m| m.as_str().to_string());
            day_start = day_start.or_else(|| group(1));
            day_end = day_end.or_else(|| group(2));
            month = month.or_else(|| group(3));
            year = year.or_else(|| group(4));
            start = build(&day_start, &month, &year);
        }
    }

    let start = start?;
    // The end shares the start's year.
    let year = year.or_else(|| Some(start.year().to_string()));
    let end = build(&day_end, &month, &year)
        .filter(|end| *end >= start)
        .unwrap_or(start);
    Some((start, end))
}
