//! Slovak Chamber of Commerce and Industry (SOPK) event list.
//!
//! The list pages embed schema.org `Event` objects as JSON-LD. A fixed set
//! of future pages and past pages is read; past events older than the
//! configured horizon are dropped.

use std::sync::LazyLock;

use cike_core::dates::parse_iso;
use cike_core::{RawEventRecord, SourceTag};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{EventSource, ScrapeContext, ScrapeOutcome, SeenSet, clean_html_text, describe, selector};
use crate::BoxFuture;
use crate::http::HttpFetcher;

/// Event list.
pub const BASE_URL: &str = "https://www.sopk.sk/events/zoznam/";

static JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"script[type="application/ld+json"]"#));

/// URLs of the future listing: the base page, then `page/N/`.
pub fn future_urls(base: &str, pages: usize) -> Vec<String> {
    (1..=pages)
        .map(|page| {
            if page == 1 {
                base.to_string()
            } else {
                format!("{base}page/{page}/")
            }
        })
        .collect()
}

/// URLs of the past listing.
pub fn past_urls(base: &str, pages: usize) -> Vec<String> {
    (1..=pages)
        .map(|page| {
            if page == 1 {
                format!("{base}?eventDisplay=past")
            } else {
                format!("{base}page/{page}/?eventDisplay=past")
            }
        })
        .collect()
}

/// SOPK event source.
#[derive(Debug)]
pub struct SopkSource {
    fetcher: HttpFetcher,
    base_url: String,
    future_pages: usize,
    past_pages: usize,
}

impl SopkSource {
    /// Creates the source.
    pub fn new(fetcher: HttpFetcher, future_pages: usize, past_pages: usize) -> Self {
        Self {
            fetcher,
            base_url: BASE_URL.to_string(),
            future_pages,
            past_pages,
        }
    }

    /// Reads `urls` in order, stopping at the first page that cannot be
    /// fetched.
    async fn crawl(
        &self,
        urls: Vec<String>,
        cutoff: Option<chrono::NaiveDate>,
        seen: &mut SeenSet,
        outcome: &mut ScrapeOutcome,
    ) {
        for url in urls {
            let body = match self.fetcher.get_text(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(source = %SourceTag::Sopk, url, error = %e, "page abandoned");
                    outcome.pages_failed += 1;
                    return;
                }
            };
            outcome.pages_fetched += 1;
            let before = outcome.records.len();
            parse_page(&body, &self.base_url, cutoff, seen, outcome);
            debug!(url, events = outcome.records.len() - before, "sopk page");
        }
    }
}

impl EventSource for SopkSource {
    fn tag(&self) -> SourceTag {
        SourceTag::Sopk
    }

    fn scrape<'a>(&'a self, ctx: &'a ScrapeContext) -> BoxFuture<'a, ScrapeOutcome> {
        Box::pin(async move {
            let mut outcome = ScrapeOutcome::new(SourceTag::Sopk);
            let mut seen = SeenSet::new();
            let future = future_urls(&self.base_url, self.future_pages);
            self.crawl(future, None, &mut seen, &mut outcome).await;

            let past = past_urls(&self.base_url, self.past_pages);
            self.crawl(past, Some(ctx.past_cutoff()), &mut seen, &mut outcome)
                .await;

            let outcome = outcome.finish();
            info!(
                source = %SourceTag::Sopk,
                events = outcome.records.len(),
                dropped = outcome.dropped,
                "scraped"
            );
            outcome
        })
    }
}

/// Extracts JSON-LD events of one page into `outcome`.
///
/// With a `cutoff`, events starting before it are skipped.
pub fn parse_page(
    html: &str,
    base_url: &str,
    cutoff: Option<chrono::NaiveDate>,
    seen: &mut SeenSet,
    outcome: &mut ScrapeOutcome,
) {
    for item in json_ld_events(html) {
        let title = item
            .get("name")
            .and_then(Value::as_str)
            .map(clean_html_text)
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }
        let Some(start) = item.get("startDate").and_then(Value::as_str).and_then(parse_iso) else {
            debug!(title, "no parseable start, dropping");
            outcome.dropped += 1;
            continue;
        };
        let end = item
            .get("endDate")
            .and_then(Value::as_str)
            .and_then(parse_iso)
            .unwrap_or(start);

        if cutoff.is_some_and(|cutoff| start.date() < cutoff) {
            continue;
        }
        if !seen.insert(&title, start.date()) {
            continue;
        }

        let description = item
            .get("description")
            .and_then(Value::as_str)
            .map(clean_html_text)
            .unwrap_or_default();
        let link = item
            .get("url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(base_url);

        outcome.records.push(
            RawEventRecord::new(title, start, SourceTag::Sopk)
                .with_end(end)
                .with_location(location(item.get("location")))
                .with_description(describe(&description, link)),
        );
    }
}

/// All objects typed `Event` in the page's JSON-LD scripts.
fn json_ld_events(html: &str) -> Vec<Value> {
    let document = Html::parse_document(html);
    let mut events = Vec::new();
    for script in document.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let data = match serde_json::from_str::<Value>(raw) {
            Ok(data) => data,
            Err(e) => {
                debug!(error = %e, "skipping malformed JSON-LD");
                continue;
            }
        };
        collect_events(data, &mut events);
    }
    events
}

fn collect_events(data: Value, out: &mut Vec<Value>) {
    match data {
        Value::Array(items) => {
            for item in items {
                collect_events(item, out);
            }
        }
        Value::Object(mut object) => {
            if let Some(graph) = object.remove("@graph") {
                collect_events(graph, out);
            }
            if object.get("@type").and_then(Value::as_str) == Some("Event") {
                out.push(Value::Object(object));
            }
        }
        _ => {}
    }
}

/// Venue name and address parts, comma-joined.
fn location(value: Option<&Value>) -> String {
    let Some(Value::Object(location)) = value else {
        return value
            .and_then(Value::as_str)
            .map(clean_html_text)
            .unwrap_or_default();
    };
    let text = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let mut parts: Vec<String> = text(location.get("name")).into_iter().collect();
    match location.get("address") {
        Some(Value::Object(address)) => {
            parts.extend(
                ["streetAddress", "addressLocality", "postalCode"]
                    .iter()
                    .filter_map(|key| text(address.get(*key))),
            );
        }
        other => parts.extend(text(other)),
    }
    parts.join(", ")
}
