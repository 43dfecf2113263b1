//! The `scrape` command: run the sources and print what would be published.

use std::io::Write;

use cike_core::NormalizedEvent;
use cike_providers::ScrapeContext;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::summary::RunSummary;

use super::sync::{build_sources, collect};

/// Scrapes and aggregates, printing events to stdout and the summary to
/// stderr.
pub async fn run(config: &ClientConfig, json: bool) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;
    let timezone = config.timezone().map_err(ClientError::Config)?;
    let ctx = ScrapeContext::new(super::today_in(&timezone), config.sources.past_days);
    let sources = build_sources(config)?;

    let mut summary = RunSummary::default();
    let events = collect(&sources, &ctx, &mut summary).await;
    summary.log();

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &events)?;
        writeln!(out)?;
    } else {
        for event in &events {
            writeln!(out, "{}", event_line(event))?;
        }
    }
    eprintln!("{summary}");
    Ok(())
}

/// One line per event: start, end when it differs, source and title.
pub(crate) fn event_line(event: &NormalizedEvent) -> String {
    let when = if event.end() == event.start() {
        event.start().to_string()
    } else {
        format!("{} .. {}", event.start(), event.end())
    };
    format!("{:<34} {:<8} {}", when, event.source().as_str(), event.title())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cike_core::{EventTime, RawEventRecord, SourceTag, normalize_record};

    #[test]
    fn single_day_line() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let event = normalize_record(RawEventRecord::new(
            "Summit",
            EventTime::from_date(start),
            SourceTag::Sopk,
        ))
        .unwrap();
        let line = event_line(&event);
        assert!(line.starts_with(&EventTime::from_date(start).to_string()));
        assert!(line.ends_with("SOPK     Summit"));
    }

    #[test]
    fn multi_day_line_shows_the_range() {
        let start = NaiveDate::from_ymd_opt(2025, 5, 12).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 5, 14).unwrap();
        let event = normalize_record(
            RawEventRecord::new("Hackathon", EventTime::from_date(start), SourceTag::ItValley)
                .with_end(EventTime::from_date(end)),
        )
        .unwrap();
        assert!(event_line(&event).contains(" .. "));
    }
}
