//! The `sync` command: scrape, aggregate, publish.
//!
//! One linear pass. Sources run one after another in invocation order, their
//! records are normalized and aggregated, then the remote calendar (Mode A)
//! and the calendar file (Mode B) are rewritten. A remote calendar that
//! cannot be listed ends the run before anything is deleted, and the file is
//! then left as it was.

use std::path::PathBuf;

use chrono::NaiveDate;
use chrono_tz::Tz;
use cike_core::{Aggregator, NormalizedEvent, SourceTag, normalize_records};
use cike_providers::{
    AmChamSource, CategoryMap, EventSource, HttpFetcher, IckkSource, ItValleySource,
    RemoteCalendar, ScrapeContext, SopkSource, export_to_file, sync_remote,
};
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::summary::{RemoteSummary, RunSummary};

/// Command-line switches of `cike sync`.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub no_remote: bool,
    pub no_export: bool,
    pub export_path: Option<PathBuf>,
}

/// Mode A destination of a run.
pub struct RemoteTarget<'a> {
    pub calendar: &'a dyn RemoteCalendar,
    /// Listing floor.
    pub since: NaiveDate,
    pub categories: CategoryMap,
}

/// Everything a run needs besides its sources.
pub struct RunPlan<'a> {
    pub ctx: ScrapeContext,
    pub timezone: Tz,
    pub remote: Option<RemoteTarget<'a>>,
    /// Mode B target; `None` skips the file.
    pub export: Option<PathBuf>,
}

/// Runs `cike sync` with the loaded configuration.
pub async fn run(config: &ClientConfig, options: SyncOptions) -> ClientResult<RunSummary> {
    config.validate().map_err(ClientError::Config)?;
    let timezone = config.timezone().map_err(ClientError::Config)?;
    let ctx = ScrapeContext::new(super::today_in(&timezone), config.sources.past_days);
    let sources = build_sources(config)?;

    let export = if options.no_export {
        None
    } else {
        Some(
            options
                .export_path
                .clone()
                .unwrap_or_else(|| config.export.path.clone()),
        )
    };

    #[cfg(feature = "google")]
    if !options.no_remote {
        if let Some(google) = &config.google {
            let provider_config = google
                .to_provider_config(timezone, config.fetch_config().retry)
                .map_err(ClientError::Config)?;
            let since = provider_config.since;
            let calendar = cike_providers::google::GoogleCalendar::new(provider_config)?;
            let plan = RunPlan {
                ctx,
                timezone,
                remote: Some(RemoteTarget {
                    calendar: &calendar,
                    since,
                    categories: config.category_map().map_err(ClientError::Config)?,
                }),
                export,
            };
            return finish(execute(&sources, plan).await);
        }
    }

    if options.no_remote {
        debug!("remote calendar disabled on the command line");
    }
    let plan = RunPlan {
        ctx,
        timezone,
        remote: None,
        export,
    };
    finish(execute(&sources, plan).await)
}

fn finish(result: ClientResult<RunSummary>) -> ClientResult<RunSummary> {
    let summary = result?;
    println!("{summary}");
    Ok(summary)
}

/// Builds the enabled sources in invocation order.
pub fn build_sources(config: &ClientConfig) -> ClientResult<Vec<Box<dyn EventSource>>> {
    let fetch = config.fetch_config();
    let settings = &config.sources;
    let mut sources: Vec<Box<dyn EventSource>> = Vec::new();
    for tag in config.enabled_sources().map_err(ClientError::Config)? {
        let source: Box<dyn EventSource> = match tag {
            SourceTag::ItValley => Box::new(ItValleySource::new(
                HttpFetcher::new(&fetch)?,
                settings.itvalley.max_pages,
            )),
            SourceTag::AmCham => Box::new(AmChamSource::new(settings.amcham.render_settings())),
            SourceTag::Sopk => {
                let fetch = fetch.clone().with_insecure_tls(settings.sopk.allow_insecure_tls);
                Box::new(SopkSource::new(
                    HttpFetcher::new(&fetch)?,
                    settings.sopk.future_pages,
                    settings.sopk.past_pages,
                ))
            }
            SourceTag::Ickk => Box::new(IckkSource::new(HttpFetcher::new(&fetch)?)),
            SourceTag::Other => continue,
        };
        sources.push(source);
    }
    Ok(sources)
}

/// Scrapes every source in order and aggregates the results.
///
/// Returns the deduplicated events; counters go to `summary`.
pub async fn collect(
    sources: &[Box<dyn EventSource>],
    ctx: &ScrapeContext,
    summary: &mut RunSummary,
) -> Vec<NormalizedEvent> {
    let mut aggregator = Aggregator::new();
    for source in sources {
        let outcome = source.scrape(ctx).await;
        summary.record_source(&outcome);
        let normalized = normalize_records(outcome.records);
        summary.records_dropped += normalized.dropped;
        let added = aggregator.extend(normalized.events);
        debug!(source = %outcome.source, added, "aggregated");
    }
    summary.duplicates = aggregator.duplicates();
    summary.events = aggregator.len();
    aggregator.into_events()
}

/// Runs the pipeline against already built sources and destinations.
///
/// # Errors
///
/// Fails when the remote calendar cannot be listed or the calendar file
/// cannot be written. Per-source and per-entry failures are only counted.
pub async fn execute(
    sources: &[Box<dyn EventSource>],
    plan: RunPlan<'_>,
) -> ClientResult<RunSummary> {
    let mut summary = RunSummary::default();
    let events = collect(sources, &plan.ctx, &mut summary).await;
    info!(
        events = events.len(),
        duplicates = summary.duplicates,
        "aggregation finished"
    );

    if let Some(remote) = &plan.remote {
        let result = sync_remote(
            remote.calendar,
            &events,
            remote.since,
            plan.ctx.today,
            &remote.categories,
        )
        .await;
        match result {
            Ok(report) => {
                summary.remote = Some(RemoteSummary {
                    calendar: remote.calendar.name().to_string(),
                    report,
                });
            }
            Err(e) => {
                error!(calendar = remote.calendar.name(), error = %e, "remote calendar unreachable");
                summary.log();
                return Err(e.into());
            }
        }
    }

    if let Some(path) = &plan.export {
        match export_to_file(&events, path, &plan.timezone).await {
            Ok(report) => summary.export = Some(report),
            Err(e) => {
                error!(path = %path.display(), error = %e, "calendar file not written");
                summary.log();
                return Err(e.into());
            }
        }
    }

    summary.log();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use cike_core::{EventTime, RawEventRecord};
    use cike_providers::{
        BoxFuture, ProviderError, ProviderResult, ScrapeOutcome, SourceStatus, read_calendar,
    };
    use cike_providers::sync::{NewEntry, RemoteEntry};

    const TZ: Tz = chrono_tz::Europe::Bratislava;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2025, 6, 1)
    }

    fn record(title: &str, start: NaiveDate, source: SourceTag) -> RawEventRecord {
        RawEventRecord::new(title, EventTime::from_date(start), source)
    }

    struct FakeSource {
        tag: SourceTag,
        records: Vec<RawEventRecord>,
        fail: bool,
    }

    impl FakeSource {
        fn boxed(tag: SourceTag, records: Vec<RawEventRecord>) -> Box<dyn EventSource> {
            Box::new(Self {
                tag,
                records,
                fail: false,
            })
        }

        fn failing(tag: SourceTag) -> Box<dyn EventSource> {
            Box::new(Self {
                tag,
                records: Vec::new(),
                fail: true,
            })
        }
    }

    impl EventSource for FakeSource {
        fn tag(&self) -> SourceTag {
            self.tag
        }

        fn scrape<'a>(&'a self, _ctx: &'a ScrapeContext) -> BoxFuture<'a, ScrapeOutcome> {
            Box::pin(async move {
                let mut outcome = ScrapeOutcome::new(self.tag);
                if self.fail {
                    outcome.pages_failed = 1;
                } else {
                    outcome.records = self.records.clone();
                    outcome.pages_fetched = 1;
                }
                outcome.finish()
            })
        }
    }

    #[derive(Default)]
    struct FakeCalendar {
        entries: Vec<RemoteEntry>,
        unreachable: bool,
        calls: Mutex<Vec<String>>,
    }

    impl RemoteCalendar for FakeCalendar {
        fn name(&self) -> &str {
            "fake"
        }

        fn list_since(&self, since: NaiveDate) -> BoxFuture<'_, ProviderResult<Vec<RemoteEntry>>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(format!("list {since}"));
                if self.unreachable {
                    return Err(ProviderError::network("connection refused"));
                }
                Ok(self.entries.clone())
            })
        }

        fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(format!("delete {id}"));
                Ok(())
            })
        }

        fn insert<'a>(&'a self, entry: &'a NewEntry) -> BoxFuture<'a, ProviderResult<String>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(format!("insert {} {}", entry.summary, entry.category));
                Ok(format!("id-{}", entry.summary))
            })
        }
    }

    fn plan<'a>(remote: Option<&'a FakeCalendar>, export: Option<PathBuf>) -> RunPlan<'a> {
        RunPlan {
            ctx: ScrapeContext::new(today(), 365),
            timezone: TZ,
            remote: remote.map(|calendar| RemoteTarget {
                calendar,
                since: date(2020, 1, 1),
                categories: CategoryMap::default(),
            }),
            export,
        }
    }

    fn sources() -> Vec<Box<dyn EventSource>> {
        vec![
            FakeSource::boxed(
                SourceTag::ItValley,
                vec![
                    record("AI Day", date(2025, 6, 10), SourceTag::ItValley),
                    record("Meetup", date(2025, 5, 1), SourceTag::ItValley),
                ],
            ),
            FakeSource::failing(SourceTag::AmCham),
            FakeSource::boxed(
                SourceTag::Sopk,
                vec![
                    record("  ai   DAY ", date(2025, 6, 10), SourceTag::Sopk),
                    record("   ", date(2025, 6, 11), SourceTag::Sopk),
                    record("Summit", date(2025, 6, 20), SourceTag::Sopk),
                ],
            ),
        ]
    }

    mod collecting {
        use super::*;

        #[tokio::test]
        async fn first_source_wins_duplicates() {
            let mut summary = RunSummary::default();
            let events = collect(&sources(), &ScrapeContext::new(today(), 365), &mut summary).await;

            let titles: Vec<_> = events.iter().map(|e| (e.title(), e.source())).collect();
            assert_eq!(
                titles,
                [
                    ("AI Day", SourceTag::ItValley),
                    ("Meetup", SourceTag::ItValley),
                    ("Summit", SourceTag::Sopk),
                ]
            );
            assert_eq!(summary.records_parsed, 5);
            assert_eq!(summary.records_dropped, 1);
            assert_eq!(summary.duplicates, 1);
            assert_eq!(summary.events, 3);
            assert_eq!(summary.failed(), 1);
            assert_eq!(summary.sources[1].status, SourceStatus::Failed);
        }
    }

    mod pipeline {
        use super::*;

        #[tokio::test]
        async fn remote_then_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("cike_events.ics");
            let calendar = FakeCalendar {
                entries: vec![
                    RemoteEntry::new("old", "Old", Some(EventTime::from_date(date(2025, 5, 1)))),
                    RemoteEntry::new("next", "Next", Some(EventTime::from_date(date(2025, 6, 2)))),
                ],
                ..FakeCalendar::default()
            };

            let summary = execute(&sources(), plan(Some(&calendar), Some(path.clone())))
                .await
                .unwrap();

            let calls = calendar.calls.lock().unwrap().clone();
            assert_eq!(
                calls,
                [
                    "list 2020-01-01",
                    "delete next",
                    "insert AI Day 9",
                    "insert Summit 6",
                ]
            );
            let remote = summary.remote.unwrap();
            assert_eq!(remote.calendar, "fake");
            assert_eq!(remote.report.kept_past, 1);
            assert_eq!(remote.report.skipped_past, 1);

            // The file keeps past events.
            let export = summary.export.unwrap();
            assert_eq!(export.written, 3);
            let entries = read_calendar(&std::fs::read_to_string(&path).unwrap()).unwrap();
            assert_eq!(entries.len(), 3);
        }

        #[tokio::test]
        async fn unreachable_remote_is_fatal() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("cike_events.ics");
            let calendar = FakeCalendar {
                unreachable: true,
                ..FakeCalendar::default()
            };

            let err = execute(&sources(), plan(Some(&calendar), Some(path.clone())))
                .await
                .unwrap_err();
            assert!(matches!(err, ClientError::Provider(_)));
            assert_eq!(calendar.calls.lock().unwrap().len(), 1);
            assert!(!path.exists());
        }

        #[tokio::test]
        async fn without_destinations_only_scrapes() {
            let summary = execute(&sources(), plan(None, None)).await.unwrap();
            assert!(summary.remote.is_none());
            assert!(summary.export.is_none());
            assert_eq!(summary.events, 3);
        }

        #[tokio::test]
        async fn failing_export_is_fatal() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("missing").join("cike_events.ics");
            let err = execute(&sources(), plan(None, Some(path))).await.unwrap_err();
            assert!(matches!(err, ClientError::Provider(_)));
        }
    }

    mod building {
        use super::*;

        #[test]
        fn sources_follow_invocation_order() {
            let config: ClientConfig =
                toml::from_str("[sources]\nenabled = [\"ICKK\", \"AMCHAM\", \"ITVALLEY\"]\n").unwrap();
            let tags: Vec<_> = build_sources(&config)
                .unwrap()
                .iter()
                .map(|s| s.tag())
                .collect();
            assert_eq!(tags, [SourceTag::ItValley, SourceTag::AmCham, SourceTag::Ickk]);
        }
    }
}
