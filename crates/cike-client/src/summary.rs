//! End-of-run summary.

use std::fmt;

use cike_core::SourceTag;
use cike_providers::{ExportReport, RemoteSyncReport, ScrapeOutcome, SourceStatus};
use serde::Serialize;
use tracing::info;

/// Counters of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source: SourceTag,
    pub status: SourceStatus,
    pub records: usize,
    pub dropped: usize,
    pub pages_fetched: usize,
    pub pages_failed: usize,
}

impl From<&ScrapeOutcome> for SourceSummary {
    fn from(outcome: &ScrapeOutcome) -> Self {
        Self {
            source: outcome.source,
            status: outcome.status,
            records: outcome.records.len(),
            dropped: outcome.dropped,
            pages_fetched: outcome.pages_fetched,
            pages_failed: outcome.pages_failed,
        }
    }
}

/// Mode A counters with the calendar they apply to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSummary {
    pub calendar: String,
    #[serde(flatten)]
    pub report: RemoteSyncReport,
}

/// What a run did, from scraping to the last destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Sources in invocation order.
    pub sources: Vec<SourceSummary>,
    /// Records returned by the sources.
    pub records_parsed: usize,
    /// Listings with unparseable dates plus records rejected by normalization.
    pub records_dropped: usize,
    /// Events removed by deduplication.
    pub duplicates: usize,
    /// Events left after deduplication.
    pub events: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportReport>,
}

impl RunSummary {
    /// Adds a finished scrape.
    pub fn record_source(&mut self, outcome: &ScrapeOutcome) {
        self.records_parsed += outcome.records.len();
        self.records_dropped += outcome.dropped;
        self.sources.push(SourceSummary::from(outcome));
    }

    pub fn succeeded(&self) -> usize {
        self.count(|status| matches!(status, SourceStatus::Complete | SourceStatus::Partial))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| status == SourceStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(|status| status == SourceStatus::Skipped)
    }

    fn count(&self, pred: impl Fn(SourceStatus) -> bool) -> usize {
        self.sources.iter().filter(|s| pred(s.status)).count()
    }

    /// Emits the summary as structured log events.
    pub fn log(&self) {
        info!(
            succeeded = self.succeeded(),
            failed = self.failed(),
            skipped = self.skipped(),
            records_parsed = self.records_parsed,
            records_dropped = self.records_dropped,
            duplicates = self.duplicates,
            events = self.events,
            "run summary"
        );
        if let Some(remote) = &self.remote {
            info!(
                calendar = remote.calendar,
                fetched = remote.report.fetched,
                kept_past = remote.report.kept_past,
                deleted = remote.report.deleted,
                delete_failed = remote.report.delete_failed,
                inserted = remote.report.inserted,
                insert_failed = remote.report.insert_failed,
                skipped_past = remote.report.skipped_past,
                "remote summary"
            );
        }
        if let Some(export) = &self.export {
            info!(
                path = %export.path.display(),
                written = export.written,
                duplicates = export.duplicates,
                "export summary"
            );
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "sources: {} succeeded, {} failed, {} skipped",
            self.succeeded(),
            self.failed(),
            self.skipped()
        )?;
        for s in &self.sources {
            writeln!(
                f,
                "  {:<8} {:<8} {} records, {} dropped, {} pages ({} failed)",
                s.source.as_str(),
                s.status,
                s.records,
                s.dropped,
                s.pages_fetched,
                s.pages_failed
            )?;
        }
        write!(
            f,
            "records: {} parsed, {} dropped, {} duplicates, {} events",
            self.records_parsed, self.records_dropped, self.duplicates, self.events
        )?;
        if let Some(remote) = &self.remote {
            let r = &remote.report;
            write!(
                f,
                "\nremote {}: {} listed, {} kept past, {} deleted ({} failed), {} inserted ({} failed), {} skipped past",
                remote.calendar,
                r.fetched,
                r.kept_past,
                r.deleted,
                r.delete_failed,
                r.inserted,
                r.insert_failed,
                r.skipped_past
            )?;
        }
        if let Some(export) = &self.export {
            write!(
                f,
                "\nexport {}: {} written, {} duplicates",
                export.path.display(),
                export.written,
                export.duplicates
            )?;
        }
        Ok(())
    }
}
