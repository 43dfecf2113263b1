//! Mode A: replace the future window of a hosted calendar.
//!
//! Entries that start before today are history and are never touched. Every
//! entry from today on is deleted and the aggregated future events are
//! inserted in their place, so repeated runs converge on the same calendar.

use std::collections::HashMap;

use chrono::NaiveDate;
use cike_core::{EventTime, NormalizedEvent, SourceTag};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::BoxFuture;
use crate::error::ProviderResult;

/// An entry already present in the destination calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Destination identifier, used for deletion.
    pub id: String,
    /// Summary as stored.
    pub summary: String,
    /// Start in the destination time zone, `None` when unreadable.
    pub start: Option<EventTime>,
}

impl RemoteEntry {
    /// Creates an entry.
    pub fn new(id: impl Into<String>, summary: impl Into<String>, start: Option<EventTime>) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
            start,
        }
    }

    /// Returns `true` when the entry belongs to the past and must be kept.
    ///
    /// An entry without a readable start counts as past.
    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.start.is_none_or(|start| start.date() < today)
    }
}

/// An entry to create in the destination calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEntry {
    /// Normalized event title.
    pub summary: String,
    /// Event description.
    pub description: String,
    /// Venue text, possibly empty.
    pub location: String,
    /// Start, a date for all-day events.
    pub start: EventTime,
    /// Inclusive end; the destination converts to its own convention.
    pub end: EventTime,
    /// Destination color or category id from the [`CategoryMap`].
    pub category: u8,
    /// Source recorded in the entry's private properties.
    pub source: SourceTag,
}

impl NewEntry {
    /// Builds the entry for a normalized event.
    pub fn from_event(event: &NormalizedEvent, category: u8) -> Self {
        Self {
            summary: event.title().to_string(),
            description: event.description().to_string(),
            location: event.location().to_string(),
            start: event.start(),
            end: event.end(),
            category,
            source: event.source(),
        }
    }

    /// Returns `true` for all-day entries.
    pub fn is_all_day(&self) -> bool {
        matches!(self.start, EventTime::Date(_))
    }
}

/// A hosted calendar that can be listed, pruned and filled.
pub trait RemoteCalendar: Send + Sync {
    /// Returns the calendar name for logs.
    fn name(&self) -> &str;

    /// Lists every entry starting on or after `since`.
    fn list_since(&self, since: NaiveDate) -> BoxFuture<'_, ProviderResult<Vec<RemoteEntry>>>;

    /// Deletes one entry.
    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>>;

    /// Creates one entry and returns its destination identifier.
    fn insert<'a>(&'a self, entry: &'a NewEntry) -> BoxFuture<'a, ProviderResult<String>>;
}

/// Maps source tags to destination category ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMap {
    categories: HashMap<SourceTag, u8>,
}

impl CategoryMap {
    /// Category of [`SourceTag::Other`] unless overridden.
    pub const DEFAULT_OTHER: u8 = 8;

    /// Default category of a tag.
    pub fn default_for(tag: SourceTag) -> u8 {
        match tag {
            SourceTag::ItValley => 9,
            SourceTag::AmCham => 5,
            SourceTag::Sopk => 6,
            SourceTag::Ickk => 3,
            SourceTag::Other => Self::DEFAULT_OTHER,
        }
    }

    /// Overrides the category of `tag`.
    pub fn with_category(mut self, tag: SourceTag, category: u8) -> Self {
        self.categories.insert(tag, category);
        self
    }

    /// Category of `tag`, falling back to the `Other` category.
    pub fn get(&self, tag: SourceTag) -> u8 {
        self.categories
            .get(&tag)
            .or_else(|| self.categories.get(&SourceTag::Other))
            .copied()
            .unwrap_or(Self::DEFAULT_OTHER)
    }
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self {
            categories: SourceTag::ALL
                .into_iter()
                .map(|tag| (tag, Self::default_for(tag)))
                .collect(),
        }
    }
}

/// What a sync run will do, computed without touching the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSyncPlan {
    /// Entries returned by the listing.
    pub fetched: usize,
    /// Listed entries before today, left untouched.
    pub kept_past: usize,
    /// Ids of future entries, in listing order.
    pub delete: Vec<String>,
    /// Entries for events starting today or later.
    pub insert: Vec<NewEntry>,
    /// Events before today, not published.
    pub skipped_past: usize,
}

/// Partitions the destination and selects the events to publish.
pub fn plan_remote_sync(
    remote: &[RemoteEntry],
    events: &[NormalizedEvent],
    today: NaiveDate,
    categories: &CategoryMap,
) -> RemoteSyncPlan {
    let mut plan = RemoteSyncPlan {
        fetched: remote.len(),
        ..RemoteSyncPlan::default()
    };

    for entry in remote {
        if entry.is_past(today) {
            plan.kept_past += 1;
        } else {
            plan.delete.push(entry.id.clone());
        }
    }

    for event in events {
        if event.start().date() < today {
            plan.skipped_past += 1;
            continue;
        }
        plan.insert
            .push(NewEntry::from_event(event, categories.get(event.source())));
    }
    plan
}

/// Counters of a Mode A run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteSyncReport {
    /// Entries returned by the listing.
    pub fetched: usize,
    /// Past entries left in place.
    pub kept_past: usize,
    /// Future entries removed, including ones already gone.
    pub deleted: usize,
    pub delete_failed: usize,
    /// Events published.
    pub inserted: usize,
    pub insert_failed: usize,
    /// Events before today, not published.
    pub skipped_past: usize,
}

/// Runs Mode A against `calendar`.
///
/// # Errors
///
/// Returns the listing error when the destination cannot be listed; nothing
/// has been deleted at that point. Individual delete and insert failures are
/// counted in the report instead.
pub async fn sync_remote(
    calendar: &dyn RemoteCalendar,
    events: &[NormalizedEvent],
    since: NaiveDate,
    today: NaiveDate,
    categories: &CategoryMap,
) -> ProviderResult<RemoteSyncReport> {
    let remote = calendar.list_since(since).await?;
    let plan = plan_remote_sync(&remote, events, today, categories);
    info!(
        calendar = calendar.name(),
        fetched = plan.fetched,
        kept_past = plan.kept_past,
        to_delete = plan.delete.len(),
        to_insert = plan.insert.len(),
        "remote sync planned"
    );

    let mut report = RemoteSyncReport {
        fetched: plan.fetched,
        kept_past: plan.kept_past,
        skipped_past: plan.skipped_past,
        ..RemoteSyncReport::default()
    };

    for id in &plan.delete {
        match calendar.delete(id).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                warn!(calendar = calendar.name(), id, error = %e, "delete failed");
                report.delete_failed += 1;
            }
        }
    }

    for entry in &plan.insert {
        match calendar.insert(entry).await {
            Ok(id) => {
                debug!(id, summary = entry.summary, "inserted");
                report.inserted += 1;
            }
            Err(e) => {
                warn!(
                    calendar = calendar.name(),
                    summary = entry.summary,
                    error = %e,
                    "insert failed"
                );
                report.insert_failed += 1;
            }
        }
    }

    info!(
        calendar = calendar.name(),
        deleted = report.deleted,
        inserted = report.inserted,
        "remote sync finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use cike_core::{RawEventRecord, normalize_record};

    use crate::error::ProviderError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(title: &str, start: NaiveDate, source: SourceTag) -> NormalizedEvent {
        normalize_record(RawEventRecord::new(title, EventTime::from_date(start), source)).unwrap()
    }

    fn entry(id: &str, start: Option<NaiveDate>) -> RemoteEntry {
        RemoteEntry::new(id, id, start.map(EventTime::from_date))
    }

    /// In-memory calendar recording every call.
    #[derive(Default)]
    struct FakeCalendar {
        entries: Vec<RemoteEntry>,
        fail_list: bool,
        fail_delete: Vec<String>,
        fail_insert: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl RemoteCalendar for FakeCalendar {
        fn name(&self) -> &str {
            "fake"
        }

        fn list_since(&self, since: NaiveDate) -> BoxFuture<'_, ProviderResult<Vec<RemoteEntry>>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(format!("list {since}"));
                if self.fail_list {
                    return Err(ProviderError::network("unreachable").with_provider("fake"));
                }
                Ok(self.entries.clone())
            })
        }

        fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(format!("delete {id}"));
                if self.fail_delete.iter().any(|f| f == id) {
                    return Err(ProviderError::server("boom"));
                }
                Ok(())
            })
        }

        fn insert<'a>(&'a self, entry: &'a NewEntry) -> BoxFuture<'a, ProviderResult<String>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(format!("insert {}", entry.summary));
                if self.fail_insert.contains(&entry.summary) {
                    return Err(ProviderError::bad_request("rejected"));
                }
                Ok(format!("id-{}", entry.summary))
            })
        }
    }

    mod categories {
        use super::*;

        #[test]
        fn defaults() {
            let map = CategoryMap::default();
            assert_eq!(map.get(SourceTag::ItValley), 9);
            assert_eq!(map.get(SourceTag::AmCham), 5);
            assert_eq!(map.get(SourceTag::Sopk), 6);
            assert_eq!(map.get(SourceTag::Ickk), 3);
            assert_eq!(map.get(SourceTag::Other), 8);
        }

        #[test]
        fn overrides() {
            let map = CategoryMap::default().with_category(SourceTag::Sopk, 11);
            assert_eq!(map.get(SourceTag::Sopk), 11);
            assert_eq!(map.get(SourceTag::Ickk), 3);
        }
    }

    mod planning {
        use super::*;

        #[test]
        fn partitions_remote_entries() {
            let today = date(2025, 6, 1);
            let remote = [
                entry("old", Some(date(2025, 5, 31))),
                entry("today", Some(date(2025, 6, 1))),
                entry("later", Some(date(2025, 9, 1))),
                entry("unreadable", None),
            ];
            let plan = plan_remote_sync(&remote, &[], today, &CategoryMap::default());
            assert_eq!(plan.fetched, 4);
            assert_eq!(plan.kept_past, 2);
            assert_eq!(plan.delete, ["today", "later"]);
        }

        #[test]
        fn never_inserts_past_events() {
            let today = date(2025, 6, 1);
            let events = [
                event("Yesterday", date(2025, 5, 31), SourceTag::Sopk),
                event("Today", date(2025, 6, 1), SourceTag::Sopk),
                event("Fair", date(2025, 7, 1), SourceTag::Ickk),
            ];
            let plan = plan_remote_sync(&[], &events, today, &CategoryMap::default());
            assert_eq!(plan.skipped_past, 1);
            let summaries: Vec<_> = plan.insert.iter().map(|e| e.summary.as_str()).collect();
            assert_eq!(summaries, ["Today", "Fair"]);
            assert_eq!(plan.insert[1].category, 3);
            assert_eq!(plan.insert[1].source, SourceTag::Ickk);
            assert!(plan.insert[1].is_all_day());
        }
    }

    mod execution {
        use super::*;

        #[tokio::test]
        async fn replaces_future_window() {
            let today = date(2025, 6, 1);
            let calendar = FakeCalendar {
                entries: vec![
                    entry("past", Some(date(2025, 1, 1))),
                    entry("f1", Some(date(2025, 6, 10))),
                    entry("f2", Some(date(2025, 6, 20))),
                ],
                fail_delete: vec!["f2".to_string()],
                fail_insert: vec!["Broken".to_string()],
                ..FakeCalendar::default()
            };
            let events = [
                event("Summit", date(2025, 6, 15), SourceTag::Sopk),
                event("Broken", date(2025, 6, 16), SourceTag::Sopk),
                event("Gone", date(2025, 2, 1), SourceTag::AmCham),
            ];

            let report = sync_remote(
                &calendar,
                &events,
                date(2020, 1, 1),
                today,
                &CategoryMap::default(),
            )
            .await
            .unwrap();

            assert_eq!(
                report,
                RemoteSyncReport {
                    fetched: 3,
                    kept_past: 1,
                    deleted: 1,
                    delete_failed: 1,
                    inserted: 1,
                    insert_failed: 1,
                    skipped_past: 1,
                }
            );
            let calls = calendar.calls.lock().unwrap();
            assert_eq!(
                *calls,
                [
                    "list 2020-01-01",
                    "delete f1",
                    "delete f2",
                    "insert Summit",
                    "insert Broken",
                ]
            );
        }

        #[tokio::test]
        async fn listing_failure_is_fatal_before_deletes() {
            let calendar = FakeCalendar {
                entries: vec![entry("f1", Some(date(2025, 6, 10)))],
                fail_list: true,
                ..FakeCalendar::default()
            };
            let events = [event("Summit", date(2025, 6, 15), SourceTag::Sopk)];
            let result = sync_remote(
                &calendar,
                &events,
                date(2020, 1, 1),
                date(2025, 6, 1),
                &CategoryMap::default(),
            )
            .await;

            assert!(result.is_err());
            assert_eq!(*calendar.calls.lock().unwrap(), ["list 2020-01-01"]);
        }

        #[tokio::test]
        async fn repeated_runs_converge() {
            let today = date(2025, 6, 1);
            let events = [
                event("Summit", date(2025, 6, 15), SourceTag::Sopk),
                event("Meetup", date(2025, 7, 1), SourceTag::ItValley),
            ];
            let first = plan_remote_sync(&[], &events, today, &CategoryMap::default());
            let published: Vec<_> = first
                .insert
                .iter()
                .map(|e| RemoteEntry::new(format!("id-{}", e.summary), &e.summary, Some(e.start)))
                .collect();
            let second = plan_remote_sync(&published, &events, today, &CategoryMap::default());
            assert_eq!(second.delete, ["id-Summit", "id-Meetup"]);
            assert_eq!(second.insert, first.insert);
        }
    }
}
