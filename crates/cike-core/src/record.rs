//! Raw and normalized event records.
//!
//! Every source emits [`RawEventRecord`]s. [`normalize_record`] turns one
//! into an immutable [`NormalizedEvent`]:
//!
//! 1. Trims the title and rejects empty ones
//! 2. Defaults a missing end to the start
//! 3. Makes start and end the same kind: both dates when neither carries a
//!    time of day, otherwise both date-times
//! 4. Coerces an end before the start to the start

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::key::{CanonicalKey, StableId};
use crate::source::SourceTag;
use crate::time::EventTime;

/// An event as scraped, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEventRecord {
    /// Title as shown on the page, possibly decorated.
    pub title: String,
    /// Venue, may be empty.
    pub location: String,
    /// Free text, usually ending with the event URL.
    pub description: String,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends; `None` means the same as `start`.
    pub end: Option<EventTime>,
    /// Where the record came from.
    pub source: SourceTag,
}

impl RawEventRecord {
    /// Creates a record with empty location and description.
    pub fn new(title: impl Into<String>, start: EventTime, source: SourceTag) -> Self {
        Self {
            title: title.into(),
            location: String::new(),
            description: String::new(),
            start,
            end: None,
            source,
        }
    }

    /// Builder method to set the end.
    pub fn with_end(mut self, end: EventTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Why a raw record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The title is empty after trimming.
    #[error("event title is empty")]
    EmptyTitle,
}

/// A validated event. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedEvent {
    title: String,
    location: String,
    description: String,
    start: EventTime,
    end: EventTime,
    source: SourceTag,
}

impl NormalizedEvent {
    /// Title, trimmed.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Venue, may be empty.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Description, may be empty.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Start.
    pub fn start(&self) -> EventTime {
        self.start
    }

    /// End, never before the start.
    pub fn end(&self) -> EventTime {
        self.end
    }

    /// Source tag.
    pub fn source(&self) -> SourceTag {
        self.source
    }

    /// Returns `true` when neither start nor end has a time of day.
    pub fn is_all_day(&self) -> bool {
        matches!(self.start, EventTime::Date(_))
    }

    /// Deduplication key.
    pub fn canonical_key(&self) -> CanonicalKey {
        CanonicalKey::for_event(self)
    }

    /// External identifier, stable across runs.
    pub fn stable_id(&self) -> StableId {
        StableId::for_event(self)
    }
}

/// Normalizes one raw record.
pub fn normalize_record(raw: RawEventRecord) -> Result<NormalizedEvent, NormalizeError> {
    let title = raw.title.trim();
    if title.is_empty() {
        return Err(NormalizeError::EmptyTitle);
    }

    let end = raw.end.unwrap_or(raw.start);
    let (start, end) = if raw.start.is_all_day() && end.is_all_day() {
        (raw.start.to_date(), end.to_date())
    } else {
        (raw.start.to_datetime(), end.to_datetime())
    };
    let end = if end < start {
        debug!(title, %start, %end, "end before start, coercing to start");
        start
    } else {
        end
    };

    Ok(NormalizedEvent {
        title: title.to_string(),
        location: raw.location.trim().to_string(),
        description: raw.description.trim().to_string(),
        start,
        end,
        source: raw.source,
    })
}

/// Result of normalizing a batch.
#[derive(Debug, Default)]
pub struct Normalized {
    /// Accepted events, in input order.
    pub events: Vec<NormalizedEvent>,
    /// Number of rejected records.
    pub dropped: usize,
}

/// Normalizes a batch, dropping rejected records.
pub fn normalize_records(raws: impl IntoIterator<Item = RawEventRecord>) -> Normalized {
    let mut result = Normalized::default();
    for raw in raws {
        let source = raw.source;
        match normalize_record(raw) {
            Ok(event) => result.events.push(event),
            Err(e) => {
                debug!(%source, error = %e, "dropping record");
                result.dropped += 1;
            }
        }
    }
    result
}
