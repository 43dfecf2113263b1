//! Cross-source deduplication.
//!
//! The [`Aggregator`] keeps the first event seen for each
//! [`CanonicalKey`] and discards later ones, preserving arrival order.
//! Feed it sources in [`SourceTag::INVOCATION_ORDER`](crate::SourceTag::INVOCATION_ORDER)
//! to make the earlier source win.

use std::collections::HashSet;

use tracing::trace;

use crate::key::CanonicalKey;
use crate::record::NormalizedEvent;

/// First-seen-wins event set.
#[derive(Debug, Default)]
pub struct Aggregator {
    seen: HashSet<CanonicalKey>,
    events: Vec<NormalizedEvent>,
    duplicates: usize,
}

impl Aggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event. Returns `false` when its key was already present.
    pub fn push(&mut self, event: NormalizedEvent) -> bool {
        let key = event.canonical_key();
        if self.seen.contains(&key) {
            trace!(%key, source = %event.source(), "duplicate event");
            self.duplicates += 1;
            return false;
        }
        self.seen.insert(key);
        self.events.push(event);
        true
    }

    /// Adds every event, returning how many were new.
    pub fn extend(&mut self, events: impl IntoIterator<Item = NormalizedEvent>) -> usize {
        let mut added = 0;
        for event in events {
            if self.push(event) {
                added += 1;
            }
        }
        added
    }

    /// Returns `true` if an event with this key was accepted.
    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.seen.contains(key)
    }

    /// Number of accepted events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing was accepted.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of rejected duplicates.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Accepted events in arrival order.
    pub fn events(&self) -> &[NormalizedEvent] {
        &self.events
    }

    /// Consumes the aggregator, returning accepted events in arrival order.
    pub fn into_events(self) -> Vec<NormalizedEvent> {
        self.events
    }
}

/// Deduplicates a sequence in one go.
pub fn dedupe(events: impl IntoIterator<Item = NormalizedEvent>) -> Vec<NormalizedEvent> {
    let mut aggregator = Aggregator::new();
    aggregator.extend(events);
    aggregator.into_events()
}
