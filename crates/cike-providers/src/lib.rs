//! Event sources, calendar destinations and sync engines.
//!
//! - [`sources`] - The four site scrapers behind the [`EventSource`] contract
//! - [`http`] - Retrying page fetcher shared by the scrapers
//! - [`sync`] - Mode A ([`sync_remote`]) and Mode B ([`export_to_file`])
//! - [`ics`] - iCalendar codec used by Mode B and `cike inspect`
//! - [`google`] - Google Calendar implementation of [`RemoteCalendar`]
//! - [`ProviderError`] - Error types for all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐ ┌────────┐ ┌──────┐ ┌──────┐
//! │ ITVALLEY │ │ AMCHAM │ │ SOPK │ │ ICKK │
//! └────┬─────┘ └───┬────┘ └──┬───┘ └──┬───┘
//!      └───────────┴────┬────┴────────┘
//!                       │  EventSource::scrape
//!                       ▼
//!              ┌─────────────────┐
//!              │ RawEventRecord  │
//!              └────────┬────────┘
//!                       ▼ normalize + aggregate (cike-core)
//!              ┌─────────────────┐
//!              │ NormalizedEvent │
//!              └───┬─────────┬───┘
//!                  ▼         ▼
//!          sync_remote   export_to_file
//!       (RemoteCalendar)   (.ics file)
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod http;
pub mod ics;
pub mod sources;
pub mod sync;

/// A boxed future for async trait methods.
///
/// Keeps [`EventSource`], [`PageFeed`] and [`RemoteCalendar`] object-safe so
/// the client can hold sources and destinations as trait objects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use http::{FetchConfig, HttpFetcher, RetryPolicy};
pub use ics::{IcsEntry, read_calendar, read_calendar_file, render_calendar};
pub use sources::{
    AmChamSource, EventSource, IckkSource, ItValleySource, PageFeed, ScrapeContext,
    ScrapeOutcome, SopkSource, SourceStatus,
};
pub use sync::{
    CategoryMap, ExportReport, RemoteCalendar, RemoteSyncReport, export_to_file, sync_remote,
};
