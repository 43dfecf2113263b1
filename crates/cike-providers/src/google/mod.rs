//! Google Calendar destination.
//!
//! [`GoogleCalendar`] implements [`RemoteCalendar`](crate::sync::RemoteCalendar)
//! over the Calendar API v3 with a bearer access token. Acquiring and
//! refreshing the token happens outside this crate; the token is resolved
//! from configuration on every run.
//!
//! # Example
//!
//! ```ignore
//! use cike_providers::google::{GoogleCalendar, GoogleConfig};
//! use cike_providers::sync::{CategoryMap, sync_remote};
//!
//! let config = GoogleConfig::new("primary", token).with_since(since);
//! let calendar = GoogleCalendar::new(config)?;
//! let report = sync_remote(&calendar, &events, since, today, &CategoryMap::default()).await?;
//! ```

mod calendar;
mod client;
mod config;

pub use calendar::{GoogleCalendar, SOURCE_PROPERTY};
pub use client::{ApiEvent, ApiEventTime, EventBody, ExtendedProperties, GoogleCalendarClient};
pub use config::GoogleConfig;
