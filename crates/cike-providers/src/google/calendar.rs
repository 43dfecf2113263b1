//! [`RemoteCalendar`] implementation for Google Calendar.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use cike_core::EventTime;
use tracing::{debug, warn};

use crate::BoxFuture;
use crate::error::{ProviderError, ProviderResult};
use crate::sync::{NewEntry, RemoteCalendar, RemoteEntry};

use super::client::{ApiEvent, ApiEventTime, EventBody, ExtendedProperties, GoogleCalendarClient};
use super::config::GoogleConfig;

/// Private extended property holding the source tag.
pub const SOURCE_PROPERTY: &str = "source";

/// Google Calendar destination.
#[derive(Debug)]
pub struct GoogleCalendar {
    config: GoogleConfig,
    display_name: String,
    client: GoogleCalendarClient,
}

impl GoogleCalendar {
    /// Creates the destination.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config
            .validate()
            .map_err(|e| ProviderError::configuration(e).with_provider("google"))?;
        let client = GoogleCalendarClient::new(&config.access_token, config.timeout)?
            .with_retry(config.retry);
        Ok(Self {
            display_name: format!("google:{}", config.calendar_id),
            config,
            client,
        })
    }
}

impl RemoteCalendar for GoogleCalendar {
    fn name(&self) -> &str {
        &self.display_name
    }

    fn list_since(&self, since: NaiveDate) -> BoxFuture<'_, ProviderResult<Vec<RemoteEntry>>> {
        Box::pin(async move {
            let tz = self.config.timezone;
            let floor = EventTime::from_date(since).localize(&tz).to_utc();
            let events = self
                .client
                .list_events(&self.config.calendar_id, floor, self.config.max_results)
                .await?;
            let entries: Vec<RemoteEntry> = events
                .into_iter()
                .filter_map(|event| remote_entry(event, &tz))
                .collect();
            debug!(calendar = %self.display_name, entries = entries.len(), "listed");
            Ok(entries)
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.client.delete_event(&self.config.calendar_id, id).await })
    }

    fn insert<'a>(&'a self, entry: &'a NewEntry) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            let body = event_body(entry, &self.config.timezone);
            let created = self
                .client
                .insert_event(&self.config.calendar_id, &body)
                .await?;
            created.id.ok_or_else(|| {
                ProviderError::invalid_response("created event has no id").with_provider("google")
            })
        })
    }
}

/// Converts a listed event; events without an id cannot be managed and are
/// left out.
fn remote_entry(event: ApiEvent, tz: &Tz) -> Option<RemoteEntry> {
    let Some(id) = event.id else {
        warn!("listed event without id");
        return None;
    };
    let start = parse_start(&event.start, tz);
    if start.is_none() {
        debug!(id, "unreadable start, treated as past");
    }
    Some(RemoteEntry::new(id, event.summary.unwrap_or_default(), start))
}

/// Start of a listed event as wall-clock time in `tz`.
fn parse_start(time: &ApiEventTime, tz: &Tz) -> Option<EventTime> {
    if let Some(dt) = &time.date_time {
        let parsed = DateTime::parse_from_rfc3339(dt).ok()?;
        return Some(EventTime::from_datetime(
            parsed.with_timezone(tz).naive_local(),
        ));
    }
    let date = time.date.as_deref()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(EventTime::from_date)
}

/// Request body for `entry`.
///
/// All-day ends are sent exclusive, one day past the inclusive end.
fn event_body(entry: &NewEntry, tz: &Tz) -> EventBody {
    let zone = Some(tz.name().to_string());
    let (start, end) = if entry.is_all_day() {
        let end = entry.end.date().succ_opt().unwrap_or(entry.end.date());
        (
            ApiEventTime {
                date: Some(entry.start.date().format("%Y-%m-%d").to_string()),
                time_zone: zone.clone(),
                ..ApiEventTime::default()
            },
            ApiEventTime {
                date: Some(end.format("%Y-%m-%d").to_string()),
                time_zone: zone,
                ..ApiEventTime::default()
            },
        )
    } else {
        (
            ApiEventTime {
                date_time: Some(entry.start.localize(tz).to_rfc3339()),
                time_zone: zone.clone(),
                ..ApiEventTime::default()
            },
            ApiEventTime {
                date_time: Some(entry.end.localize(tz).to_rfc3339()),
                time_zone: zone,
                ..ApiEventTime::default()
            },
        )
    };

    EventBody {
        summary: entry.summary.clone(),
        description: entry.description.clone(),
        location: entry.location.clone(),
        start,
        end,
        color_id: entry.category.to_string(),
        extended_properties: ExtendedProperties {
            private: BTreeMap::from([(
                SOURCE_PROPERTY.to_string(),
                entry.source.as_str().to_string(),
            )]),
        },
    }
}
