//! Google Calendar API client.
//!
//! Low-level HTTP access to the events collection of one calendar: paginated
//! listing, deletion and insertion. Idempotent requests are retried with the
//! configured [`RetryPolicy`].

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{RetryPolicy, request_error, status_error};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GoogleCalendarClient {
    /// Creates a client authenticated with `access_token`.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_provider("google")
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
            base_url: CALENDAR_API_BASE.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Builder method to set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    /// Lists every event starting at or after `time_min`, following page
    /// tokens until the last page.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        max_results: usize,
    ) -> ProviderResult<Vec<ApiEvent>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = page_token.as_deref();
            let page = self
                .retry
                .run("google list", || {
                    self.list_events_page(calendar_id, time_min, max_results, token)
                })
                .await?;

            all_events.extend(
                page.items
                    .into_iter()
                    .filter(|event| event.status.as_deref() != Some("cancelled")),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("fetched {} events from calendar {}", all_events.len(), calendar_id);
        Ok(all_events)
    }

    /// Fetches a single page of events.
    async fn list_events_page(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        max_results: usize,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let mut request = self
            .http_client
            .get(self.events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", max_results.to_string()),
            ]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body).with_provider("google"));
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e))
        })?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
                .with_provider("google")
        })
    }

    /// Deletes one event. An event that is already gone counts as deleted.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> ProviderResult<()> {
        let url = format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        );
        self.retry
            .run("google delete", || self.delete_once(&url))
            .await
    }

    async fn delete_once(&self, url: &str) -> ProviderResult<()> {
        let response = self
            .http_client
            .delete(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::GONE {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body).with_provider("google"))
    }

    /// Creates one event and returns it as stored.
    ///
    /// Not retried: a timed-out insert may still have been applied.
    pub async fn insert_event(&self, calendar_id: &str, body: &EventBody) -> ProviderResult<ApiEvent> {
        let response = self
            .http_client
            .post(self.events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body).with_provider("google"));
        }

        response.json().await.map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse created event: {}", e))
                .with_provider("google")
        })
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub start: ApiEventTime,
    pub extended_properties: Option<ExtendedProperties>,
}

/// Event time as used by the API in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Application-defined key/value pairs attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedProperties {
    #[serde(default)]
    pub private: BTreeMap<String, String>,
}

/// Request body of events.insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: ApiEventTime,
    pub end: ApiEventTime,
    pub color_id: String,
    pub extended_properties: ExtendedProperties,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_event_list_response() {
        let json = r#"{
            "items": [
                {
                    "id": "event1",
                    "summary": "Test Meeting",
                    "start": {
                        "dateTime": "2024-03-15T10:00:00+01:00",
                        "timeZone": "Europe/Bratislava"
                    },
                    "end": {
                        "dateTime": "2024-03-15T11:00:00+01:00"
                    },
                    "status": "confirmed",
                    "extendedProperties": {"private": {"source": "SOPK"}}
                }
            ],
            "nextPageToken": "abc"
        }"#;

        let response: EventListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].summary, Some("Test Meeting".to_string()));
        assert_eq!(response.next_page_token.as_deref(), Some("abc"));
        let props = response.items[0].extended_properties.as_ref().unwrap();
        assert_eq!(props.private.get("source").map(String::as_str), Some("SOPK"));
    }

    #[test]
    fn parse_all_day_event() {
        let json = r#"{
            "id": "event1",
            "summary": "All Day Event",
            "start": {
                "date": "2024-03-15"
            },
            "end": {
                "date": "2024-03-16"
            }
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.start.date, Some("2024-03-15".to_string()));
        assert!(event.start.date_time.is_none());
    }

    #[test]
    fn parse_event_without_start() {
        let event: ApiEvent = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert_eq!(event.start, ApiEventTime::default());
    }

    #[test]
    fn serialize_event_body() {
        let body = EventBody {
            summary: "Summit".to_string(),
            description: String::new(),
            location: "Košice".to_string(),
            start: ApiEventTime {
                date: Some("2025-03-10".to_string()),
                time_zone: Some("Europe/Bratislava".to_string()),
                ..ApiEventTime::default()
            },
            end: ApiEventTime {
                date: Some("2025-03-11".to_string()),
                time_zone: Some("Europe/Bratislava".to_string()),
                ..ApiEventTime::default()
            },
            color_id: "6".to_string(),
            extended_properties: ExtendedProperties {
                private: BTreeMap::from([("source".to_string(), "SOPK".to_string())]),
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "summary": "Summit",
                "description": "",
                "location": "Košice",
                "start": {"date": "2025-03-10", "timeZone": "Europe/Bratislava"},
                "end": {"date": "2025-03-11", "timeZone": "Europe/Bratislava"},
                "colorId": "6",
                "extendedProperties": {"private": {"source": "SOPK"}}
            })
        );
    }

    #[test]
    fn events_url_encodes_calendar_id() {
        let client = GoogleCalendarClient::new("token", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.events_url("team@group.calendar.google.com"),
            "https://www.googleapis.com/calendar/v3/calendars/team%40group.calendar.google.com/events"
        );
    }
}
