//! Google Calendar destination configuration.

use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::http::RetryPolicy;

/// Configuration for the Google Calendar destination.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Calendar identifier, e.g. `primary` or `xyz@group.calendar.google.com`.
    pub calendar_id: String,

    /// OAuth bearer token with write access to the calendar.
    pub access_token: String,

    /// Historical floor for listing existing entries.
    pub since: NaiveDate,

    /// Time zone events are published in.
    pub timezone: Tz,

    /// Request timeout.
    pub timeout: Duration,

    /// Page size of the listing.
    pub max_results: usize,

    /// Retry policy of listing and deletion. Insertion is never retried.
    pub retry: RetryPolicy,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Largest page size the API accepts.
    pub const DEFAULT_MAX_RESULTS: usize = 2500;

    /// Creates a configuration for `calendar_id` authenticated by `access_token`.
    pub fn new(calendar_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            access_token: access_token.into(),
            since: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            timezone: chrono_tz::Europe::Bratislava,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            max_results: Self::DEFAULT_MAX_RESULTS,
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the listing floor.
    pub fn with_since(mut self, since: NaiveDate) -> Self {
        self.since = since;
        self
    }

    /// Sets the publishing time zone.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the listing page size.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Sets the retry policy of idempotent requests.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.calendar_id.trim().is_empty() {
            return Err("calendar_id is required".to_string());
        }
        if self.access_token.trim().is_empty() {
            return Err("access_token is required".to_string());
        }
        if !(1..=Self::DEFAULT_MAX_RESULTS).contains(&self.max_results) {
            return Err(format!(
                "max_results must be between 1 and {}",
                Self::DEFAULT_MAX_RESULTS
            ));
        }
        Ok(())
    }
}
