//! HTTP fetching with bounded retries.
//!
//! [`HttpFetcher`] wraps a `reqwest` client configured per source (timeout,
//! user agent, TLS leniency) and retries transient failures with a fixed
//! delay according to its [`RetryPolicy`].

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; CikeCalendar/0.1)";

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never below 1.
    pub attempts: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// attempts run out. The last error is returned.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(what, attempt, attempts, error = %e, "retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Settings for an [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// Accept invalid TLS certificates.
    pub allow_insecure_tls: bool,
    /// Retry policy for each request.
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allow_insecure_tls: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchConfig {
    /// Builder method to allow invalid TLS certificates.
    pub fn with_insecure_tls(mut self, allow: bool) -> Self {
        self.allow_insecure_tls = allow;
        self
    }
}

/// Page fetcher shared by the HTML sources.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    /// Builds a fetcher.
    pub fn new(config: &FetchConfig) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.allow_insecure_tls)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;
        Ok(Self {
            client,
            retry: config.retry,
        })
    }

    /// Fetches `url` as text, retrying transient failures.
    pub async fn get_text(&self, url: &str) -> ProviderResult<String> {
        self.retry.run(url, || self.get_once(url)).await
    }

    async fn get_once(&self, url: &str) -> ProviderResult<String> {
        debug!(url, "GET");
        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))
    }
}

/// Maps a transport failure to a network error.
pub(crate) fn request_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    };
    ProviderError::network(message).with_source(e)
}

/// Maps a non-success HTTP status to the error taxonomy.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let body = body.trim();
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        let snippet: String = body.chars().take(200).collect();
        format!("{}: {}", status, snippet)
    };
    match status {
        reqwest::StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::rate_limited(format!("rate limit exceeded ({})", detail))
        }
        reqwest::StatusCode::UNAUTHORIZED => {
            ProviderError::authentication(format!("access token expired or invalid ({})", detail))
        }
        reqwest::StatusCode::FORBIDDEN => {
            ProviderError::authorization(format!("access denied ({})", detail))
        }
        reqwest::StatusCode::NOT_FOUND => ProviderError::not_found(detail),
        s if s.is_server_error() => ProviderError::server(format!("server error ({})", detail)),
        s if s.is_client_error() => ProviderError::bad_request(detail),
        _ => ProviderError::invalid_response(format!("unexpected status ({})", detail)),
    }
}
