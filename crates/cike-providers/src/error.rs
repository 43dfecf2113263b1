//! Error types for sources and calendar destinations.
//!
//! Every network or file operation in this crate reports a [`ProviderError`].
//! The [`ProviderErrorCode`] drives retry decisions in the fetcher and the
//! fatal/non-fatal split in the sync engines.

use serde::Serialize;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    /// The access token was rejected (401).
    AuthenticationFailed,
    /// The token lacks access to the calendar (403).
    AuthorizationFailed,
    /// Connection failure, timeout or an interrupted body.
    NetworkError,
    /// 429 from the site or the calendar API.
    RateLimited,
    /// 5xx status.
    ServerError,
    /// A body that could not be decoded: JSON, iCalendar, renderer output.
    InvalidResponse,
    /// 404.
    NotFound,
    /// Any other 4xx status.
    BadRequest,
    /// Settings rejected before any request was made.
    ConfigurationError,
    /// The destination refused an entry it accepted the request for.
    CalendarError,
    /// Reading or writing a calendar file, spawning a renderer.
    IoError,
    InternalError,
}

impl ProviderErrorCode {
    /// Transient failures, worth another attempt after the retry delay.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Stable snake_case name, used in logs and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::CalendarError => "calendar_error",
            Self::IoError => "io_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed fetch, render, file operation or destination request.
///
/// `provider` names where it happened: a source tag such as `SOPK`, or a
/// destination such as `google`.
#[derive(Debug, Error)]
#[error("{}{code}: {message}", label(.provider))]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

fn label(provider: &Option<String>) -> String {
    provider
        .as_deref()
        .map(|p| format!("[{p}] "))
        .unwrap_or_default()
}

macro_rules! constructors {
    ($($(#[$doc:meta])* $name:ident => $code:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ProviderErrorCode::$code, message)
            }
        )*
    };
}

impl ProviderError {
    /// Creates an error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    constructors! {
        authentication => AuthenticationFailed;
        authorization => AuthorizationFailed;
        /// Transport failure; retried.
        network => NetworkError;
        /// Retried.
        rate_limited => RateLimited;
        /// Retried.
        server => ServerError;
        invalid_response => InvalidResponse;
        not_found => NotFound;
        bad_request => BadRequest;
        configuration => ConfigurationError;
        calendar => CalendarError;
        io => IoError;
        internal => InternalError;
    }

    /// Names the source or destination the error belongs to.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// See [`ProviderErrorCode::is_retryable`].
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
