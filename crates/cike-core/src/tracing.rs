//! Tracing setup shared by the cike crates.
//!
//! ```ignore
//! use cike_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::scheduled())?;
//! ```
//!
//! Logs always go to stderr; stdout is reserved for command output such as
//! `cike scrape --json`. Unattended runs (cron, systemd timers) should use
//! [`TracingConfig::scheduled`] for JSON lines.

use thiserror::Error;
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    prelude::*,
    registry::LookupSpan,
};

/// Targets covered by the default filter.
const CRATE_TARGETS: [&str; 4] = ["cike", "cike_core", "cike_providers", "cike_client"];

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, for reading a single run
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// JSON lines, for log collectors
    Json,
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level of the cike crates when `RUST_LOG` is not set
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// File and line of each event
    pub include_location: bool,
    /// Module path of each event
    pub include_target: bool,
    pub include_timestamp: bool,
    /// Span enter/close events
    pub include_span_events: bool,
    /// Filter directive used instead of `RUST_LOG` and `default_level`
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Pretty,
            include_location: false,
            include_target: true,
            include_timestamp: true,
            include_span_events: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Interactive debugging: every cike event, compact, without timestamps.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            output_format: TracingOutputFormat::Compact,
            include_location: true,
            include_timestamp: false,
            ..Self::default()
        }
    }

    /// Runs started by a scheduler: JSON lines with timestamps and locations.
    #[must_use]
    pub fn scheduled() -> Self {
        Self {
            output_format: TracingOutputFormat::Json,
            include_location: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// The filter this configuration installs.
    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match &self.env_filter {
            Some(filter) => Ok(EnvFilter::try_new(filter)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(self.default_level)))),
        }
    }

    /// The formatting layer, writing to stderr.
    fn layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    {
        let span_events = if self.include_span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_target(self.include_target)
            .with_span_events(span_events);

        match (self.output_format, self.include_timestamp) {
            (TracingOutputFormat::Pretty, true) => base.pretty().boxed(),
            (TracingOutputFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (TracingOutputFormat::Compact, true) => base.compact().boxed(),
            (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
            (TracingOutputFormat::Json, true) => base.json().boxed(),
            (TracingOutputFormat::Json, false) => base.json().without_time().boxed(),
        }
    }
}

/// Filter directive enabling `level` for every cike crate.
pub fn default_directive(level: Level) -> String {
    CRATE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides `default_level` unless an explicit filter is set.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set or if
/// the filter directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let subscriber = tracing_subscriber::registry()
        .with(config.filter()?)
        .with(config.layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
