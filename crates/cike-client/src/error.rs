//! Client error types.

use std::fmt;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end a run.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Provider error, such as an unreachable destination.
    Provider(cike_providers::ProviderError),
    /// IO error.
    Io(std::io::Error),
    /// Logging could not be set up.
    Tracing(cike_core::TracingError),
    /// Output could not be rendered.
    Output(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(err) => write!(f, "provider error: {}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Tracing(err) => write!(f, "logging error: {}", err),
            Self::Output(msg) => write!(f, "output error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Tracing(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<cike_providers::ProviderError> for ClientError {
    fn from(err: cike_providers::ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl From<cike_core::TracingError> for ClientError {
    fn from(err: cike_core::TracingError) -> Self {
        Self::Tracing(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cike_providers::ProviderErrorCode;

    #[test]
    fn provider_errors_keep_their_code() {
        let err: ClientError = cike_providers::ProviderError::network("connection refused").into();
        match &err {
            ClientError::Provider(inner) => assert_eq!(inner.code(), ProviderErrorCode::NetworkError),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("provider error:"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn config_error_display() {
        let err = ClientError::Config("unknown source `FOO`".to_string());
        assert_eq!(err.to_string(), "configuration error: unknown source `FOO`");
    }
}
