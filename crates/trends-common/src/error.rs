//! Error types for the music trends pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, TrendsError>;

/// Main error type for the pipeline
///
/// The first three variants are the run-level taxonomy: acquisition failures
/// abort a run, store failures abort acquisition or fail a single family load.
#[derive(Error, Debug)]
pub enum TrendsError {
    /// Network/transport failure, timeout or unexpected response shape
    #[error("Source unavailable: {source_name}: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    /// Catalogue credential exchange did not produce a usable token
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Persisted store query, schema setup or append failed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Staging error: {0}")]
    Staging(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrendsError {
    /// Create a source unavailable error
    pub fn source_unavailable(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn authentication_failed(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed(msg.into())
    }

    /// Create a store error
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a staging error
    pub fn staging(msg: impl Into<String>) -> Self {
        Self::Staging(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short machine-friendly name of the error class, used in run reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Staging(_) | Self::Io(_) => "staging",
            Self::Config(_) => "config",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_source_unavailable_message() {
        let err = TrendsError::source_unavailable("billboard", "HTTP 503");
        assert_eq!(err.to_string(), "Source unavailable: billboard: HTTP 503");
        assert_eq!(err.kind(), "source_unavailable");
    }

    #[test]
    fn test_io_errors_are_staging_class() {
        let err: TrendsError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert_eq!(err.kind(), "staging");
    }
}
