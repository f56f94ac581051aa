//! Error types for mosaic operations.
//!
//! Errors split into two families with different propagation rules:
//! source-scoped failures (fetch, validation, timeout) are caught per-source
//! during a fusion and never fail the overall call, while configuration
//! errors (unknown strategy names, empty selection) are returned immediately.

use thiserror::Error;

/// Result type alias for mosaic operations.
pub type MosaicResult<T> = Result<T, MosaicError>;

/// Main error type for all mosaic operations.
#[derive(Error, Debug)]
pub enum MosaicError {
    /// No source registered under the given id.
    #[error("Source not found: {id}")]
    SourceNotFound { id: String },

    /// The injected fetch capability does not handle this source type.
    #[error("Unsupported source type: {source_type}")]
    UnsupportedSourceType { source_type: String },

    /// A source's validator pipeline rejected its payload (source-scoped).
    #[error("Validation failed for source '{source_id}': {message}")]
    ValidationFailed { source_id: String, message: String },

    /// A source fetch failed (source-scoped).
    #[error("Fetch failed for source '{source_id}': {message}")]
    FetchFailed { source_id: String, message: String },

    /// A source fetch exceeded its timeout (source-scoped).
    #[error("Source '{source_id}' timed out after {timeout_ms}ms")]
    Timeout { source_id: String, timeout_ms: u64 },

    /// The request named a conflict-resolution strategy that does not exist.
    #[error("Unknown conflict resolution strategy: {name}")]
    UnknownResolutionStrategy { name: String },

    /// The request named a synthesis strategy that does not exist.
    #[error("Unknown synthesis strategy: {name}")]
    UnknownSynthesisStrategy { name: String },

    /// Selection produced no usable sources for the request.
    #[error("No suitable sources available for request")]
    NoSuitableSources,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MosaicError {
    /// Create a source-not-found error.
    pub fn source_not_found(id: impl Into<String>) -> Self {
        Self::SourceNotFound { id: id.into() }
    }

    /// Create a validation error scoped to one source.
    pub fn validation(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create a fetch error scoped to one source.
    pub fn fetch(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Stable kind string, used as the key for per-error-kind metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } => "source_not_found",
            Self::UnsupportedSourceType { .. } => "unsupported_source_type",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::Timeout { .. } => "timeout",
            Self::UnknownResolutionStrategy { .. } => "unknown_resolution_strategy",
            Self::UnknownSynthesisStrategy { .. } => "unknown_synthesis_strategy",
            Self::NoSuitableSources => "no_suitable_sources",
            Self::Configuration(_) => "configuration",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this error is scoped to a single source fetch and therefore
    /// tolerated within a fusion rather than failing it.
    pub fn is_source_scoped(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed { .. }
                | Self::FetchFailed { .. }
                | Self::Timeout { .. }
                | Self::UnsupportedSourceType { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_is_source_scoped() {
        let err = MosaicError::validation("src-1", "missing field");
        assert!(err.is_source_scoped());
        assert_eq!(err.kind(), "validation_failed");
        assert!(err.to_string().contains("src-1"));
    }

    #[test]
    fn test_strategy_errors_are_fatal() {
        let err = MosaicError::UnknownResolutionStrategy {
            name: "bogus".to_string(),
        };
        assert!(!err.is_source_scoped());
        assert_eq!(err.kind(), "unknown_resolution_strategy");
    }
}
