//! Custom error types for scholarif.
//!
//! Internal stages (a single CrossRef attempt, dataset loading, HTML parsing) return
//! `Result<T, ScholarIfError>`. The resolution boundary itself never surfaces these:
//! the resolver, scheduler and engine log them and degrade to "no result".

use thiserror::Error;

/// Main error type for scholarif operations.
#[derive(Debug, Error)]
pub enum ScholarIfError {
    /// Network/HTTP transport error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request exceeded the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// External API returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message
        message: String,
    },

    /// HTML parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Dataset content could not be used
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

impl ScholarIfError {
    /// Whether a failed metadata attempt is worth repeating.
    ///
    /// Transport, timeout and HTTP status failures are; a body we could read but
    /// not understand is not going to change on the next try.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScholarIfError::Network(_) | ScholarIfError::Timeout(_) | ScholarIfError::Api { .. }
        )
    }
}

/// Result type alias using `ScholarIfError`
pub type Result<T> = std::result::Result<T, ScholarIfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ScholarIfError::Timeout(10).is_retryable());
        assert!(ScholarIfError::Api {
            code: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(!ScholarIfError::Parse("bad".to_string()).is_retryable());
        assert!(!ScholarIfError::Dataset("bad".to_string()).is_retryable());
    }
}
