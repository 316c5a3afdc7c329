//! Error types for the grading engine
//!
//! This module provides the crate-wide error taxonomy using thiserror for
//! structured error definitions and anyhow for error propagation at the
//! binary boundary.

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for grading and adaptation operations
#[derive(Error, Debug)]
pub enum GradingError {
    /// Source text is not valid for the declared language
    #[error("Parse failure at line {line}, column {column}: {message}")]
    ParseFailure {
        line: usize,
        column: usize,
        message: String,
    },

    /// Language tag has no syntax model builder
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Requested dimension has no registered grader
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    /// A grader is already registered for this dimension
    #[error("Grader already registered for dimension: {0}")]
    DuplicateGrader(String),

    /// Feedback references a grading id that cannot be resolved
    #[error("Stale feedback: grading {0} cannot be resolved")]
    StaleFeedback(String),

    /// Feedback record is malformed (rating out of range, wrong user)
    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),

    /// Concurrent strategy mutation detected
    #[error("Strategy conflict for {0}")]
    StrategyConflict(String),

    /// Conflicts persisted beyond the retry budget
    #[error("Adaptation unavailable: {0}")]
    AdaptationUnavailable(String),

    /// Collaborator timed out or is unreachable
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Strategy violates its weight/threshold invariants
    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for grading operations
pub type Result<T> = std::result::Result<T, GradingError>;

/// Convert anyhow::Error to GradingError
impl From<anyhow::Error> for GradingError {
    fn from(err: anyhow::Error) -> Self {
        GradingError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GradingError::StaleFeedback("abc".to_string());
        assert_eq!(err.to_string(), "Stale feedback: grading abc cannot be resolved");

        let err = GradingError::ParseFailure {
            line: 3,
            column: 7,
            message: "unexpected token".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Parse failure at line 3, column 7: unexpected token"
        );
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json");
        let err: GradingError = json_err.unwrap_err().into();
        assert!(matches!(err, GradingError::Serialization(_)));

        let err: GradingError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, GradingError::Other(ref m) if m == "boom"));
    }
}
