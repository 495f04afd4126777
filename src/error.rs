//! Error types for OGS Insight
//!
//! Uses thiserror for structured error definitions. The first five variants
//! are the failure kinds of the ingestion pipeline; the rest are ambient
//! (configuration, I/O, serialization).

use crate::types::GameId;
use std::time::Duration;
use thiserror::Error;

/// Main error type for OGS Insight operations
#[derive(Error, Debug)]
pub enum InsightError {
    /// Non-2xx response or transport/channel failure
    #[error("Network failure: {message}")]
    NetworkFailure {
        /// HTTP status when the server answered at all
        status: Option<u16>,
        message: String,
    },

    /// Explicit throttling signal (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The game has no AI review. Callers skip the game silently.
    #[error("No AI review available for game {0}")]
    NoReviewAvailable(GameId),

    /// Review channel did not deliver metadata in time
    #[error("AI review timed out after {0:?}")]
    Timeout(Duration),

    /// Unexpected payload shape from an upstream service
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Player reference could not be parsed
    #[error("Invalid player reference: {0}")]
    InvalidPlayer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

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

impl InsightError {
    /// Build a network failure from a message without an HTTP status
    pub fn network(message: impl Into<String>) -> Self {
        InsightError::NetworkFailure {
            status: None,
            message: message.into(),
        }
    }

    /// Whether a directory or review-list request should be retried
    ///
    /// Throttling is always retried. Transport failures and 5xx responses are
    /// retried; 4xx answers will not change on a second attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            InsightError::RateLimited(_) => true,
            InsightError::NetworkFailure { status: None, .. } => true,
            InsightError::NetworkFailure {
                status: Some(code),
                ..
            } => *code >= 500,
            _ => false,
        }
    }
}

/// Result type alias for OGS Insight operations
pub type Result<T> = std::result::Result<T, InsightError>;

/// Convert anyhow::Error to InsightError
impl From<anyhow::Error> for InsightError {
    fn from(err: anyhow::Error) -> Self {
        InsightError::Other(err.to_string())
    }
}
