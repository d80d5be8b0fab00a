//! Error types for posint-ai
//!
//! Classifier failures are recovered inside the consensus engine and never
//! reach the caller of `parse_tweet`. Geo errors surface only for hard
//! failures (strict-mode no-match, missing index, unreadable dataset).

use thiserror::Error;

/// A classifier layer could not produce output
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Network communication error (connect, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Provider answered with an error status
    #[error("API error: {0}")]
    Api(String),

    /// Response could not be parsed as the expected structure
    #[error("Parse error: {0}")]
    Parse(String),

    /// Layer not configured or not reachable
    #[error("Classifier not available: {0}")]
    NotAvailable(String),
}

impl From<reqwest::Error> for ClassifierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClassifierError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ClassifierError::Api(format!("{}: {}", status, err))
        } else {
            ClassifierError::Network(err.to_string())
        }
    }
}

/// Geographic resolution error
#[derive(Debug, Error)]
pub enum GeoError {
    /// No candidate hierarchy found (strict mode only)
    #[error("No geographic match for '{0}'")]
    NoMatch(String),

    /// Resolution attempted before `initialize()` or after `cleanup()`
    #[error("Geo index not initialized")]
    NotInitialized,

    /// Dataset or overlay file could not be read or parsed
    #[error("Geo dataset error: {0}")]
    Dataset(String),
}

impl From<GeoError> for posint_common::Error {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::Dataset(msg) => posint_common::Error::Parse(msg),
            other => posint_common::Error::InvalidInput(other.to_string()),
        }
    }
}

/// Result type for geo operations
pub type GeoResult<T> = Result<T, GeoError>;
