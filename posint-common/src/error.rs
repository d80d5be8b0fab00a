//! Common error types for posint

use thiserror::Error;

/// Common result type for posint operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the posint crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed data file (dataset, overlay, model response)
    #[error("Parse error: {0}")]
    Parse(String),
}
