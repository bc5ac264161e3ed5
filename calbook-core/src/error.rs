//! Error types for calbook operations.

use thiserror::Error;

/// Errors that can occur in calbook operations.
///
/// Every variant is recoverable: a failed operation leaves the calendar or
/// registry it was called on unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalbookError {
    /// Malformed input: bad interval, weekday mask, zone name, property name or value.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Duplicate event identity or calendar name.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown calendar or event.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A locator matched more than one event.
    #[error("Ambiguous: {0}")]
    Ambiguous(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for calbook operations.
pub type CalbookResult<T> = Result<T, CalbookError>;
