use thiserror::Error;

use super::CategoryId;

/// tallytrack error types
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Requested tracker does not exist
    #[error("tracker doesn't exist: {0}")]
    SourceNotFound(String),

    /// Category id unknown to a tracker
    #[error("category {id} doesn't exist in tracker {tracker}")]
    CategoryNotFound { tracker: String, id: CategoryId },

    /// Windowed query failed for a tracker
    #[error("query on tracker {tracker} failed: {reason}")]
    Query { tracker: String, reason: String },

    /// A graph point could not be placed on the axes it was built from
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Tracker already exists
    #[error("tracker already exists: {0}")]
    AlreadyExists(String),

    /// Quantity text is not a valid fixed-point amount
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Invalid combination of arguments
    #[error("usage error: {0}")]
    Usage(String),

    /// Failed to parse a tracker document
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for tallytrack
pub type Result<T> = std::result::Result<T, TrackerError>;
