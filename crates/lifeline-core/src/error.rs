//! Error types for the Lifeline core
//!
//! All fallible operations in the core return [`Result`]. There is no fatal
//! error class: an alert session must always reach a terminal, auditable
//! state, so external failures (location timeouts, channel send failures)
//! are absorbed as degraded data rather than surfaced through here.

use thiserror::Error;

/// Result type alias for Lifeline operations
pub type Result<T> = std::result::Result<T, LifelineError>;

/// Main error type for Lifeline operations
#[derive(Error, Debug)]
pub enum LifelineError {
    /// Coordinate outside -90..90 latitude / -180..180 longitude
    #[error("Invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates {
        /// Offending latitude in signed degrees
        latitude: f64,
        /// Offending longitude in signed degrees
        longitude: f64,
    },

    /// Trigger rule constructed without any keywords
    #[error("Trigger rule requires at least one keyword")]
    EmptyKeywords,

    /// Trigger rule index out of range
    #[error("No trigger rule at index {0}")]
    RuleNotFound(usize),

    /// Contact lookup by phone failed
    #[error("Contact not found: {0}")]
    ContactNotFound(String),

    /// Notification channel failure
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Location provider failure
    #[error("Location error: {0}")]
    LocationError(String),

    /// Persistent store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
