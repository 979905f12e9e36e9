//! Error types for the geoping system
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for geoping operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the geoping system
#[derive(Error, Debug)]
pub enum Error {
    /// Inventory document missing, unreadable, malformed or not writable
    #[error("Store error: {0}")]
    Store(String),

    /// The probe socket could not be constructed (systemic, never per-device)
    #[error("Probe setup error: {0}")]
    ProbeSetup(String),

    /// The process lacks the privilege required to send ICMP echoes
    #[error("Insufficient privilege: {0}")]
    Privilege(String),

    /// A probe failed in a way that is not a timeout or loss
    #[error("Probe error: {0}")]
    Probe(String),

    /// The query service could not bind its listen address
    #[error("Listen error: {0}")]
    Listen(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Geocoding lookup failures
    #[error("Geocoding error: {0}")]
    Geocode(String),

    /// A device with this address is already in the inventory
    #[error("Duplicate device: {0}")]
    Duplicate(String),

    /// Device or target not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Low-level I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a probe setup error
    pub fn probe_setup(msg: impl Into<String>) -> Self {
        Self::ProbeSetup(msg.into())
    }

    /// Create a privilege error
    pub fn privilege(msg: impl Into<String>) -> Self {
        Self::Privilege(msg.into())
    }

    /// Create a probe error
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Create a listen error
    pub fn listen(msg: impl Into<String>) -> Self {
        Self::Listen(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a geocoding error
    pub fn geocode(msg: impl Into<String>) -> Self {
        Self::Geocode(msg.into())
    }

    /// Create a duplicate device error
    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error is a store failure
    ///
    /// The refresh engine tolerates a bounded run of these before giving up;
    /// every other error reaching the engine is fatal immediately.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Whether this error signals a missing capability rather than a bad device
    pub fn is_probe_setup(&self) -> bool {
        matches!(self, Self::ProbeSetup(_) | Self::Privilege(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::store("missing").is_store());
        assert!(!Error::probe("boom").is_store());
        assert!(Error::privilege("no root").is_probe_setup());
        assert!(Error::probe_setup("socket").is_probe_setup());
        assert!(!Error::listen("in use").is_probe_setup());
    }

    #[test]
    fn test_error_display() {
        let err = Error::duplicate("10.0.0.1");
        assert_eq!(err.to_string(), "Duplicate device: 10.0.0.1");
    }
}
