//! Unified error types for Wraith

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Wraith
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Agent process failed to launch or become ready
    #[error("Startup error: {0}")]
    Startup(String),

    /// Channel closed or malformed traffic while a request was pending
    #[error("Communication error: {0}")]
    Communication(String),

    /// Agent reported a command error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session not found in the registry
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Operation deadline elapsed with no settlement
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Agent reported a non-success navigation outcome
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new startup error
    pub fn startup<S: Into<String>>(msg: S) -> Self {
        Error::Startup(msg.into())
    }

    /// Create a new communication error
    pub fn communication<S: Into<String>>(msg: S) -> Self {
        Error::Communication(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a new session not found error
    pub fn session_not_found<S: Into<String>>(id: S) -> Self {
        Error::SessionNotFound(id.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new navigation failed error
    pub fn navigation_failed<S: Into<String>>(msg: S) -> Self {
        Error::NavigationFailed(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }
}
