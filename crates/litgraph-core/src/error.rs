//! Error types for litgraph.

use thiserror::Error;

/// Result type alias using litgraph's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for litgraph operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A provider answered with a non-success status
    #[error("Upstream error from {provider}: HTTP {status}")]
    Upstream { provider: &'static str, status: u16 },

    /// HTTP/network request failed before a response was received
    #[error("Request error: {0}")]
    Request(String),

    /// One phase of the ordered ingestion pipeline failed
    #[error("Ingestion of {work_id} failed during {phase}: {message}")]
    Ingestion {
        work_id: String,
        phase: &'static str,
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error originated from an external provider.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Upstream { .. } | Error::Request(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
