//! Error types for the voice chat gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice chat gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Voice session error (capture or synthesis)
    #[error("voice error: {0}")]
    Voice(String),

    /// Session channel error
    #[error("channel error: {0}")]
    Channel(String),

    /// Request payload failed validation
    #[error("{0}")]
    Validation(String),

    /// Uniqueness constraint violated
    #[error("{0}")]
    Conflict(String),

    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// Remote API answered with an error status
    #[error("request failed ({status}): {message}")]
    Api { status: u16, message: String },

    /// Location lookup error
    #[error("location error: {0}")]
    Location(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
