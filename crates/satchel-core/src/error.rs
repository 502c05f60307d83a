//! Error types for the Satchel agent.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Delivery errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Install failed for {url}: {reason}")]
    Install { url: String, reason: String },

    // Platform errors
    #[error("Not supported by host: {0}")]
    Unsupported(String),

    // Input errors
    #[error("Invalid control message: {0}")]
    InvalidMessage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidRequest(err.to_string())
    }
}
