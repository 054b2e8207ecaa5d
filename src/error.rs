//! Crate-wide error type.

use thiserror::Error;

/// Everything that can go wrong outside the socket event handlers.
///
/// Inbound frames never produce an error: frames that fail to parse as JSON
/// are treated as text fragments.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, ClientError>;
