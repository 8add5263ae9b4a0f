//! Error types for the garnet node.

use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur running the node.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration parse error
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine / transport error
    #[error(transparent)]
    Engine(#[from] garnet_engine::Error),

    /// The server closed the connection.
    #[error("connection closed by server")]
    ConnectionClosed,
}
