//! Error types for garnet-engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the transport.
///
/// Everything here is a transport failure; the engine's own conditions
/// (unknown references, pool exhaustion) are handled in place and never
/// surface as errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying I/O failure from the transport implementation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport closed while a reply was still expected.
    #[error("transport closed while collecting {0}")]
    TransportClosed(&'static str),
}
