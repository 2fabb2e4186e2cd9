//! Error types for engine API calls.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur talking to the container engine.
///
/// The not-found variants carry the offending reference because Docker
/// clients parse the name out of the error text.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Image not found.
    #[error("No such image: {0}")]
    ImageNotFound(String),

    /// Container not found.
    #[error("No such container: {0}")]
    ContainerNotFound(String),

    /// Failed to reach the engine socket.
    #[error("engine connection failed: {0}")]
    Connection(String),

    /// Engine returned a non-success status.
    #[error("engine API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message body returned by the engine.
        message: String,
    },

    /// Engine response body was not valid JSON.
    #[error("invalid engine response: {0}")]
    Decode(#[from] serde_json::Error),
}
