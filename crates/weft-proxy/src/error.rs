//! Error types for the proxy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use weft_docker::EngineError;

/// Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors that abort a create-container rewrite or forward.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Request body was not a valid create-container payload.
    #[error("invalid container create body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The requested image does not exist. The message carries the image
    /// reference because Docker clients parse the name out of it.
    #[error("No such image: {0}")]
    NoSuchImage(String),

    /// Neither an entrypoint nor a command is available to wrap.
    #[error("No command specified")]
    NoCommandSpecified,

    /// Engine inspection failed for a reason other than a missing image.
    #[error(transparent)]
    Engine(EngineError),

    /// Forwarding to the engine socket failed.
    #[error("engine request failed: {0}")]
    Upstream(String),

    /// Server error.
    #[error("Server error: {0}")]
    Server(String),
}

impl ProxyError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::NoCommandSpecified => StatusCode::BAD_REQUEST,
            Self::NoSuchImage(_) => StatusCode::NOT_FOUND,
            Self::Engine(EngineError::ImageNotFound(_) | EngineError::ContainerNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Engine(_) | Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "message": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}
