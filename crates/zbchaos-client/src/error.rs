//! Client error types.

use http::StatusCode;
use thiserror::Error;

/// Result type alias for cluster API calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the cluster management API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Connection, handshake, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The unified PATCH endpoint does not exist on this cluster version.
    #[error("method not allowed by {path}")]
    MethodNotAllowed { path: String },

    #[error("request rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("legacy broker endpoint cannot express {0}")]
    LegacyUnsupported(String),
}

impl ClientError {
    /// Whether the failure happened before the cluster gave an answer.
    /// The watch loop retries these on its own cadence.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Decode(_))
    }
}
