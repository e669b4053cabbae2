//! Error types for the HTTP service.
//!
//! # Design
//! `Response` is the application-level failure: the transport delivered a
//! response but the validity check rejected it. It keeps the whole envelope
//! so callers can inspect status, headers and body. `Network` is the
//! transport-level failure and carries only a message. Callers branch on
//! [`HttpError::response`] to tell the two apart.

use crate::http::Response;

/// Errors that settle a request.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The transport could not complete the request (unreachable host,
    /// TLS failure, cancellation).
    #[error("{message}")]
    Network { message: String },

    /// The response failed the validity check.
    #[error("{message}")]
    Response { response: Response, message: String },

    /// A valid response whose body could not be decoded as requested.
    #[error("{message}")]
    Decode { message: String },

    /// The request payload could not be serialized to JSON.
    #[error("failed to serialize request payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// The dispatch task ended without producing a result.
    #[error("request task failed: {message}")]
    Task { message: String },
}

impl HttpError {
    /// The rejected response, for application-level failures.
    pub fn response(&self) -> Option<&Response> {
        match self {
            HttpError::Response { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Take the rejected response out of the error.
    pub fn into_response(self) -> Option<Response> {
        match self {
            HttpError::Response { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Status of the rejected response, if there is one.
    pub fn status(&self) -> Option<u16> {
        self.response().map(Response::status)
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_network(&self) -> bool {
        matches!(self, HttpError::Network { .. })
    }
}
