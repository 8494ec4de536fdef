//! Request-path errors and their JSON envelope rendering

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::api::ErrorEnvelope;

/// Every way a forwarded request can fail. Each variant renders as an
/// [`ErrorEnvelope`]; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Not found")]
    NotFound,

    #[error("Server misconfigured: missing OpenAI key")]
    MissingCredential,

    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("{message} (upstream status {status})")]
    Upstream {
        status: StatusCode,
        message: &'static str,
        details: Value,
    },

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to read request body: {0}")]
    Body(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::NotFound => StatusCode::NOT_FOUND,
            ProxyError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::MissingField(_) => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::Transport(_) | ProxyError::Body(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing body. Transport and body failures collapse to a
    /// generic message so internal detail stays in the logs.
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            ProxyError::Upstream { message, details, .. } => ErrorEnvelope {
                error: message.to_string(),
                details: Some(details.clone()),
            },
            ProxyError::Transport(_) | ProxyError::Body(_) => ErrorEnvelope {
                error: "Proxy error".to_string(),
                details: None,
            },
            other => ErrorEnvelope {
                error: other.to_string(),
                details: None,
            },
        }
    }

    pub fn log(&self) {
        match self {
            ProxyError::MethodNotAllowed
            | ProxyError::NotFound
            | ProxyError::MissingField(_)
            | ProxyError::PayloadTooLarge => {
                tracing::debug!(error = %self, "Rejected client request");
            }
            ProxyError::MissingCredential => {
                tracing::warn!("Request refused: no upstream credential configured");
            }
            ProxyError::Upstream { status, details, .. } => {
                tracing::warn!(status = %status, details = %details, "Upstream returned error response");
            }
            ProxyError::Transport(_) | ProxyError::Body(_) => {
                tracing::error!(error = %self, "Proxy error");
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}
