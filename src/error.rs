//! Error types for the relay.
//!
//! `UpstreamError` covers everything that can go wrong talking to the detection vendor.
//! `ApiError` is what handlers return; it maps onto the HTTP contract (400 / 500 / 502).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure of a single vendor call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// Connection refused, DNS, TLS, timeout, body read.
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    /// Vendor answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// Vendor answered 2xx but the body was not JSON.
    #[error("{endpoint} returned malformed JSON: {message}")]
    Decode { endpoint: String, message: String },
}

impl UpstreamError {
    pub fn transport(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
            status,
        }
    }

    pub fn decode(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::Decode { .. } => "decode",
        }
    }
}

/// Handler-level error.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No vendor credential configured (500). Checked before any upstream call.
    #[error("REALITY_DEFENDER_API_KEY not configured")]
    MissingCredential,

    /// Client input error (400).
    #[error("{0}")]
    BadRequest(String),

    /// Upload over the configured body limit (413).
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Vendor call failed (502).
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: UpstreamError,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::MissingCredential
            | ApiError::BadRequest(_)
            | ApiError::PayloadTooLarge(_) => {
                json!({ "error": self.to_string() })
            }
            ApiError::Upstream { context, source } => json!({
                "error": context,
                "detail": source.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}
