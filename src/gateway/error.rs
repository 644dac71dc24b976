//! Error types for the completion gateway.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling the completion endpoint.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Endpoint answered with a non-2xx status.
    #[error("completion endpoint returned HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        request_id: Option<String>,
    },

    /// Body could not be read as a completion response.
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    /// Request rejected before sending - permanent error, don't retry.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request timed out - retryable.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// HTTP/network error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error (missing endpoint, bad key, etc.).
    #[error("configuration error: {0}")]
    Config(String),
}

impl CompletionError {
    pub fn status(status: u16, message: impl Into<String>, request_id: Option<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
            request_id,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::InvalidResponse(_) => false,
            Self::InvalidRequest(_) => false,
            Self::Config(_) => false,
        }
    }

    /// Get a short error code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Status { status: 429, .. } => "rate_limited",
            Self::Status { .. } => "http_status",
            Self::InvalidResponse(_) => "invalid_response",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Timeout(_) => "timeout",
            Self::Http(_) => "http_error",
            Self::Config(_) => "config_error",
        }
    }

    /// Request ID reported by the endpoint, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Status { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}
