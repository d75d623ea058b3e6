//! Capability client error types.

use thiserror::Error;

pub type CapabilityResult<T> = Result<T, CapabilityError>;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Capability service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("{operation} failed ({status}): {message}")]
    RequestFailed {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service reported a condition that makes continuing pointless.
    #[error("Fatal capability error: {0}")]
    Fatal(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const BODY_PREFIX_CHARS: usize = 200;

impl CapabilityError {
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// A body that failed to parse, quoting at most the first 200 characters.
    pub fn unparsable_body(endpoint: &str, err: impl std::fmt::Display, body: &str) -> Self {
        let prefix: String = body.chars().take(BODY_PREFIX_CHARS).collect();
        Self::InvalidResponse(format!("{}: {} (body prefix: {})", endpoint, err, prefix))
    }

    pub fn request_failed(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Fatal errors abort the whole batch instead of just the current item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
