//! Errors of a single image fetch attempt.

use std::time::Duration;

use thiserror::Error;

/// Failure of one fetch attempt. Every variant is retryable by the loader.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum FetchError {
    #[error("request failed: {message}")]
    Network { message: String },

    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("failed to read body: {message}")]
    Body { message: String },

    #[error("attempt timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("failed to decode image: {message}")]
    Decode { message: String },
}

impl FetchError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates body read error.
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body {
            message: message.into(),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Short label for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Status { .. } => "status",
            Self::Body { .. } => "body",
            Self::Timeout { .. } => "timeout",
            Self::Decode { .. } => "decode",
        }
    }
}
