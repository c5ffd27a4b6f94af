//! Error types for murmur providers and sessions.

use std::time::Duration;

use crate::stream::{StreamError, StreamErrorKind};

/// Errors from a streaming chat exchange.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    // Raised before any network I/O
    /// The client is missing credentials or is otherwise misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Transport
    /// The endpoint answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// No data arrived within the idle timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// The body stream failed after the response started.
    #[error("stream error: {0}")]
    Stream(String),

    /// The caller cancelled the exchange.
    #[error("cancelled")]
    Cancelled,
}

impl ChatError {
    /// Whether this error is likely transient and the request can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::Stream(_) => true,
            Self::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }

    /// The HTTP status, for [`ChatError::Http`].
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<StreamError> for ChatError {
    fn from(err: StreamError) -> Self {
        match err.kind {
            StreamErrorKind::Timeout(after) => Self::Timeout(after),
            StreamErrorKind::Cancelled => Self::Cancelled,
            StreamErrorKind::Transport => Self::Stream(err.message),
        }
    }
}
