//! Streaming event types for incremental chat responses.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use futures::Stream;

use crate::types::TokenUsage;

/// An event emitted during a streaming exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text, in arrival order.
    TextDelta(String),
    /// Token usage reported by the endpoint. Emitted at most once, before
    /// [`StreamEvent::MessageComplete`].
    Usage(TokenUsage),
    /// The full response text. Always the last event of a successful stream
    /// and equal to the concatenation of every preceding `TextDelta`.
    MessageComplete(String),
    /// The transport failed. Always the last event of a failed stream.
    Error(StreamError),
}

/// Why a stream stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// The connection or body reader failed.
    Transport,
    /// No chunk arrived within the configured idle timeout.
    Timeout(Duration),
    /// The caller cancelled the exchange.
    Cancelled,
}

/// A failure that ended a stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StreamError {
    /// Human-readable description.
    pub message: String,
    /// Failure classification.
    pub kind: StreamErrorKind,
}

impl StreamError {
    /// A transport/read failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: StreamErrorKind::Transport,
        }
    }

    /// An idle-timeout failure.
    #[must_use]
    pub fn timeout(after: Duration) -> Self {
        Self {
            message: format!("no data received for {after:?}"),
            kind: StreamErrorKind::Timeout(after),
        }
    }

    /// A caller-initiated cancellation.
    #[must_use]
    pub fn cancelled() -> Self {
        Self {
            message: "stream cancelled".into(),
            kind: StreamErrorKind::Cancelled,
        }
    }

    /// Whether retrying the exchange may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            StreamErrorKind::Transport | StreamErrorKind::Timeout(_)
        )
    }
}

/// Handle to a streaming response.
///
/// Dropping the handle drops the underlying transport.
pub struct StreamHandle {
    /// The stream of events. Consume with `StreamExt::next()`.
    pub receiver: Pin<Box<dyn Stream<Item = StreamEvent> + Send>>,
}

impl StreamHandle {
    /// Box an event stream into a handle.
    pub fn new(stream: impl Stream<Item = StreamEvent> + Send + 'static) -> Self {
        Self {
            receiver: Box::pin(stream),
        }
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}
