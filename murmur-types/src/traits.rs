//! Core traits: ChatProvider, ChatSink.

use std::future::Future;

use crate::error::ChatError;
use crate::stream::StreamHandle;
use crate::types::ChatRequest;

/// A chat backend that answers with a stream of events.
///
/// Uses RPITIT (return position impl trait in trait). Not object-safe; use
/// generics `<P: ChatProvider>` to compose.
///
/// # Example
///
/// ```ignore
/// struct MyProvider;
///
/// impl ChatProvider for MyProvider {
///     fn stream_chat(&self, request: ChatRequest)
///         -> impl Future<Output = Result<StreamHandle, ChatError>> + Send
///     {
///         async { todo!() }
///     }
/// }
/// ```
pub trait ChatProvider: Send + Sync {
    /// Start a streaming exchange.
    ///
    /// Errors returned here happened before any body bytes were read:
    /// configuration, request construction, connection, or a non-success
    /// status. Failures after that arrive as [`crate::StreamEvent::Error`].
    fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = Result<StreamHandle, ChatError>> + Send;
}

/// Push-style consumer for a streaming exchange.
///
/// [`crate::send_message_stream`] calls `on_chunk` for every delta in order,
/// then `on_complete` exactly once: with the full text on success, or with
/// [`crate::FALLBACK_MESSAGE`] on failure.
pub trait ChatSink: Send {
    /// A new text delta arrived.
    fn on_chunk(&mut self, delta: &str);

    /// The exchange finished.
    fn on_complete(&mut self, text: &str);
}

/// A sink that records every call it receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectingSink {
    /// Deltas, in the order they were delivered.
    pub chunks: Vec<String>,
    /// Completion texts. Holds exactly one entry after an exchange.
    pub completions: Vec<String>,
}

impl ChatSink for CollectingSink {
    fn on_chunk(&mut self, delta: &str) {
        self.chunks.push(delta.to_owned());
    }

    fn on_complete(&mut self, text: &str) {
        self.completions.push(text.to_owned());
    }
}
