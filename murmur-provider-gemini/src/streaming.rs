//! Streaming support for the Gemini `streamGenerateContent` endpoint.
//!
//! The response body is a JSON array of chunk objects delivered over time.
//! Body bytes are decoded, split into complete objects by
//! [`ObjectExtractor`], and mapped to [`StreamEvent`]s:
//!
//! - one [`StreamEvent::TextDelta`] per chunk carrying text,
//! - a [`StreamEvent::Usage`] at the end if the endpoint reported usage,
//! - a final [`StreamEvent::MessageComplete`] with the accumulated text,
//!
//! or a single [`StreamEvent::Error`] if the transport fails, times out, or
//! the caller cancels.

use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use murmur_types::{StreamError, StreamEvent, StreamHandle, TokenUsage};
use reqwest::Response;
use tokio_util::sync::CancellationToken;

use crate::decode::Utf8Decoder;
use crate::extractor::ObjectExtractor;
use crate::mapping::{delta_text, usage_from_chunk};

/// Per-stream settings carried over from the client and request.
#[derive(Debug, Clone)]
pub(crate) struct StreamOptions {
    /// Maximum wait for any single body chunk.
    pub idle_timeout: Option<Duration>,
    /// Aborts the read loop when cancelled.
    pub cancellation_token: CancellationToken,
}

/// Wrap an HTTP response body into a [`StreamHandle`].
///
/// The response is owned by the returned stream and dropped with it.
pub(crate) fn stream_completion(response: Response, options: StreamOptions) -> StreamHandle {
    StreamHandle::new(parse_object_stream(response.bytes_stream(), options))
}

/// Parse a raw byte stream into [`StreamEvent`]s.
fn parse_object_stream<S, E>(
    byte_stream: S,
    options: StreamOptions,
) -> impl Stream<Item = StreamEvent> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::stream! {
        let mut bytes_stream = std::pin::pin!(byte_stream);
        let mut decoder = Utf8Decoder::new();
        let mut state = ResponseState::new();

        loop {
            let read = next_chunk(
                &mut bytes_stream,
                options.idle_timeout,
                &options.cancellation_token,
            )
            .await;

            match read {
                ChunkRead::Chunk(chunk) => {
                    let text = decoder.decode(&chunk);
                    for delta in state.push(&text) {
                        yield StreamEvent::TextDelta(delta);
                    }
                }
                ChunkRead::End => break,
                ChunkRead::Failed(err) => {
                    tracing::warn!(error = %err, "response stream aborted");
                    yield StreamEvent::Error(err);
                    return;
                }
            }
        }

        let tail = decoder.finish();
        for delta in state.push(&tail) {
            yield StreamEvent::TextDelta(delta);
        }
        for delta in state.finish() {
            yield StreamEvent::TextDelta(delta);
        }

        if state.text.is_empty() {
            tracing::warn!("Gemini returned an empty response");
        } else {
            tracing::debug!(len = state.text.len(), "response stream complete");
        }

        if let Some(usage) = state.usage {
            yield StreamEvent::Usage(usage);
        }
        yield StreamEvent::MessageComplete(state.text);
    }
}

/// Outcome of waiting for the next body chunk.
enum ChunkRead {
    Chunk(Bytes),
    End,
    Failed(StreamError),
}

/// Wait for the next chunk, bounded by the idle timeout and the cancellation
/// token. Cancellation wins if both are ready.
async fn next_chunk<S, E>(
    bytes_stream: &mut Pin<&mut S>,
    idle_timeout: Option<Duration>,
    cancellation_token: &CancellationToken,
) -> ChunkRead
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let read = async {
        let item = match idle_timeout {
            Some(after) => match tokio::time::timeout(after, bytes_stream.next()).await {
                Ok(item) => item,
                Err(_) => return ChunkRead::Failed(StreamError::timeout(after)),
            },
            None => bytes_stream.next().await,
        };
        match item {
            Some(Ok(chunk)) => ChunkRead::Chunk(chunk),
            Some(Err(e)) => ChunkRead::Failed(StreamError::transport(format!("stream read error: {e}"))),
            None => ChunkRead::End,
        }
    };

    tokio::select! {
        biased;
        () = cancellation_token.cancelled() => ChunkRead::Failed(StreamError::cancelled()),
        read = read => read,
    }
}

/// Accumulated state across the chunks of one response.
struct ResponseState {
    extractor: ObjectExtractor,
    /// Concatenation of every delta emitted so far.
    text: String,
    /// Most recent usage report.
    usage: Option<TokenUsage>,
}

impl ResponseState {
    fn new() -> Self {
        Self {
            extractor: ObjectExtractor::new(),
            text: String::new(),
            usage: None,
        }
    }

    /// Feed decoded text; return the deltas of every object it completes.
    fn push(&mut self, text: &str) -> Vec<String> {
        let objects = self.extractor.feed(text);
        self.process_objects(objects)
    }

    /// End-of-stream extraction pass.
    fn finish(&mut self) -> Vec<String> {
        let objects = self.extractor.finish();
        self.process_objects(objects)
    }

    fn process_objects(&mut self, objects: Vec<String>) -> Vec<String> {
        objects
            .iter()
            .filter_map(|object| self.process_object(object))
            .collect()
    }

    /// Parse one object span. Malformed spans are logged and skipped.
    fn process_object(&mut self, object: &str) -> Option<String> {
        let json: serde_json::Value = match serde_json::from_str(object) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, len = object.len(), "dropping malformed JSON object");
                return None;
            }
        };

        if let Some(usage) = usage_from_chunk(&json) {
            self.usage = Some(usage);
        }

        let delta = delta_text(&json)?.to_string();
        self.text.push_str(&delta);
        Some(delta)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
