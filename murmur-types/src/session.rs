//! Drive a provider stream into a [`ChatSink`] and assemble the reply.

use futures::StreamExt;

use crate::error::ChatError;
use crate::stream::StreamEvent;
use crate::traits::{ChatProvider, ChatSink};
use crate::types::{ChatReply, ChatRequest, Content, SessionId, TokenUsage};

/// Text delivered to [`ChatSink::on_complete`] when an exchange fails.
pub const FALLBACK_MESSAGE: &str =
    "Sorry, the response could not be streamed. Please check your network or API key.";

/// Run one streaming exchange against `provider`.
///
/// Deltas are forwarded to `sink` as they arrive. The sink's `on_complete`
/// is called exactly once: with the full text on success, or with
/// [`FALLBACK_MESSAGE`] before the error is returned.
///
/// The returned [`ChatReply::message`] is the concatenation of every delta
/// passed to `on_chunk`. An empty response is not an error.
pub async fn send_message_stream<P: ChatProvider>(
    provider: &P,
    request: ChatRequest,
    mut sink: Option<&mut dyn ChatSink>,
) -> Result<ChatReply, ChatError> {
    let session_id = request
        .session_id
        .clone()
        .unwrap_or_else(SessionId::generate);
    let mut history = request.history.clone();
    let message = request.message.clone();

    match drive(provider, request, &mut sink).await {
        Ok((text, usage)) => {
            tracing::debug!(session_id = %session_id, len = text.len(), "exchange complete");
            if let Some(sink) = sink.as_mut() {
                sink.on_complete(&text);
            }

            history.push(Content::user(message));
            history.push(Content::model(text.clone()));

            Ok(ChatReply {
                session_id,
                message: text,
                history,
                usage,
            })
        }
        Err(err) => {
            tracing::error!(session_id = %session_id, error = %err, "streaming exchange failed");
            if let Some(sink) = sink.as_mut() {
                sink.on_complete(FALLBACK_MESSAGE);
            }
            Err(err)
        }
    }
}

async fn drive<P: ChatProvider>(
    provider: &P,
    request: ChatRequest,
    sink: &mut Option<&mut dyn ChatSink>,
) -> Result<(String, Option<TokenUsage>), ChatError> {
    let mut handle = provider.stream_chat(request).await?;
    let mut accumulated = String::new();
    let mut usage = None;

    while let Some(event) = handle.receiver.next().await {
        match event {
            StreamEvent::TextDelta(delta) => {
                accumulated.push_str(&delta);
                if let Some(sink) = sink.as_mut() {
                    sink.on_chunk(&delta);
                }
            }
            StreamEvent::Usage(u) => usage = Some(u),
            StreamEvent::MessageComplete(text) => {
                if text != accumulated {
                    tracing::warn!(
                        expected = accumulated.len(),
                        got = text.len(),
                        "completion text differs from delivered deltas"
                    );
                }
                return Ok((accumulated, usage));
            }
            StreamEvent::Error(err) => return Err(err.into()),
        }
    }

    Err(ChatError::Stream("stream ended before completion".into()))
}
