//! Mapping between murmur types and Gemini JSON.

use murmur_types::{ChatRequest, TokenUsage};
use serde_json::Value;

use crate::types::GenerateContentRequest;

/// Build the request body for a chat exchange: history followed by the new
/// user turn.
#[must_use]
pub fn to_api_request(request: &ChatRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: request.contents(),
    }
}

/// The text delta carried by one response chunk.
///
/// Reads `candidates[0].content.parts[0].text`. Returns `None` when the path
/// is absent, is not a string, or is empty.
#[must_use]
pub fn delta_text(chunk: &Value) -> Option<&str> {
    chunk["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .filter(|text| !text.is_empty())
}

/// Token usage from a chunk's `usageMetadata`, if present.
#[must_use]
pub fn usage_from_chunk(chunk: &Value) -> Option<TokenUsage> {
    let meta = chunk.get("usageMetadata")?.as_object()?;
    let count = |key: &str| meta.get(key).and_then(Value::as_u64).unwrap_or(0);
    Some(TokenUsage {
        prompt_tokens: count("promptTokenCount"),
        response_tokens: count("candidatesTokenCount"),
        total_tokens: count("totalTokenCount"),
    })
}
