//! Gemini `streamGenerateContent` request types.
//!
//! Responses are read as untyped [`serde_json::Value`]s: a chunk that lacks
//! the expected fields is still a valid chunk, it just carries no text.

use murmur_types::Content;
use serde::Serialize;

/// Request body for `models/{model}:streamGenerateContent`.
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    /// Conversation turns, oldest first, ending with the new user turn.
    pub contents: Vec<Content>,
}
