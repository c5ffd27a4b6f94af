//! Conversation turns, session identifiers, and request/reply types.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// The author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human user.
    User,
    /// The generative model.
    Model,
}

/// A text part within a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// The text of this part.
    pub text: String,
}

/// One turn of a conversation.
///
/// Serializes to the `{ "role": ..., "parts": [{ "text": ... }] }` shape used
/// by the generative-text endpoint, so history can be sent back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Who authored the turn.
    pub role: Role,
    /// Ordered text parts.
    pub parts: Vec<Part>,
}

impl Content {
    /// A single-part user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::single(Role::User, text)
    }

    /// A single-part model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self::single(Role::Model, text)
    }

    fn single(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }

    /// All parts joined together.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

/// Opaque token correlating several exchanges into one conversation.
///
/// Freshly generated identifiers are random (version 4) UUIDs in the
/// canonical 36-character `8-4-4-4-12` form. They are not secrets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a caller-supplied identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Generate a random identifier namespaced as `{prefix}_{uuid}`.
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        Self(format!("{prefix}_{}", Uuid::new_v4()))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Token accounting reported by the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt (history plus the new message).
    pub prompt_tokens: u64,
    /// Tokens generated in the response.
    pub response_tokens: u64,
    /// Total tokens billed for the exchange.
    pub total_tokens: u64,
}

/// A single streaming chat exchange.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The user's new message.
    pub message: String,
    /// Prior turns, oldest first.
    pub history: Vec<Content>,
    /// Session to continue. A fresh one is generated when `None`.
    pub session_id: Option<SessionId>,
    /// Cancelling this token aborts the exchange and releases the transport.
    pub cancellation_token: CancellationToken,
}

impl ChatRequest {
    /// A request with no history and a fresh cancellation token.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            session_id: None,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Attach prior conversation turns.
    #[must_use]
    pub fn with_history(mut self, history: Vec<Content>) -> Self {
        self.history = history;
        self
    }

    /// Continue an existing session.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Use a caller-owned cancellation token.
    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// History followed by the new user turn, as sent to the endpoint.
    #[must_use]
    pub fn contents(&self) -> Vec<Content> {
        let mut contents = self.history.clone();
        contents.push(Content::user(self.message.clone()));
        contents
    }
}

/// The outcome of a completed streaming exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// The session this exchange belongs to.
    pub session_id: SessionId,
    /// The full response text: the concatenation of every delta delivered.
    pub message: String,
    /// The request history followed by the user turn and the model turn.
    pub history: Vec<Content>,
    /// Token usage, if the endpoint reported it.
    pub usage: Option<TokenUsage>,
}
