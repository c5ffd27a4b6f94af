//! Internal error helpers for mapping HTTP/reqwest errors to [`ChatError`].

use std::time::Duration;

use murmur_types::ChatError;

/// Map a non-success HTTP status (and its body text) to a [`ChatError`].
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ChatError {
    ChatError::Http {
        status: status.as_u16(),
        body: body.to_string(),
    }
}

/// Map a [`reqwest::Error`] to a [`ChatError`].
///
/// `timeout` is the client's configured idle timeout, reported when reqwest
/// itself gave up waiting. Errors raised while building the request (bad URL,
/// unserializable body) never reached the network.
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Option<Duration>) -> ChatError {
    if err.is_builder() {
        ChatError::InvalidRequest(err.to_string())
    } else if err.is_timeout() {
        ChatError::Timeout(timeout.unwrap_or_default())
    } else {
        ChatError::Network(Box::new(err))
    }
}
