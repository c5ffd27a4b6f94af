//! Gemini API client struct and builder.

use std::fmt;
use std::future::Future;
use std::time::Duration;

#[allow(unused_imports)] // StreamEvent used in doc links
use murmur_types::{ChatError, ChatProvider, ChatRequest, StreamEvent, StreamHandle};

use crate::error::{map_http_status, map_reqwest_error};
use crate::mapping::to_api_request;
use crate::streaming::{StreamOptions, stream_completion};

/// Default model used when none is configured.
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default Gemini API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default idle timeout for the request and for each body chunk.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variables consulted by [`Gemini::from_env`], in order.
const API_KEY_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Client for the Gemini `streamGenerateContent` API.
///
/// Each client owns its configuration; there is no shared global instance,
/// so several differently configured clients can coexist.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use murmur_provider_gemini::Gemini;
///
/// let client = Gemini::new("my-api-key")
///     .model("gemini-2.0-flash")
///     .timeout(Duration::from_secs(30));
/// ```
#[derive(Clone)]
pub struct Gemini {
    /// API key sent as the `key` query parameter. Checked at call time.
    pub(crate) api_key: Option<String>,
    /// Model identifier.
    pub(crate) model: String,
    /// API base URL (override for testing).
    pub(crate) base_url: String,
    /// Idle timeout for the request and for each body chunk.
    pub(crate) timeout: Option<Duration>,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl Gemini {
    /// Create a new client with the given API key.
    ///
    /// Default model: `gemini-2.0-flash`.
    /// Default idle timeout: 60 seconds.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_key(Some(api_key.into()))
    }

    /// Create a client using the first of `GOOGLE_API_KEY` or `GEMINI_API_KEY`
    /// that is set.
    ///
    /// A missing key is logged, not fatal: the client is still built and
    /// every call fails with [`ChatError::Configuration`] before touching
    /// the network.
    #[must_use]
    pub fn from_env() -> Self {
        let api_key = first_key(|var| std::env::var(var).ok());
        if api_key.is_none() {
            tracing::warn!(vars = ?API_KEY_VARS, "Gemini API key missing from the environment");
        }
        Self::with_key(api_key)
    }

    fn with_key(api_key: Option<String>) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout: Some(DEFAULT_TIMEOUT),
            client: reqwest::Client::new(),
        }
    }

    /// Override the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL.
    ///
    /// Useful for testing with a local mock server or routing through a proxy.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the idle timeout.
    ///
    /// Applies to sending the request and to each wait for the next body
    /// chunk. When it elapses the call fails with a timeout and the
    /// connection is dropped.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait indefinitely for the endpoint.
    #[must_use]
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, connection pools).
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Build the streaming endpoint URL (without the API key).
    pub(crate) fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl fmt::Debug for Gemini {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gemini")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ChatProvider for Gemini {
    /// Send a streaming request to `streamGenerateContent`.
    ///
    /// Returns once the response headers arrive; the body is read lazily by
    /// the returned [`StreamHandle`], whose receiver emits [`StreamEvent`]s
    /// as complete chunk objects arrive.
    fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = Result<StreamHandle, ChatError>> + Send {
        let url = self.stream_url();
        let api_key = self.api_key.clone();
        let model = self.model.clone();
        let timeout = self.timeout;
        let http_client = self.client.clone();

        async move {
            let api_key = api_key.filter(|key| !key.is_empty()).ok_or_else(|| {
                ChatError::Configuration(
                    "missing Gemini API key; set GOOGLE_API_KEY or pass one to Gemini::new".into(),
                )
            })?;

            let cancellation_token = request.cancellation_token.clone();
            if cancellation_token.is_cancelled() {
                return Err(ChatError::Cancelled);
            }

            let body = to_api_request(&request);

            tracing::debug!(
                url = %url,
                model = %model,
                history = request.history.len(),
                "sending streaming request to Gemini"
            );

            let send = http_client
                .post(&url)
                .query(&[("key", api_key.as_str())])
                .header("content-type", "application/json")
                .json(&body)
                .send();

            let response = tokio::select! {
                biased;
                () = cancellation_token.cancelled() => return Err(ChatError::Cancelled),
                response = with_timeout(timeout, send) => response?,
            };

            let status = response.status();
            if !status.is_success() {
                let body_text = tokio::select! {
                    biased;
                    () = cancellation_token.cancelled() => return Err(ChatError::Cancelled),
                    text = with_timeout(timeout, response.text()) => text?,
                };
                tracing::warn!(status = status.as_u16(), "Gemini stream request failed");
                return Err(map_http_status(status, &body_text));
            }

            Ok(stream_completion(
                response,
                StreamOptions {
                    idle_timeout: timeout,
                    cancellation_token,
                },
            ))
        }
    }
}

/// The first non-blank value among [`API_KEY_VARS`].
fn first_key(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
        .iter()
        .find_map(|&var| lookup(var).filter(|key| !key.trim().is_empty()))
}

/// Await a reqwest future, bounded by `timeout` when one is set.
async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, reqwest::Error>>,
) -> Result<T, ChatError> {
    let result = match timeout {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| ChatError::Timeout(after))?,
        None => fut.await,
    };
    result.map_err(|e| map_reqwest_error(e, timeout))
}
