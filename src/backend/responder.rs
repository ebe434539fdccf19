//! Core `BackendResponder` trait and `HttpResponder` implementation.
//!
//! `HttpResponder` posts `{text, session_id}` to the configured chat
//! endpoint and expects `{"reply": "..."}` back.  All connection details
//! come from [`BackendConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::BackendConfig;

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Errors that can occur while fetching a reply.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport or connection error.
    #[error("backend request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("backend request timed out")]
    Timeout,

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse backend response: {0}")]
    Parse(String),

    /// The backend returned a response with no usable reply text.
    #[error("backend returned an empty reply")]
    EmptyReply,
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// BackendResponder trait
// ---------------------------------------------------------------------------

/// Async trait for the chat backend.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// behind an `Arc<dyn BackendResponder>`.
///
/// # Arguments
/// * `text`       – the final user transcript for this turn.
/// * `session_id` – the per-session identifier threaded through every call.
#[async_trait]
pub trait BackendResponder: Send + Sync {
    async fn respond(&self, text: &str, session_id: &str) -> Result<String, BackendError>;
}

// ---------------------------------------------------------------------------
// HttpResponder
// ---------------------------------------------------------------------------

/// Calls a JSON chat endpoint (`POST {base_url}/chat`).
///
/// # No hardcoded URLs
/// All connection details (`base_url`, `api_key`, `timeout_secs`) come
/// exclusively from the [`BackendConfig`] passed to
/// [`HttpResponder::from_config`].
pub struct HttpResponder {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpResponder {
    /// Build an `HttpResponder` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`; a default client is the last-resort fallback
    /// if the builder fails.
    pub fn from_config(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl BackendResponder for HttpResponder {
    /// Send `text` to the configured chat endpoint and return the reply.
    ///
    /// The `Authorization: Bearer …` header is attached **only** when
    /// `config.api_key` is a non-empty string — local backends need no
    /// authentication.
    async fn respond(&self, text: &str, session_id: &str) -> Result<String, BackendError> {
        let url = format!("{}/chat", self.config.base_url);

        let body = serde_json::json!({
            "text":       text,
            "session_id": session_id,
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        let reply = json["reply"]
            .as_str()
            .ok_or(BackendError::EmptyReply)?
            .trim()
            .to_string();

        if reply.is_empty() {
            return Err(BackendError::EmptyReply);
        }

        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
