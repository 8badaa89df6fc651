//! Reply-generation collaborator.
//!
//! Given the transcript of what the operator said, produce the reply text
//! that will be spoken back.  [`ReplyGenerator`] is the seam the
//! orchestrator holds; [`ChatReplier`] calls any OpenAI-compatible
//! `/v1/chat/completions` endpoint — all connection details come from
//! [`LlmConfig`], nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LlmConfig;

// ---------------------------------------------------------------------------
// ReplyError
// ---------------------------------------------------------------------------

/// Errors from the reply-generation collaborator.
#[derive(Debug, Error)]
pub enum ReplyError {
    /// HTTP transport or connection error.
    #[error("reply request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("reply request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("reply service returned {status}: {body}")]
    Service { status: u16, body: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse reply response: {0}")]
    Parse(String),

    /// The model returned a response with no usable text content.
    #[error("reply service returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for ReplyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ReplyError::Timeout
        } else {
            ReplyError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ReplyGenerator trait
// ---------------------------------------------------------------------------

/// Async seam for reply-generation backends.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn ReplyGenerator>`.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generate a reply to `prompt` (the user's transcript).
    async fn generate(&self, prompt: &str) -> Result<String, ReplyError>;
}

// ---------------------------------------------------------------------------
// ChatReplier
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// Works with OpenAI, Groq, Ollama (OpenAI mode), LM Studio, vLLM — any
/// provider speaking the chat-completions wire format.  The
/// `Authorization: Bearer …` header is attached only when a non-empty API
/// key is configured, so local providers need no credentials.
pub struct ChatReplier {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ChatReplier {
    /// Build a replier from application config.
    pub fn from_config(config: &LlmConfig) -> Self {
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
impl ReplyGenerator for ChatReplier {
    async fn generate(&self, prompt: &str) -> Result<String, ReplyError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model":       self.config.model,
            "messages":    [ { "role": "user", "content": prompt } ],
            "stream":      false,
            "temperature": self.config.temperature,
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReplyError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ReplyError::Parse(e.to_string()))?;

        let reply = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(ReplyError::EmptyResponse)?
            .trim()
            .to_string();

        if reply.is_empty() {
            return Err(ReplyError::EmptyResponse);
        }

        log::info!("reply: {reply:?}");
        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
