//! Speech-to-text collaborator.
//!
//! The pipeline treats transcription as an opaque network call: WAV bytes
//! in, plain transcript text out.  [`Transcriber`] is the seam the
//! orchestrator holds (`Arc<dyn Transcriber>`); [`WhisperTranscriber`] is
//! the production implementation posting to an OpenAI-style
//! `/v1/audio/transcriptions` endpoint.  No retry on failure.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::SttConfig;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// Errors from the transcription collaborator.
#[derive(Debug, Error)]
pub enum SttError {
    /// HTTP transport or connection error.
    #[error("transcription request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("transcription request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("transcription service returned {status}: {body}")]
    Service { status: u16, body: String },

    /// The response body was not the expected JSON shape.
    #[error("failed to parse transcription response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SttError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SttError::Timeout
        } else {
            SttError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Async seam for speech-to-text backends.
///
/// Implementors must be `Send + Sync` so the orchestrator can hold them as
/// `Arc<dyn Transcriber>`.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a readable WAV container (raw bytes) to plain text.
    async fn transcribe(&self, wav: &[u8]) -> Result<String, SttError>;
}

// ---------------------------------------------------------------------------
// WhisperTranscriber
// ---------------------------------------------------------------------------

/// Wire shape of the transcription response.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Posts WAV audio to an OpenAI-compatible `/v1/audio/transcriptions`
/// endpoint as a multipart upload.
pub struct WhisperTranscriber {
    client: reqwest::Client,
    config: SttConfig,
}

impl WhisperTranscriber {
    /// Build a transcriber from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`.
    pub fn from_config(config: &SttConfig) -> Self {
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
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, wav: &[u8]) -> Result<String, SttError> {
        log::debug!("transcribing {} bytes of audio", wav.len());

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| SttError::Request(e.to_string()))?,
            )
            .text("model", self.config.model.clone());

        let url = format!("{}/v1/audio/transcriptions", self.config.base_url);
        let mut req = self.client.post(&url).multipart(form);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SttError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| SttError::Parse(e.to_string()))?;

        log::info!("transcript: {:?}", parsed.text);
        Ok(parsed.text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_shape_parses() {
        let json = r#"{"text": "hello world"}"#;
        let parsed: TranscriptionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text, "hello world");
    }

    #[test]
    fn response_shape_ignores_extra_fields() {
        let json = r#"{"text": "hi", "language": "en", "duration": 1.5}"#;
        let parsed: TranscriptionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text, "hi");
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _t = WhisperTranscriber::from_config(&SttConfig::default());
    }

    #[test]
    fn transcriber_is_object_safe() {
        let t: Box<dyn Transcriber> = Box::new(WhisperTranscriber::from_config(&SttConfig::default()));
        drop(t);
    }

    #[test]
    fn timeout_errors_map_to_timeout_variant_shape() {
        // From<reqwest::Error> cannot be exercised without a live socket;
        // assert the variant formatting the runner relies on instead.
        let e = SttError::Service {
            status: 401,
            body: "unauthorized".into(),
        };
        assert_eq!(
            e.to_string(),
            "transcription service returned 401: unauthorized"
        );
    }
}
