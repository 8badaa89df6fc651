//! Speech-synthesis collaborator.
//!
//! Turns the generated reply text back into audio.  [`Synthesizer`] is the
//! seam the orchestrator holds; [`CloudSynthesizer`] posts to a
//! Google-style `text:synthesize` endpoint requesting 16 kHz LINEAR16 and
//! returns the decoded WAV container bytes — the orchestrator writes them to
//! disk and plays them back unchanged.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TtsConfig;

// ---------------------------------------------------------------------------
// TtsError
// ---------------------------------------------------------------------------

/// Errors from the synthesis collaborator.
#[derive(Debug, Error)]
pub enum TtsError {
    /// HTTP transport or connection error.
    #[error("synthesis request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("synthesis request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("synthesis service returned {status}: {body}")]
    Service { status: u16, body: String },

    /// The response body was not the expected JSON shape.
    #[error("failed to parse synthesis response: {0}")]
    Parse(String),

    /// The `audioContent` field was not valid base64.
    #[error("failed to decode synthesized audio: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl From<reqwest::Error> for TtsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TtsError::Timeout
        } else {
            TtsError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Synthesizer trait
// ---------------------------------------------------------------------------

/// Async seam for text-to-speech backends.
///
/// Returns the bytes of a readable audio container (WAV, 16 kHz linear PCM).
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError>;
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfigBody,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    ssml_gender: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfigBody {
    audio_encoding: &'static str,
    sample_rate_hertz: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

// ---------------------------------------------------------------------------
// CloudSynthesizer
// ---------------------------------------------------------------------------

/// Posts reply text to a Google-style `v1/text:synthesize` endpoint.
///
/// The response carries base64-encoded LINEAR16 audio (a complete WAV
/// container at the requested sample rate), which is decoded and returned
/// as raw bytes.
pub struct CloudSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
}

impl CloudSynthesizer {
    /// Build a synthesizer from application config.
    pub fn from_config(config: &TtsConfig) -> Self {
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
impl Synthesizer for CloudSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        log::debug!("synthesizing {} chars of reply text", text.len());

        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.config.language_code,
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfigBody {
                audio_encoding: "LINEAR16",
                sample_rate_hertz: self.config.sample_rate_hz,
            },
        };

        let mut url = format!("{}/v1/text:synthesize", self.config.base_url);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            url.push_str("?key=");
            url.push_str(key);
        }

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| TtsError::Parse(e.to_string()))?;

        let audio = base64::engine::general_purpose::STANDARD.decode(parsed.audio_content)?;
        log::info!("synthesized {} bytes of audio", audio.len());
        Ok(audio)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
