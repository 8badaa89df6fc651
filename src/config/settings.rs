//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::audio::AudioFormat;

use super::AppPaths;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// PCM layout used for capture.  Fixed for the lifetime of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Number of interleaved channels (1 = mono).
    pub channels: u16,
    /// Bytes per sample (2 = 16-bit PCM).
    pub sample_width_bytes: u16,
    /// Capture sample rate in Hz.
    pub sample_rate_hz: u32,
}

impl AudioConfig {
    /// The capture-side [`AudioFormat`] described by this config.
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            channels: self.channels,
            sample_width_bytes: self.sample_width_bytes,
            sample_rate_hz: self.sample_rate_hz,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        let fmt = AudioFormat::capture_default();
        Self {
            channels: fmt.channels,
            sample_width_bytes: fmt.sample_width_bytes,
            sample_rate_hz: fmt.sample_rate_hz,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the transcription collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Base URL of the transcription API (OpenAI-compatible).
    pub base_url: String,
    /// API key — `None` for local providers that need no authentication.
    pub api_key: Option<String>,
    /// Model identifier sent with the upload (e.g. `"whisper-1"`).
    pub model: String,
    /// Maximum seconds to wait for the transcript.
    pub timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "whisper-1".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the reply-generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the chat-completions API (OpenAI-compatible).
    pub base_url: String,
    /// API key — `None` for local providers.
    pub api_key: Option<String>,
    /// Model identifier (e.g. `"gpt-4o-mini"`, `"qwen2.5:3b"`).
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Maximum seconds to wait for a reply.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the speech-synthesis collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Base URL of the synthesis API (Google-style `text:synthesize`).
    pub base_url: String,
    /// API key appended as a query parameter — `None` to omit.
    pub api_key: Option<String>,
    /// BCP-47 voice language code.
    pub language_code: String,
    /// Requested LINEAR16 sample rate in Hz.
    pub sample_rate_hz: u32,
    /// Maximum seconds to wait for the synthesized audio.
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://texttospeech.googleapis.com".into(),
            api_key: None,
            language_code: "en-US".into(),
            sample_rate_hz: 16_000,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voiceturn::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Capture PCM layout.
    pub audio: AudioConfig,
    /// Name of the key that stops recording (default `"q"`).
    pub stop_key: String,
    /// Seconds to wait after the stop signal before writing the container,
    /// giving the capture context time to flush.
    pub flush_grace_secs: f32,
    /// Directory for the two per-turn transient WAV files; `None` means the
    /// platform temp directory.
    pub working_dir: Option<PathBuf>,
    /// Transcription collaborator settings.
    pub stt: SttConfig,
    /// Reply-generation collaborator settings.
    pub llm: LlmConfig,
    /// Speech-synthesis collaborator settings.
    pub tts: TtsConfig,
}

impl AppConfig {
    /// Load from `settings.toml`, returning defaults when the file does not
    /// exist yet.
    pub fn load() -> Result<Self> {
        let paths = AppPaths::new();
        if !paths.settings_file.exists() {
            return Ok(Self::defaults());
        }
        let raw = std::fs::read_to_string(&paths.settings_file)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Persist to `settings.toml`, creating the config directory on demand.
    pub fn save(&self) -> Result<()> {
        let paths = AppPaths::new();
        std::fs::create_dir_all(&paths.config_dir)?;
        std::fs::write(&paths.settings_file, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Built-in defaults (also what `Default` would give, with the string
    /// fields filled in).
    pub fn defaults() -> Self {
        Self {
            audio: AudioConfig::default(),
            stop_key: "q".into(),
            flush_grace_secs: 2.0,
            working_dir: None,
            stt: SttConfig::default(),
            llm: LlmConfig::default(),
            tts: TtsConfig::default(),
        }
    }

    /// Directory that holds the per-turn transient artifacts.
    pub fn working_dir(&self) -> PathBuf {
        self.working_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fixed_pipeline_layout() {
        let config = AppConfig::defaults();
        assert_eq!(config.stop_key, "q");
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.audio.sample_width_bytes, 2);
        assert_eq!(config.audio.sample_rate_hz, 44_100);
        assert_eq!(config.tts.sample_rate_hz, 16_000);
        assert!((config.flush_grace_secs - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn audio_config_converts_to_format() {
        let config = AudioConfig::default();
        assert_eq!(config.format(), AudioFormat::capture_default());
    }

    #[test]
    fn toml_round_trip_preserves_settings() {
        let mut config = AppConfig::defaults();
        config.stop_key = "x".into();
        config.llm.model = "test-model".into();
        config.stt.api_key = Some("sk-123".into());

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.stop_key, "x");
        assert_eq!(parsed.llm.model, "test-model");
        assert_eq!(parsed.stt.api_key.as_deref(), Some("sk-123"));
    }

    #[test]
    fn working_dir_falls_back_to_temp() {
        let config = AppConfig::defaults();
        assert_eq!(config.working_dir(), std::env::temp_dir());

        let explicit = AppConfig {
            working_dir: Some(PathBuf::from("/tmp/voiceturn-test")),
            ..AppConfig::defaults()
        };
        assert_eq!(
            explicit.working_dir(),
            PathBuf::from("/tmp/voiceturn-test")
        );
    }
}
