//! Turn orchestrator — drives capture → transcription → reply → synthesis →
//! playback for exactly one voice turn.
//!
//! # Flow
//!
//! ```text
//! run_turn()
//!   ├─ fresh CancelSignal, StopTrigger armed
//!   ├─ spawn_blocking(CaptureEngine::record)        [Recording]
//!   ├─ flush grace, write_container → capture.wav
//!   ├─ Transcriber::transcribe, delete capture.wav  [Transcribing]
//!   ├─ ReplyGenerator::generate                     [Generating]
//!   ├─ Synthesizer::synthesize → reply.wav          [Synthesizing]
//!   ├─ spawn_blocking(PlaybackEngine::play),
//!   │     delete reply.wav                          [Playing]
//!   └─ TurnReport                                   [Done]
//! ```
//!
//! Blocking device work runs on `tokio::task::spawn_blocking` so the async
//! runtime never stalls; the collaborators are async already.  Any stage
//! failure moves the turn to `Failed`, cleans up transient artifacts
//! best-effort, and is reported with the failing stage named — there is no
//! retry of any stage.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

use crate::audio::{
    write_container, CaptureEngine, CaptureError, ContainerError, PlaybackEngine, PlaybackError,
};
use crate::cancel::CancelSignal;
use crate::config::AppConfig;
use crate::hotkey::KeyWatcher;
use crate::llm::{ReplyError, ReplyGenerator};
use crate::stt::{SttError, Transcriber};
use crate::tts::{Synthesizer, TtsError};

use super::state::TurnState;

/// File name of the capture artifact inside the working directory.
pub const CAPTURE_FILE: &str = "capture.wav";
/// File name of the synthesis artifact inside the working directory.
pub const REPLY_FILE: &str = "reply.wav";

// ---------------------------------------------------------------------------
// TurnError
// ---------------------------------------------------------------------------

/// A stage failure that ended the turn.
///
/// Every variant names the failing stage in its message and carries the
/// underlying cause, so the operator-visible report satisfies "which stage,
/// what went wrong" without further context.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("recording failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("finalizing the recording failed: {0}")]
    Container(#[from] ContainerError),

    #[error("transcription failed: {0}")]
    Transcribe(#[from] SttError),

    #[error("reply generation failed: {0}")]
    Generate(#[from] ReplyError),

    #[error("speech synthesis failed: {0}")]
    Synthesize(#[from] TtsError),

    /// The synthesized audio could not be written to disk.
    #[error("writing the reply container failed: {0}")]
    ReplyWrite(#[source] std::io::Error),

    #[error("playback failed: {0}")]
    Playback(#[from] PlaybackError),

    /// Unexpected orchestration failure (e.g. a blocking task panicked).
    #[error("internal pipeline error: {0}")]
    Internal(String),
}

impl TurnError {
    /// Name of the stage this error aborted.
    pub fn stage(&self) -> &'static str {
        match self {
            TurnError::Capture(_) => "recording",
            TurnError::Container(_) => "recording finalization",
            TurnError::Transcribe(_) => "transcription",
            TurnError::Generate(_) => "reply generation",
            TurnError::Synthesize(_) | TurnError::ReplyWrite(_) => "speech synthesis",
            TurnError::Playback(_) => "playback",
            TurnError::Internal(_) => "orchestration",
        }
    }
}

// ---------------------------------------------------------------------------
// StopTrigger
// ---------------------------------------------------------------------------

/// Whatever eventually sets the turn's [`CancelSignal`].
///
/// `arm` is called once per turn, right before capture starts, with the
/// turn's freshly created signal.  The production implementation is
/// [`KeyStop`]; tests arm the signal themselves.
pub trait StopTrigger: Send + Sync {
    fn arm(&self, signal: CancelSignal);
}

/// Stops the recording when the designated key is pressed.
pub struct KeyStop {
    stop_key: rdev::Key,
    watcher: Mutex<Option<KeyWatcher>>,
}

impl KeyStop {
    pub fn new(stop_key: rdev::Key) -> Self {
        Self {
            stop_key,
            watcher: Mutex::new(None),
        }
    }
}

impl StopTrigger for KeyStop {
    fn arm(&self, signal: CancelSignal) {
        let mut slot = self.watcher.lock().unwrap();
        // Replacing a previous watcher mutes it via Drop.
        *slot = Some(KeyWatcher::start(self.stop_key, signal));
    }
}

// ---------------------------------------------------------------------------
// TurnReport
// ---------------------------------------------------------------------------

/// What a completed turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// What the operator said, per the transcription collaborator.
    pub transcript: String,
    /// What was spoken back, per the reply-generation collaborator.
    pub reply: String,
    /// Number of chunks the playback engine wrote to the output device.
    pub chunks_played: u64,
}

// ---------------------------------------------------------------------------
// TurnRunner
// ---------------------------------------------------------------------------

/// Owns every engine and collaborator needed for one voice turn.
///
/// Construct with [`TurnRunner::new`] and call [`run_turn`](Self::run_turn)
/// once; the runner is reusable, but each call is an independent turn with a
/// fresh cancellation signal and fresh artifacts.
pub struct TurnRunner {
    config: AppConfig,
    capture: Arc<CaptureEngine>,
    playback: Arc<PlaybackEngine>,
    stop: Arc<dyn StopTrigger>,
    transcriber: Arc<dyn Transcriber>,
    replier: Arc<dyn ReplyGenerator>,
    synthesizer: Arc<dyn Synthesizer>,
    state: TurnState,
}

impl TurnRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        capture: CaptureEngine,
        playback: PlaybackEngine,
        stop: Arc<dyn StopTrigger>,
        transcriber: Arc<dyn Transcriber>,
        replier: Arc<dyn ReplyGenerator>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            config,
            capture: Arc::new(capture),
            playback: Arc::new(playback),
            stop,
            transcriber,
            replier,
            synthesizer,
            state: TurnState::Idle,
        }
    }

    /// Current stage of the turn (terminal after `run_turn` returns).
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Run one complete turn.
    ///
    /// On failure the turn moves to [`TurnState::Failed`], both transient
    /// artifacts are removed best-effort (removal failures are logged, never
    /// escalated over the original error), and the stage-tagged error is
    /// returned.
    pub async fn run_turn(&mut self) -> Result<TurnReport, TurnError> {
        let working_dir = self.config.working_dir();
        let capture_path = working_dir.join(CAPTURE_FILE);
        let reply_path = working_dir.join(REPLY_FILE);

        let result = self.drive(&capture_path, &reply_path).await;

        match &result {
            Ok(report) => {
                self.set_state(TurnState::Done);
                log::info!("turn complete ({} chunks played)", report.chunks_played);
            }
            Err(e) => {
                self.set_state(TurnState::Failed);
                log::error!("turn failed during {}: {e}", e.stage());
                remove_artifact(&capture_path);
                remove_artifact(&reply_path);
            }
        }
        result
    }

    async fn drive(
        &mut self,
        capture_path: &Path,
        reply_path: &Path,
    ) -> Result<TurnReport, TurnError> {
        let format = self.capture.format().to_owned();

        // ── Recording ────────────────────────────────────────────────────
        // One fresh signal per turn; the stop trigger is its only writer.
        self.set_state(TurnState::Recording);
        let cancel = CancelSignal::new();
        self.stop.arm(cancel.clone());

        let capture = Arc::clone(&self.capture);
        let capture_cancel = cancel.clone();
        let frames = tokio::task::spawn_blocking(move || capture.record(&capture_cancel))
            .await
            .map_err(|e| TurnError::Internal(e.to_string()))??;

        // Give the capture context a moment to settle before the file is
        // materialized.  Capture has already been joined, so this is a
        // cushion, not a correctness requirement.
        let grace = flush_grace(self.config.flush_grace_secs);
        if !grace.is_zero() {
            tokio::time::sleep(grace).await;
        }

        write_container(capture_path, &format, &frames)?;
        let wav = std::fs::read(capture_path).map_err(ContainerError::from)?;

        // ── Transcribing ─────────────────────────────────────────────────
        self.set_state(TurnState::Transcribing);
        let transcript_result = self.transcriber.transcribe(&wav).await;
        // The capture artifact is deleted right after the attempt, success
        // or failure; nothing downstream reads it again.
        remove_artifact(capture_path);
        let transcript = transcript_result?;

        // ── Generating ───────────────────────────────────────────────────
        self.set_state(TurnState::Generating);
        let reply = self.replier.generate(&transcript).await?;

        // ── Synthesizing ─────────────────────────────────────────────────
        self.set_state(TurnState::Synthesizing);
        let audio = self.synthesizer.synthesize(&reply).await?;
        std::fs::write(reply_path, &audio).map_err(TurnError::ReplyWrite)?;

        // ── Playing ──────────────────────────────────────────────────────
        self.set_state(TurnState::Playing);
        let playback = Arc::clone(&self.playback);
        let play_path: PathBuf = reply_path.to_path_buf();
        let play_result = tokio::task::spawn_blocking(move || playback.play(&play_path))
            .await
            .map_err(|e| TurnError::Internal(e.to_string()))?;
        // Deleted regardless of how playback went.
        remove_artifact(reply_path);
        let chunks_played = play_result?;

        Ok(TurnReport {
            transcript,
            reply,
            chunks_played,
        })
    }

    fn set_state(&mut self, state: TurnState) {
        log::debug!("turn: {} → {}", self.state.label(), state.label());
        self.state = state;
    }
}

/// Ceiling on the configured flush grace, in seconds.
const MAX_FLUSH_GRACE_SECS: f32 = 60.0;

/// Sanitize the configured flush grace into a sleepable duration.
///
/// The value comes straight from a TOML file, so it may be negative, NaN or
/// infinite; anything outside `0..=MAX_FLUSH_GRACE_SECS` is clamped and
/// non-finite values mean no grace at all.
fn flush_grace(secs: f32) -> Duration {
    if !secs.is_finite() {
        log::warn!("ignoring non-finite flush_grace_secs ({secs})");
        return Duration::ZERO;
    }
    Duration::from_secs_f32(secs.clamp(0.0, MAX_FLUSH_GRACE_SECS))
}

/// Best-effort artifact removal.  A missing file is fine; any other failure
/// is logged and never escalated so it cannot mask the stage error.
fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::debug!("removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("failed to remove {}: {e}", path.display()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
