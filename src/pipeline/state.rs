//! Turn state machine.
//!
//! [`TurnState`] tracks which stage of the voice turn is executing.  The
//! runner moves through the states strictly in order; `Failed` is reachable
//! from every non-idle state and is terminal, as is `Done`.

// ---------------------------------------------------------------------------
// TurnState
// ---------------------------------------------------------------------------

/// States of one voice-interaction turn.
///
/// ```text
/// Idle ──confirm──▶ Recording ──stop key──▶ Transcribing ──▶ Generating
///                                            ──▶ Synthesizing ──▶ Playing ──▶ Done
/// any non-idle state ──error──▶ Failed   (terminal, no retry)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for the operator to confirm the start of a recording.
    Idle,

    /// Microphone is active; frames accumulate until the stop key fires.
    Recording,

    /// The capture container is with the speech-to-text collaborator.
    Transcribing,

    /// The transcript is with the reply-generation collaborator.
    Generating,

    /// The reply text is with the speech-synthesis collaborator.
    Synthesizing,

    /// The synthesized container is streaming to the output device.
    Playing,

    /// Playback finished; both transient artifacts are gone.
    Done,

    /// A stage failed.  The turn is over; artifacts were cleaned up
    /// best-effort and the error was reported upward.
    Failed,
}

impl TurnState {
    /// Returns `true` while the turn is actively processing audio or text.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TurnState::Recording
                | TurnState::Transcribing
                | TurnState::Generating
                | TurnState::Synthesizing
                | TurnState::Playing
        )
    }

    /// Returns `true` for the two end states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Done | TurnState::Failed)
    }

    /// A short human-readable label for console output and logs.
    pub fn label(&self) -> &'static str {
        match self {
            TurnState::Idle => "Idle",
            TurnState::Recording => "Recording",
            TurnState::Transcribing => "Transcribing",
            TurnState::Generating => "Generating",
            TurnState::Synthesizing => "Synthesizing",
            TurnState::Playing => "Playing",
            TurnState::Done => "Done",
            TurnState::Failed => "Failed",
        }
    }
}

impl Default for TurnState {
    fn default() -> Self {
        TurnState::Idle
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
