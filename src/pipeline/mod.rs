//! Single-turn voice pipeline.
//!
//! [`TurnRunner`] orchestrates one interaction: record the operator until the
//! stop key fires, transcribe the capture, generate a reply, synthesize it to
//! speech and play it back, deleting each transient WAV as soon as its
//! consumer is done with it.  [`TurnState`] names the stage currently
//! executing and [`TurnError`] names the stage that failed.

pub mod runner;
pub mod state;

pub use runner::{
    KeyStop, StopTrigger, TurnError, TurnReport, TurnRunner, CAPTURE_FILE, REPLY_FILE,
};
pub use state::TurnState;
