//! voiceturn — a single-turn voice interaction pipeline.
//!
//! One turn: record the microphone until the stop key is pressed, send the
//! capture to a speech-to-text service, feed the transcript to a language
//! model, synthesize the reply to speech and play it back.  The two WAV files
//! produced along the way live only for the duration of the turn.
//!
//! The [`pipeline::TurnRunner`] ties everything together; each subsystem is
//! usable on its own:
//!
//! - [`audio`] — capture, chunked frames, WAV container I/O, playback
//! - [`cancel`] — the one-shot signal that stops a recording
//! - [`hotkey`] — OS-level key watcher that fires the signal
//! - [`stt`], [`llm`], [`tts`] — the three remote collaborators
//! - [`config`] — TOML settings and platform paths

pub mod audio;
pub mod cancel;
pub mod config;
pub mod hotkey;
pub mod llm;
pub mod pipeline;
pub mod stt;
pub mod tts;
