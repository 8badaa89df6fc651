//! Key watcher for stopping a recording, backed by `rdev`.
//!
//! # Design
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while the
//! process is alive, so it runs on a dedicated OS thread spawned by
//! [`KeyWatcher::start`].  The watcher observes every key event, and on the
//! first press of the designated stop key it sets the turn's
//! [`CancelSignal`] and mutes itself; all other keys, key releases and
//! malformed events are silently ignored.
//!
//! The watcher and the capture loop share nothing but the signal — the
//! capture loop polls it once per chunk while the watcher sets it once.
//!
//! [`observe_key`] is the pure decision function the watcher thread calls
//! for every event; tests drive it directly without touching the OS.

pub mod watcher;

pub use watcher::KeyWatcher;

use crate::cancel::CancelSignal;

/// Default stop key when the configured name cannot be parsed.
pub const DEFAULT_STOP_KEY: rdev::Key = rdev::Key::KeyQ;

// ---------------------------------------------------------------------------
// observe_key
// ---------------------------------------------------------------------------

/// Handle one observed key event.
///
/// Sets `signal` when `event` is a press of `stop_key` and returns `true` so
/// the watcher loop knows it is done.  Everything else — other keys, key
/// releases, mouse events — returns `false` without touching the signal.
/// Setting an already-set signal is a no-op, so duplicate presses are
/// harmless.
pub fn observe_key(event: &rdev::EventType, stop_key: rdev::Key, signal: &CancelSignal) -> bool {
    match event {
        rdev::EventType::KeyPress(key) if *key == stop_key => {
            if signal.cancel() {
                log::info!("stop key observed — cancelling recording");
            }
            true
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// parse_stop_key
// ---------------------------------------------------------------------------

/// Parse a configured stop-key name into an [`rdev::Key`].
///
/// Accepts a single ASCII letter (case-insensitive) or a few named keys.
/// Returns `None` for anything unrecognised so the caller can fall back to
/// [`DEFAULT_STOP_KEY`].
pub fn parse_stop_key(name: &str) -> Option<rdev::Key> {
    use rdev::Key::*;

    let name = name.trim();
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return match c.to_ascii_lowercase() {
            'a' => Some(KeyA),
            'b' => Some(KeyB),
            'c' => Some(KeyC),
            'd' => Some(KeyD),
            'e' => Some(KeyE),
            'f' => Some(KeyF),
            'g' => Some(KeyG),
            'h' => Some(KeyH),
            'i' => Some(KeyI),
            'j' => Some(KeyJ),
            'k' => Some(KeyK),
            'l' => Some(KeyL),
            'm' => Some(KeyM),
            'n' => Some(KeyN),
            'o' => Some(KeyO),
            'p' => Some(KeyP),
            'q' => Some(KeyQ),
            'r' => Some(KeyR),
            's' => Some(KeyS),
            't' => Some(KeyT),
            'u' => Some(KeyU),
            'v' => Some(KeyV),
            'w' => Some(KeyW),
            'x' => Some(KeyX),
            'y' => Some(KeyY),
            'z' => Some(KeyZ),
            _ => None,
        };
    }

    match name {
        "Escape" | "Esc" => Some(Escape),
        "Space" => Some(Space),
        "Return" | "Enter" => Some(Return),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
