//! Per-turn cancellation signal.
//!
//! The capture loop and the key watcher run on separate execution contexts
//! and coordinate through a single [`CancelSignal`]: the watcher is the only
//! writer, the capture loop a reader.  The flag is monotonic — once set it
//! stays set for the lifetime of the turn, and a fresh signal is created for
//! every turn so sessions can never interfere with each other.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

// ---------------------------------------------------------------------------
// CancelSignal
// ---------------------------------------------------------------------------

/// Monotonic stop flag shared between concurrent capture and watch loops.
///
/// Cloning is cheap (`Arc` clone); all clones observe the same flag.
///
/// ```
/// use voiceturn::cancel::CancelSignal;
///
/// let signal = CancelSignal::new();
/// assert!(!signal.is_cancelled());
/// assert!(signal.cancel());      // first call performs the transition
/// assert!(!signal.cancel());     // setting twice is equivalent to once
/// assert!(signal.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSignal {
    /// Create a fresh, unset signal for one recording session.
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the signal.
    ///
    /// Returns `true` only for the call that performed the false → true
    /// transition; repeated calls are no-ops and return `false`.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    /// Whether the signal has been set.
    ///
    /// Cheap enough to poll once per audio chunk.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
