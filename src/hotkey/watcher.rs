//! Dedicated OS-thread key watcher using `rdev::listen`.
//!
//! `rdev::listen` blocks forever and has no graceful shutdown API.  The
//! watcher therefore keeps a done flag: after the stop key has been observed
//! (or the handle is dropped) the callback discards every further event.
//! The OS thread itself stays parked inside the rdev event loop until the
//! process exits — it holds no resources that need explicit cleanup, and
//! this process runs exactly one turn per invocation.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::cancel::CancelSignal;

use super::observe_key;

// ---------------------------------------------------------------------------
// KeyWatcher
// ---------------------------------------------------------------------------

/// Handle to a running key watcher thread.
///
/// Construct with [`KeyWatcher::start`]; the watcher sets `signal` on the
/// first press of `stop_key` and then ignores everything else.
pub struct KeyWatcher {
    /// Set when the stop key has fired or the handle is dropped.
    done: Arc<AtomicBool>,
    /// Kept so the thread is not detached prematurely; never joined because
    /// `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl KeyWatcher {
    /// Spawn the watcher thread for one recording session.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn start(stop_key: rdev::Key, signal: CancelSignal) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let done_flag = Arc::clone(&done);

        let thread = std::thread::Builder::new()
            .name("key-watcher".into())
            .spawn(move || {
                let result = rdev::listen(move |event| {
                    if done_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    if observe_key(&event.event_type, stop_key, &signal) {
                        done_flag.store(true, Ordering::Relaxed);
                    }
                });

                if let Err(e) = result {
                    // Without a watcher the recording can only be stopped by
                    // interrupting the process; make that loud.
                    log::error!("key-watcher: rdev::listen failed: {e:?}");
                }
            })
            .expect("failed to spawn key-watcher thread");

        Self {
            done,
            _thread: thread,
        }
    }
}

impl Drop for KeyWatcher {
    /// Mute the callback so a lingering rdev thread cannot touch a signal
    /// from a finished turn.
    fn drop(&mut self) {
        self.done.store(true, Ordering::Relaxed);
    }
}
