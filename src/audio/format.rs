//! PCM format description shared by capture, container and playback.
//!
//! One [`AudioFormat`] is fixed for the lifetime of a recording or playback
//! session: the capture engine records it, the container writer persists it,
//! and the playback engine renders exactly what the container declares.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Number of samples (per channel) in one frame/chunk.
///
/// Capture reads and playback writes are both bounded by this size, which
/// bounds stop latency to one chunk's duration.
pub const CHUNK_SAMPLES: usize = 1024;

// ---------------------------------------------------------------------------
// AudioFormat
// ---------------------------------------------------------------------------

/// Fixed PCM layout of one audio session.
///
/// All fields are positive; the crate only ever records and plays 16-bit
/// little-endian integer samples (`sample_width_bytes == 2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Number of interleaved channels (1 = mono).
    pub channels: u16,
    /// Bytes per sample (2 for 16-bit PCM).
    pub sample_width_bytes: u16,
    /// Sample rate in Hz.
    pub sample_rate_hz: u32,
}

impl AudioFormat {
    /// Capture-side format: mono, 16-bit, 44.1 kHz.
    pub fn capture_default() -> Self {
        Self {
            channels: 1,
            sample_width_bytes: 2,
            sample_rate_hz: 44_100,
        }
    }

    /// Synthesis-side format: mono, 16-bit LINEAR PCM at 16 kHz.
    pub fn synthesis_default() -> Self {
        Self {
            channels: 1,
            sample_width_bytes: 2,
            sample_rate_hz: 16_000,
        }
    }

    /// Number of interleaved samples in one chunk across all channels.
    pub fn chunk_len(&self) -> usize {
        CHUNK_SAMPLES * self.channels as usize
    }

    /// Byte length of one frame: `CHUNK_SAMPLES × width × channels`.
    pub fn frame_bytes(&self) -> usize {
        CHUNK_SAMPLES * self.sample_width_bytes as usize * self.channels as usize
    }

    /// Wall-clock duration of one chunk at this sample rate.
    ///
    /// This is the capture loop's poll interval, so it also bounds the stop
    /// latency after the cancellation signal is set.
    pub fn chunk_duration(&self) -> Duration {
        Duration::from_secs_f64(CHUNK_SAMPLES as f64 / f64::from(self.sample_rate_hz))
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::capture_default()
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ch, {}-bit, {} Hz",
            self.channels,
            self.sample_width_bytes * 8,
            self.sample_rate_hz
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
