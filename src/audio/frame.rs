//! Frames and the append-only frame buffer.
//!
//! A [`Frame`] is one fixed-size chunk of raw PCM bytes as recorded from the
//! device; it is never mutated after creation.  The [`FrameBuffer`] collects
//! frames in temporal order while a recording session is active and is handed
//! over whole to the container writer when capture stops.
//!
//! [`SampleChunker`] sits between the device callback (which delivers
//! arbitrarily sized buffers) and the frame buffer, regrouping samples into
//! exact [`CHUNK_SAMPLES`]-sized frames.

use crate::audio::format::{AudioFormat, CHUNK_SAMPLES};

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One immutable chunk of raw little-endian 16-bit PCM bytes.
///
/// Length is always `CHUNK_SAMPLES × sample_width_bytes × channels` for the
/// session's [`AudioFormat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Build a frame from interleaved `i16` samples.
    pub fn from_samples(samples: &[i16]) -> Self {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for &s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        Self { bytes }
    }

    /// Raw PCM payload of this frame.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte length of the frame payload.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a zero-length frame (never produced by capture).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the payload back into interleaved `i16` samples.
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }
}

// ---------------------------------------------------------------------------
// FrameBuffer
// ---------------------------------------------------------------------------

/// Append-only ordered sequence of [`Frame`]s.
///
/// Insertion order equals temporal recording order.  The buffer is owned
/// exclusively by the capture loop while recording; once capture returns it
/// is read-only and consumed by the container writer.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: Vec<Frame>,
}

impl FrameBuffer {
    /// Create an empty buffer for a new recording session.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Append a frame.  Frames are never reordered or dropped.
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Number of frames recorded so far.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total payload size in bytes across all frames.
    pub fn payload_bytes(&self) -> usize {
        self.frames.iter().map(Frame::len).sum()
    }

    /// Returns `true` when no frames have been recorded.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Iterate frames in recording order.
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Recording duration in seconds for the given format.
    pub fn duration_secs(&self, format: &AudioFormat) -> f64 {
        (self.frame_count() * CHUNK_SAMPLES) as f64 / f64::from(format.sample_rate_hz)
    }
}

impl<'a> IntoIterator for &'a FrameBuffer {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

// ---------------------------------------------------------------------------
// SampleChunker
// ---------------------------------------------------------------------------

/// Regroups arbitrarily sized device buffers into exact frames.
///
/// The device callback delivers whatever buffer size the platform chose;
/// `push` accumulates those samples and emits complete frames of
/// `CHUNK_SAMPLES × channels` samples.  Any trailing partial chunk left when
/// recording stops is discarded — at most one chunk's worth of tail audio,
/// inside the stop-latency bound the capture loop already allows.
#[derive(Debug)]
pub struct SampleChunker {
    chunk_len: usize,
    pending: Vec<i16>,
}

impl SampleChunker {
    /// Create a chunker emitting frames of `format.chunk_len()` samples.
    pub fn new(format: &AudioFormat) -> Self {
        Self {
            chunk_len: format.chunk_len(),
            pending: Vec::with_capacity(format.chunk_len()),
        }
    }

    /// Feed device samples in; get zero or more complete frames out.
    pub fn push(&mut self, samples: &[i16]) -> Vec<Frame> {
        self.pending.extend_from_slice(samples);

        let mut frames = Vec::new();
        while self.pending.len() >= self.chunk_len {
            let rest = self.pending.split_off(self.chunk_len);
            frames.push(Frame::from_samples(&self.pending));
            self.pending = rest;
        }
        frames
    }

    /// Number of samples currently buffered below one full frame.
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
