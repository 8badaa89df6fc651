//! Microphone capture via `cpal`.
//!
//! [`CaptureEngine`] runs the recording loop: it opens an input stream for
//! the session's [`AudioFormat`], accumulates device buffers into exact
//! 1024-sample [`crate::audio::Frame`]s, and returns the finished
//! [`FrameBuffer`] as soon as the [`CancelSignal`] is observed.  The signal
//! is polled once per chunk and each device read waits at most one chunk's
//! duration, so stop latency is bounded by roughly
//! `CHUNK_SAMPLES / sample_rate_hz` seconds.
//!
//! The device is reached through the [`InputDevice`] / [`InputStream`] seam;
//! [`CpalInput`] is the production implementation and tests substitute
//! scripted streams.

use std::sync::mpsc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;
use thiserror::Error;

use crate::audio::format::AudioFormat;
use crate::audio::frame::{FrameBuffer, SampleChunker};
use crate::cancel::CancelSignal;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device supports no configuration matching {0}")]
    UnsupportedFormat(String),

    #[error("failed to query input configurations: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("input stream disconnected before the session was cancelled")]
    Disconnected,
}

// ---------------------------------------------------------------------------
// Device seam
// ---------------------------------------------------------------------------

/// An open input stream delivering interleaved `i16` sample batches.
///
/// Dropping the stream releases the device.  Streams are only ever used from
/// the single blocking thread that opened them, so there is no `Send` bound
/// (the cpal stream type is not `Send` on every platform).
pub trait InputStream {
    /// Read the next batch of samples, waiting at most `timeout`.
    ///
    /// `Ok(None)` means no data arrived in time; the caller re-checks the
    /// cancellation signal and tries again.
    fn read(&mut self, timeout: Duration) -> Result<Option<Vec<i16>>, CaptureError>;
}

/// Factory opening an [`InputStream`] for a given format.
pub trait InputDevice: Send + Sync {
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn InputStream>, CaptureError>;
}

// ---------------------------------------------------------------------------
// CpalInput
// ---------------------------------------------------------------------------

/// Production input device backed by the default cpal host.
///
/// The cpal callback runs on a dedicated audio thread; samples are converted
/// from `f32` to `i16` there and forwarded over an mpsc channel.  Send errors
/// are ignored so the audio thread never panics when the receiver is gone.
#[derive(Debug, Default)]
pub struct CpalInput;

struct CpalInputStream {
    rx: mpsc::Receiver<Vec<i16>>,
    // RAII guard: dropping the stream stops the hardware capture.
    _stream: cpal::Stream,
}

/// Whether a supported config range can carry this session's format.
///
/// The stream is built with an `f32` callback, so ranges offering any other
/// sample format must be skipped even when channels and rate match.
fn config_matches(range: &cpal::SupportedStreamConfigRange, format: &AudioFormat) -> bool {
    range.channels() == format.channels
        && range.sample_format() == cpal::SampleFormat::F32
        && range.min_sample_rate() <= SampleRate(format.sample_rate_hz)
        && range.max_sample_rate() >= SampleRate(format.sample_rate_hz)
}

impl InputDevice for CpalInput {
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn InputStream>, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device
            .supported_input_configs()?
            .find(|c| config_matches(c, format))
            .ok_or_else(|| CaptureError::UnsupportedFormat(format.to_string()))?;

        let config = supported
            .with_sample_rate(SampleRate(format.sample_rate_hz))
            .config();

        let (tx, rx) = mpsc::channel::<Vec<i16>>();

        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data
                    .iter()
                    .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
                    .collect();
                let _ = tx.send(samples);
            },
            |err: cpal::StreamError| {
                log::error!("cpal input stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        log::debug!(
            "input stream opened: {} (device: {})",
            format,
            device.name().unwrap_or_default()
        );

        Ok(Box::new(CpalInputStream { rx, _stream: stream }))
    }
}

impl InputStream for CpalInputStream {
    fn read(&mut self, timeout: Duration) -> Result<Option<Vec<i16>>, CaptureError> {
        match self.rx.recv_timeout(timeout) {
            Ok(samples) => Ok(Some(samples)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(CaptureError::Disconnected),
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureEngine
// ---------------------------------------------------------------------------

/// Owns the input device seam and runs the recording loop for one session.
pub struct CaptureEngine {
    device: Box<dyn InputDevice>,
    format: AudioFormat,
}

impl CaptureEngine {
    /// Capture engine for the default system microphone.
    pub fn new(format: AudioFormat) -> Self {
        Self {
            device: Box::new(CpalInput),
            format,
        }
    }

    /// Capture engine backed by an arbitrary device (used by tests).
    pub fn with_device(format: AudioFormat, device: Box<dyn InputDevice>) -> Self {
        Self { device, format }
    }

    /// The session's fixed format.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Record until `cancel` is observed, then return the accumulated frames.
    ///
    /// The device stream is released on every exit path.  No file is written
    /// here; the caller hands the buffer to the container writer.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] when the device cannot be opened or a read
    /// fails mid-session; no partial artifact exists in that case.
    pub fn record(&self, cancel: &CancelSignal) -> Result<FrameBuffer, CaptureError> {
        let mut stream = self.device.open(&self.format)?;
        let mut chunker = SampleChunker::new(&self.format);
        let mut frames = FrameBuffer::new();
        let timeout = self.format.chunk_duration();

        log::info!("recording ({})", self.format);

        // The signal is checked before every read, and the read itself waits
        // at most one chunk duration.
        while !cancel.is_cancelled() {
            if let Some(samples) = stream.read(timeout)? {
                for frame in chunker.push(&samples) {
                    frames.push(frame);
                }
            }
        }

        if chunker.pending_samples() > 0 {
            log::debug!(
                "discarding {} trailing samples below one chunk",
                chunker.pending_samples()
            );
        }

        log::info!(
            "recording stopped: {} frames ({:.2}s)",
            frames.frame_count(),
            frames.duration_secs(&self.format)
        );
        Ok(frames)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::format::CHUNK_SAMPLES;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Input device that replays a fixed script of sample batches, then
    /// cancels the paired signal once the script is exhausted.
    struct ScriptedInput {
        script: Mutex<VecDeque<Vec<i16>>>,
        cancel_when_done: CancelSignal,
    }

    impl ScriptedInput {
        fn new(batches: Vec<Vec<i16>>, cancel_when_done: CancelSignal) -> Self {
            Self {
                script: Mutex::new(batches.into()),
                cancel_when_done,
            }
        }
    }

    struct ScriptedStream {
        script: VecDeque<Vec<i16>>,
        cancel_when_done: CancelSignal,
    }

    impl InputStream for ScriptedStream {
        fn read(&mut self, timeout: Duration) -> Result<Option<Vec<i16>>, CaptureError> {
            match self.script.pop_front() {
                Some(batch) => Ok(Some(batch)),
                None => {
                    self.cancel_when_done.cancel();
                    std::thread::sleep(timeout);
                    Ok(None)
                }
            }
        }
    }

    impl InputDevice for ScriptedInput {
        fn open(&self, _format: &AudioFormat) -> Result<Box<dyn InputStream>, CaptureError> {
            Ok(Box::new(ScriptedStream {
                script: self.script.lock().unwrap().clone(),
                cancel_when_done: self.cancel_when_done.clone(),
            }))
        }
    }

    /// Device whose open always fails, for the error path.
    struct BrokenInput;

    impl InputDevice for BrokenInput {
        fn open(&self, _format: &AudioFormat) -> Result<Box<dyn InputStream>, CaptureError> {
            Err(CaptureError::NoDevice)
        }
    }

    fn chunk_of(value: i16, format: &AudioFormat) -> Vec<i16> {
        vec![value; format.chunk_len()]
    }

    #[test]
    fn records_exactly_the_scripted_frames() {
        let format = AudioFormat::capture_default();
        let cancel = CancelSignal::new();
        let device = ScriptedInput::new(
            vec![
                chunk_of(1, &format),
                chunk_of(2, &format),
                chunk_of(3, &format),
            ],
            cancel.clone(),
        );

        let engine = CaptureEngine::with_device(format, Box::new(device));
        let frames = engine.record(&cancel).unwrap();

        assert_eq!(frames.frame_count(), 3);
        assert_eq!(frames.payload_bytes(), 3 * format.frame_bytes());
    }

    #[test]
    fn partial_tail_below_one_chunk_is_discarded() {
        let format = AudioFormat::capture_default();
        let cancel = CancelSignal::new();
        // One and a half chunks: only the complete one survives.
        let device = ScriptedInput::new(
            vec![chunk_of(9, &format), vec![9; CHUNK_SAMPLES / 2]],
            cancel.clone(),
        );

        let engine = CaptureEngine::with_device(format, Box::new(device));
        let frames = engine.record(&cancel).unwrap();

        assert_eq!(frames.frame_count(), 1);
    }

    #[test]
    fn already_cancelled_signal_returns_immediately_with_no_frames() {
        let format = AudioFormat::capture_default();
        let cancel = CancelSignal::new();
        cancel.cancel();

        let device = ScriptedInput::new(vec![chunk_of(5, &format)], cancel.clone());
        let engine = CaptureEngine::with_device(format, Box::new(device));
        let frames = engine.record(&cancel).unwrap();

        assert!(frames.is_empty());
    }

    #[test]
    fn stop_latency_is_bounded_by_chunks_not_seconds() {
        let format = AudioFormat::capture_default();
        let cancel = CancelSignal::new();
        // Empty script paired with a signal nobody cancels: every read just
        // times out after one chunk duration.
        let device = ScriptedInput::new(Vec::new(), CancelSignal::new());
        let engine = CaptureEngine::with_device(format, Box::new(device));

        let canceller = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            canceller.cancel();
        });

        let start = Instant::now();
        let frames = engine.record(&cancel).unwrap();
        let elapsed = start.elapsed();
        handle.join().unwrap();

        assert!(frames.is_empty());
        // 30 ms until cancel plus a few chunk durations of slack — far below
        // the half-second that would indicate an unbounded wait.
        assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");
    }

    fn range(
        channels: u16,
        min_hz: u32,
        max_hz: u32,
        sample_format: cpal::SampleFormat,
    ) -> cpal::SupportedStreamConfigRange {
        cpal::SupportedStreamConfigRange::new(
            channels,
            SampleRate(min_hz),
            SampleRate(max_hz),
            cpal::SupportedBufferSize::Unknown,
            sample_format,
        )
    }

    #[test]
    fn config_match_requires_f32_sample_format() {
        let format = AudioFormat::capture_default();

        assert!(config_matches(
            &range(1, 8_000, 48_000, cpal::SampleFormat::F32),
            &format
        ));
        // Same channels and rate, but an i16-only range: the f32 stream
        // build would reject it, so the match must too.
        assert!(!config_matches(
            &range(1, 8_000, 48_000, cpal::SampleFormat::I16),
            &format
        ));
    }

    #[test]
    fn config_match_requires_rate_and_channels() {
        let format = AudioFormat::capture_default();

        assert!(!config_matches(
            &range(2, 8_000, 48_000, cpal::SampleFormat::F32),
            &format
        ));
        assert!(!config_matches(
            &range(1, 8_000, 16_000, cpal::SampleFormat::F32),
            &format
        ));
    }

    #[test]
    fn device_open_failure_surfaces_as_capture_error() {
        let format = AudioFormat::capture_default();
        let engine = CaptureEngine::with_device(format, Box::new(BrokenInput));

        match engine.record(&CancelSignal::new()) {
            Err(CaptureError::NoDevice) => {}
            other => panic!("expected NoDevice, got {other:?}"),
        }
    }
}
