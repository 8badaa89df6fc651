//! Container playback to the output device.
//!
//! [`PlaybackEngine::play`] opens a WAV container, opens an output sink
//! matching the container's declared [`AudioFormat`], streams the payload in
//! 1024-sample chunks (the same chunk discipline as capture), waits for the
//! device to drain, and reports how many chunks were written.  The call
//! blocks until playback completes or the device fails.
//!
//! The device is reached through the [`OutputDevice`] / [`OutputSink`] seam;
//! [`CpalOutput`] is the production implementation and tests substitute
//! recording sinks.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;
use thiserror::Error;

use crate::audio::container::{read_container, ContainerError};
use crate::audio::format::AudioFormat;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors that can occur while rendering a container to the output device.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no output device found on the default audio host")]
    NoDevice,

    #[error("output device supports no configuration matching {0}")]
    UnsupportedFormat(String),

    #[error("failed to query output configurations: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The container could not be read or is not PCM this engine can render.
    #[error("unreadable container: {0}")]
    Container(#[from] ContainerError),
}

// ---------------------------------------------------------------------------
// Device seam
// ---------------------------------------------------------------------------

/// An open output sink accepting interleaved `i16` sample chunks.
///
/// Dropping the sink releases the device.  Like the capture side, sinks stay
/// on the blocking thread that opened them, so there is no `Send` bound.
pub trait OutputSink {
    /// Queue one chunk for the device.  May block briefly to keep the amount
    /// of in-flight audio bounded.
    fn write(&mut self, chunk: &[i16]) -> Result<(), PlaybackError>;

    /// Block until everything written so far has reached the device.
    fn drain(&mut self) -> Result<(), PlaybackError>;
}

/// Factory opening an [`OutputSink`] for a given format.
pub trait OutputDevice: Send + Sync {
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn OutputSink>, PlaybackError>;
}

// ---------------------------------------------------------------------------
// CpalOutput
// ---------------------------------------------------------------------------

/// Production output device backed by the default cpal host.
///
/// Samples go into a shared queue consumed by the cpal callback; the queue is
/// kept a few chunks deep so `write` applies back-pressure and `drain` only
/// returns once the callback has consumed everything.
#[derive(Debug, Default)]
pub struct CpalOutput;

/// In-flight bound, in chunks.  Keeps memory flat and stop latency low while
/// still giving the callback enough headroom to avoid underruns.
const MAX_QUEUED_CHUNKS: usize = 4;

struct CpalOutputSink {
    queue: Arc<Mutex<VecDeque<i16>>>,
    chunk_len: usize,
    poll: Duration,
    // RAII guard: dropping the stream stops the hardware playback.
    _stream: cpal::Stream,
}

/// Whether a supported config range can carry the container's format.
///
/// Mirrors the capture-side check: the stream is built with an `f32`
/// callback, so ranges offering any other sample format are skipped.
fn config_matches(range: &cpal::SupportedStreamConfigRange, format: &AudioFormat) -> bool {
    range.channels() == format.channels
        && range.sample_format() == cpal::SampleFormat::F32
        && range.min_sample_rate() <= SampleRate(format.sample_rate_hz)
        && range.max_sample_rate() >= SampleRate(format.sample_rate_hz)
}

impl OutputDevice for CpalOutput {
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn OutputSink>, PlaybackError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(PlaybackError::NoDevice)?;

        let supported = device
            .supported_output_configs()?
            .find(|c| config_matches(c, format))
            .ok_or_else(|| PlaybackError::UnsupportedFormat(format.to_string()))?;

        let config = supported
            .with_sample_rate(SampleRate(format.sample_rate_hz))
            .config();

        let queue: Arc<Mutex<VecDeque<i16>>> = Arc::new(Mutex::new(VecDeque::new()));
        let callback_queue = Arc::clone(&queue);

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut queue = callback_queue.lock().unwrap();
                for out in data.iter_mut() {
                    *out = match queue.pop_front() {
                        Some(sample) => f32::from(sample) / 32768.0,
                        None => 0.0,
                    };
                }
            },
            |err: cpal::StreamError| {
                log::error!("cpal output stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        log::debug!(
            "output stream opened: {} (device: {})",
            format,
            device.name().unwrap_or_default()
        );

        Ok(Box::new(CpalOutputSink {
            queue,
            chunk_len: format.chunk_len(),
            poll: format.chunk_duration() / 2,
            _stream: stream,
        }))
    }
}

impl OutputSink for CpalOutputSink {
    fn write(&mut self, chunk: &[i16]) -> Result<(), PlaybackError> {
        // Back-pressure: wait until the callback has eaten down the queue.
        loop {
            let queued = self.queue.lock().unwrap().len();
            if queued <= self.chunk_len * MAX_QUEUED_CHUNKS {
                break;
            }
            std::thread::sleep(self.poll);
        }
        self.queue.lock().unwrap().extend(chunk.iter().copied());
        Ok(())
    }

    fn drain(&mut self) -> Result<(), PlaybackError> {
        while !self.queue.lock().unwrap().is_empty() {
            std::thread::sleep(self.poll);
        }
        // One extra poll so the final callback buffer actually reaches the
        // hardware before the stream is dropped.
        std::thread::sleep(self.poll);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PlaybackEngine
// ---------------------------------------------------------------------------

/// Owns the output device seam and streams one container per call.
pub struct PlaybackEngine {
    device: Box<dyn OutputDevice>,
}

impl PlaybackEngine {
    /// Playback engine for the default system output device.
    pub fn new() -> Self {
        Self {
            device: Box::new(CpalOutput),
        }
    }

    /// Playback engine backed by an arbitrary device (used by tests).
    pub fn with_device(device: Box<dyn OutputDevice>) -> Self {
        Self { device }
    }

    /// Play the container at `path` to completion.
    ///
    /// Opens the output stream in the container's own format, writes the
    /// payload in bounded chunks and blocks until the device has drained.
    /// Returns the number of chunks written.  The sink (and with it the
    /// device) is released before returning, on error paths included.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError`] for unreadable containers and device
    /// failures; there is no retry.
    pub fn play(&self, path: &Path) -> Result<u64, PlaybackError> {
        let (format, samples) = read_container(path)?;
        log::info!(
            "playing {} ({}, {} samples)",
            path.display(),
            format,
            samples.len()
        );

        let mut sink = self.device.open(&format)?;

        let mut chunks_written = 0_u64;
        for chunk in samples.chunks(format.chunk_len()) {
            sink.write(chunk)?;
            chunks_written += 1;
        }
        sink.drain()?;

        log::info!("playback complete: {chunks_written} chunks");
        Ok(chunks_written)
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::container::write_container;
    use crate::audio::frame::{Frame, FrameBuffer};

    /// Records everything written to it so tests can assert chunk counts,
    /// ordering and drain discipline.
    #[derive(Default)]
    struct RecordingSinkState {
        written: Vec<Vec<i16>>,
        drained: bool,
        opened_with: Option<AudioFormat>,
    }

    #[derive(Default)]
    struct RecordingOutput {
        state: Arc<Mutex<RecordingSinkState>>,
    }

    struct RecordingSink {
        state: Arc<Mutex<RecordingSinkState>>,
    }

    impl OutputDevice for RecordingOutput {
        fn open(&self, format: &AudioFormat) -> Result<Box<dyn OutputSink>, PlaybackError> {
            self.state.lock().unwrap().opened_with = Some(*format);
            Ok(Box::new(RecordingSink {
                state: Arc::clone(&self.state),
            }))
        }
    }

    impl OutputSink for RecordingSink {
        fn write(&mut self, chunk: &[i16]) -> Result<(), PlaybackError> {
            let mut state = self.state.lock().unwrap();
            assert!(!state.drained, "write after drain");
            state.written.push(chunk.to_vec());
            Ok(())
        }

        fn drain(&mut self) -> Result<(), PlaybackError> {
            self.state.lock().unwrap().drained = true;
            Ok(())
        }
    }

    fn write_silence_container(path: &Path, format: &AudioFormat, frames: usize) {
        let mut buf = FrameBuffer::new();
        for _ in 0..frames {
            buf.push(Frame::from_samples(&vec![0_i16; format.chunk_len()]));
        }
        write_container(path, format, &buf).unwrap();
    }

    #[test]
    fn plays_exactly_one_chunk_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reply.wav");
        let format = AudioFormat::synthesis_default();
        write_silence_container(&path, &format, 2);

        let output = RecordingOutput::default();
        let state = Arc::clone(&output.state);
        let engine = PlaybackEngine::with_device(Box::new(output));

        let chunks = engine.play(&path).unwrap();

        assert_eq!(chunks, 2);
        let state = state.lock().unwrap();
        assert_eq!(state.written.len(), 2);
        assert!(state.written.iter().all(|c| c.len() == format.chunk_len()));
        assert!(state.drained);
    }

    #[test]
    fn sink_is_opened_with_the_containers_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reply.wav");
        let format = AudioFormat::synthesis_default();
        write_silence_container(&path, &format, 1);

        let output = RecordingOutput::default();
        let state = Arc::clone(&output.state);
        let engine = PlaybackEngine::with_device(Box::new(output));
        engine.play(&path).unwrap();

        assert_eq!(state.lock().unwrap().opened_with, Some(format));
    }

    #[test]
    fn payload_reaches_the_sink_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let format = AudioFormat::synthesis_default();

        let mut buf = FrameBuffer::new();
        buf.push(Frame::from_samples(&vec![100_i16; format.chunk_len()]));
        buf.push(Frame::from_samples(&vec![-100_i16; format.chunk_len()]));
        write_container(&path, &format, &buf).unwrap();

        let output = RecordingOutput::default();
        let state = Arc::clone(&output.state);
        let engine = PlaybackEngine::with_device(Box::new(output));
        engine.play(&path).unwrap();

        let state = state.lock().unwrap();
        assert!(state.written[0].iter().all(|&s| s == 100));
        assert!(state.written[1].iter().all(|&s| s == -100));
    }

    #[test]
    fn config_match_requires_f32_sample_format() {
        let format = AudioFormat::synthesis_default();
        let range = |sample_format| {
            cpal::SupportedStreamConfigRange::new(
                1,
                SampleRate(8_000),
                SampleRate(48_000),
                cpal::SupportedBufferSize::Unknown,
                sample_format,
            )
        };

        assert!(config_matches(&range(cpal::SampleFormat::F32), &format));
        assert!(!config_matches(&range(cpal::SampleFormat::I16), &format));
    }

    #[test]
    fn missing_container_is_a_playback_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = PlaybackEngine::with_device(Box::new(RecordingOutput::default()));

        match engine.play(&dir.path().join("nope.wav")) {
            Err(PlaybackError::Container(_)) => {}
            other => panic!("expected Container error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_container_never_opens_the_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let output = RecordingOutput::default();
        let state = Arc::clone(&output.state);
        let engine = PlaybackEngine::with_device(Box::new(output));

        assert!(engine.play(&path).is_err());
        assert!(state.lock().unwrap().opened_with.is_none());
    }
}
