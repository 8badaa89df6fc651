//! Audio subsystem — capture, frames, container I/O and playback.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → CaptureEngine → SampleChunker → FrameBuffer
//!           → write_container → capture.wav
//!
//! reply.wav → read_container → PlaybackEngine → speakers
//! ```
//!
//! One [`AudioFormat`] is fixed per session and shared by every stage; the
//! capture and playback loops both move audio in [`format::CHUNK_SAMPLES`]
//! sample chunks so stop latency and in-flight memory stay bounded.

pub mod capture;
pub mod container;
pub mod format;
pub mod frame;
pub mod playback;

pub use capture::{CaptureEngine, CaptureError, CpalInput, InputDevice, InputStream};
pub use container::{read_container, write_container, ContainerError, WAV_HEADER_BYTES};
pub use format::{AudioFormat, CHUNK_SAMPLES};
pub use frame::{Frame, FrameBuffer, SampleChunker};
pub use playback::{CpalOutput, OutputDevice, OutputSink, PlaybackEngine, PlaybackError};
