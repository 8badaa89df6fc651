//! WAV container serialization for completed recordings.
//!
//! [`write_container`] persists a [`FrameBuffer`] plus its [`AudioFormat`]
//! as a standard PCM WAV file.  The write goes to a sibling temp path and is
//! atomically renamed into place, so a disk failure never leaves a readable
//! partial file at the target path.  [`read_container`] is the inverse used
//! by the playback engine.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::audio::format::AudioFormat;
use crate::audio::frame::FrameBuffer;

/// Byte size of the canonical PCM WAV header `hound` emits.
pub const WAV_HEADER_BYTES: u64 = 44;

// ---------------------------------------------------------------------------
// ContainerError
// ---------------------------------------------------------------------------

/// Errors from reading or writing audio containers.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("WAV encode/decode failed: {0}")]
    Codec(#[from] hound::Error),

    #[error("container I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The container exists but does not hold 16-bit integer PCM.
    #[error("unsupported container layout: {0}")]
    UnsupportedLayout(String),
}

// ---------------------------------------------------------------------------
// write_container
// ---------------------------------------------------------------------------

/// Serialize all frames in order, together with the format metadata, into a
/// PCM WAV file at `path`.
///
/// The file is fully flushed and closed before this function returns, so the
/// caller may hand `path` straight to the next pipeline stage.
///
/// # Errors
///
/// Returns [`ContainerError`] on encode or disk failure.  The temp file is
/// removed on failure and `path` is left untouched.
pub fn write_container(
    path: &Path,
    format: &AudioFormat,
    frames: &FrameBuffer,
) -> Result<(), ContainerError> {
    let tmp = temp_sibling(path);

    let result = write_frames(&tmp, format, frames);
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path)?;
    log::debug!(
        "container written: {} ({} frames, {} payload bytes)",
        path.display(),
        frames.frame_count(),
        frames.payload_bytes()
    );
    Ok(())
}

fn write_frames(path: &Path, format: &AudioFormat, frames: &FrameBuffer) -> Result<(), ContainerError> {
    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate_hz,
        bits_per_sample: format.sample_width_bytes * 8,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for frame in frames {
        for sample in frame.samples() {
            writer.write_sample(sample)?;
        }
    }
    // finalize patches the header sizes and flushes to disk.
    writer.finalize()?;
    Ok(())
}

fn temp_sibling(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// read_container
// ---------------------------------------------------------------------------

/// Read a PCM WAV container: format metadata plus the full sample payload.
///
/// # Errors
///
/// Returns [`ContainerError::UnsupportedLayout`] when the file is not 16-bit
/// integer PCM, or [`ContainerError::Codec`] when it is malformed.
pub fn read_container(path: &Path) -> Result<(AudioFormat, Vec<i16>), ContainerError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(ContainerError::UnsupportedLayout(format!(
            "expected 16-bit integer PCM, found {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let format = AudioFormat {
        channels: spec.channels,
        sample_width_bytes: spec.bits_per_sample / 8,
        sample_rate_hz: spec.sample_rate,
    };

    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()?;

    Ok((format, samples))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
