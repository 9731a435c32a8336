//! WAV persistence and PCM sample helpers.
//!
//! Recordings are written through `hound`, which fills the RIFF/data
//! size fields in the header when the writer is finalized — i.e. after
//! capture ends, not while streaming.

use crate::defaults;
use crate::error::{Result, VoiqError};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// WAV writer type used by the recorder.
pub type RecordingWriter = hound::WavWriter<BufWriter<File>>;

/// WAV spec for query recordings (mono 16-bit PCM).
pub fn recording_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: defaults::CHANNELS,
        sample_rate,
        bits_per_sample: defaults::BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Open a WAV writer at `path`.
///
/// Failing to open the sink is fatal to starting a recording; write
/// errors afterwards are not.
pub fn create_recording(path: &Path, sample_rate: u32) -> Result<RecordingWriter> {
    hound::WavWriter::create(path, recording_spec(sample_rate)).map_err(|e| {
        VoiqError::Recording {
            message: format!("failed to create {}: {}", path.display(), e),
        }
    })
}

/// Append a block of samples to an open recording.
pub fn append_samples(writer: &mut RecordingWriter, samples: &[i16]) -> Result<()> {
    for sample in samples {
        writer
            .write_sample(*sample)
            .map_err(|e| VoiqError::Recording {
                message: e.to_string(),
            })?;
    }
    Ok(())
}

/// Convert little-endian PCM bytes to i16 samples.
///
/// A trailing odd byte is ignored.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Convert i16 samples to little-endian PCM bytes.
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Root-mean-square amplitude of a block of samples, rounded to the
/// nearest integer. An empty block yields 0.
pub fn rms_amplitude(samples: &[i16]) -> i32 {
    if samples.is_empty() {
        return 0;
    }
    let sum_sq: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt().round() as i32
}
