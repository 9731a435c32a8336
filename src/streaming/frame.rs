//! Frame types for the streaming pipeline.
//!
//! Defines the data that flows from the recorder through the chunker to
//! the recognition transport.

/// One fixed-size capture read: raw PCM bytes plus the frame's RMS
/// amplitude.
///
/// Immutable once created. The amplitude feeds the level display; the
/// bytes feed the recognition stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Sequence number for ordering and diagnostics.
    pub sequence: u64,
    /// Little-endian 16-bit PCM bytes.
    pub bytes: Vec<u8>,
    /// Root-mean-square amplitude of the frame's samples.
    pub amplitude: i32,
}

impl AudioFrame {
    /// Creates a new audio frame.
    pub fn new(sequence: u64, bytes: Vec<u8>, amplitude: i32) -> Self {
        Self {
            sequence,
            bytes,
            amplitude,
        }
    }

    /// Returns the duration of this frame in milliseconds.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        ((self.bytes.len() / 2) as u32 * 1000) / sample_rate
    }
}

/// Concatenate the byte payloads of a chunk of frames in arrival order.
///
/// Amplitudes are discarded here; only the PCM payload travels to the
/// recognizer.
pub fn chunk_payload(frames: &[AudioFrame]) -> Vec<u8> {
    let total: usize = frames.iter().map(|f| f.bytes.len()).sum();
    let mut payload = Vec::with_capacity(total);
    for frame in frames {
        payload.extend_from_slice(&frame.bytes);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_frame_creation() {
        let frame = AudioFrame::new(42, vec![1, 2, 3, 4], 7);
        assert_eq!(frame.sequence, 42);
        assert_eq!(frame.bytes, vec![1, 2, 3, 4]);
        assert_eq!(frame.amplitude, 7);
    }

    #[test]
    fn test_audio_frame_duration() {
        // 32000 bytes = 16000 samples = 1 second at 16 kHz
        let frame = AudioFrame::new(0, vec![0u8; 32000], 0);
        assert_eq!(frame.duration_ms(16000), 1000);
    }

    #[test]
    fn test_chunk_payload_concatenates_in_order() {
        let frames = vec![
            AudioFrame::new(0, vec![1, 2], 10),
            AudioFrame::new(1, vec![3, 4], 20),
            AudioFrame::new(2, vec![5], 30),
        ];
        assert_eq!(chunk_payload(&frames), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_chunk_payload_empty() {
        assert!(chunk_payload(&[]).is_empty());
    }
}
