//! Default configuration constants for voiq.
//!
//! Central location for all magic numbers and default values.

/// Audio sample rate in Hz.
///
/// The recognizer expects 16 kHz mono 16-bit PCM; the recorder captures
/// at this rate directly.
pub const SAMPLE_RATE: u32 = 16000;

/// Number of audio channels (mono).
pub const CHANNELS: u16 = 1;

/// Bits per PCM sample.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Samples per capture read (100 ms at 16 kHz).
pub const FRAME_SAMPLES: usize = 1600;

/// Frames accumulated before a size-based chunk flush.
pub const CHUNK_MAX_FRAMES: usize = 10;

/// Inactivity timeout before a partial chunk is flushed, in milliseconds.
pub const CHUNK_FLUSH_INTERVAL_MS: u64 = 1000;

/// Hard cap on the length of a single voice query, in seconds.
pub const MAX_QUERY_SECS: u64 = 10;

/// Idle timeout on inbound recognition results, in seconds.
///
/// When the recognizer sends nothing for this long the stream is treated
/// as complete, not failed.
pub const RESULT_IDLE_TIMEOUT_SECS: u64 = 20;

/// Recent amplitudes retained for the level display.
pub const AMPLITUDE_WINDOW: usize = 400;

/// Bounded retry attempts for backend submissions.
pub const SUBMIT_RETRY_ATTEMPTS: u32 = 3;

/// Initial backoff between submission retries, in milliseconds. Doubles
/// per attempt.
pub const SUBMIT_RETRY_BASE_MS: u64 = 500;

/// Default recognition model identifier sent in the stream config frame.
pub const DEFAULT_MODEL: &str = "photo-query";

/// Default recognition stream endpoint.
pub const DEFAULT_ASR_URL: &str = "ws://127.0.0.1:8090/v1/stream";

/// Default backend API base URL.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Frame buffer capacity between the recorder and the chunker.
pub const FRAME_CHANNEL_CAPACITY: usize = 1000;

/// Poll interval when the capture device has no samples ready, in
/// milliseconds.
pub const CAPTURE_POLL_INTERVAL_MS: u64 = 10;
