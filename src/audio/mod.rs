//! Audio capture, recording, playback, and WAV persistence.

pub mod capture;
pub mod playback;
pub mod recorder;
pub mod wav;

pub use capture::{CaptureSource, MockCaptureSource, list_devices};
pub use playback::{NullPlayer, Player};
pub use recorder::{QueryRecorder, RecorderConfig};

#[cfg(feature = "cpal-audio")]
pub use capture::CpalCaptureSource;
