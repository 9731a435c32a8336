//! voiq - Voice photo-query client
//!
//! Records microphone audio, streams it to a remote speech recognizer
//! over one bidirectional stream per query, and manages the query
//! session: ranked label results, ratings, voice-over comments, and
//! background uploads to the application backend.
//!
//! ## Pipeline
//!
//! ```text
//! QueryRecorder → Chunker → CloudRecognizer ─┐
//!        │                                   │ events
//!        └ WAV sink                          ▼
//!                                   SessionRuntime (reducer)
//!                                            │ commands
//!                                            ▼
//!                              QueryApi (fire-and-forget uploads)
//! ```
//!
//! Stages are tasks connected by bounded channels; all session state
//! lives on the runtime task.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod api;
pub mod asr;
pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod output;
pub mod session;
pub mod streaming;

#[cfg(feature = "cli")]
pub mod cli;

// Composition root - needs everything
#[cfg(all(feature = "cpal-audio", feature = "cli"))]
pub mod app;

// Core traits (source → pipeline → sink)
pub use asr::client::Recognizer;
pub use audio::capture::CaptureSource;
pub use audio::playback::Player;

// Session
pub use session::runtime::{SessionHandle, SessionRuntime};
pub use session::state::{Intent, QueryResult, Rating, SessionState};

// Error handling
pub use error::{Result, VoiqError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.2+abc1234"` when git hash is available, `"0.1.2"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
