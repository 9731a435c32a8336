//! Streaming recognition transport.
//!
//! The recognizer is a remote service reached over one bidirectional
//! WebSocket stream per query: a JSON config frame goes out first,
//! followed by binary PCM frames; incremental recognition results come
//! back as JSON frames until the server closes the stream or the
//! inbound side goes idle.

pub mod client;
pub mod protocol;

pub use client::{CloudRecognizer, MockRecognizer, Recognizer};
pub use protocol::{Alternative, RecognitionResponse, StreamConfig};
