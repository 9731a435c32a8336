//! Streaming pipeline for voice queries.
//!
//! Explicit stages connected by bounded channels:
//!
//! ```text
//! QueryRecorder → Chunker → recognition transport → session events
//! ```
//!
//! Each stage is a loop reading from an input channel and writing to an
//! output channel, which keeps backpressure and cancellation visible:
//! a dropped receiver stops the stage upstream of it.

pub mod chunker;
pub mod frame;

pub use chunker::{Chunker, ChunkerConfig};
pub use frame::{AudioFrame, chunk_payload};
