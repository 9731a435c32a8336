//! Playback seam for finalized query recordings.
//!
//! Audio output is an external collaborator: the session only needs to
//! toggle playback of a finalized file and observe the resulting
//! playing/paused flips. The trait keeps the session testable and lets
//! a host application plug in a real player.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Trait for playback of finalized recordings.
pub trait Player: Send + Sync {
    /// Toggle play/pause for `file`; returns true when now playing.
    fn toggle(&self, file: &Path) -> bool;
}

/// Player that flips a flag without producing audio.
///
/// Used by the CLI (which has no audio output path) and by tests.
#[derive(Debug, Default)]
pub struct NullPlayer {
    playing: AtomicBool,
}

impl NullPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while "playing".
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

impl Player for NullPlayer {
    fn toggle(&self, _file: &Path) -> bool {
        // fetch_xor flips the flag and returns the previous value
        !self.playing.fetch_xor(true, Ordering::SeqCst)
    }
}
