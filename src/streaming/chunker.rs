//! Chunker station for the streaming pipeline.
//!
//! Generic time- and size-windowed batcher: buffers incoming items and
//! flushes when either the size threshold is reached or an inactivity
//! timer elapses, whichever comes first. The timer restarts on every
//! item — it is an inactivity timeout, not a fixed-period tick.
//!
//! Guarantees: every input item appears in exactly one emitted chunk,
//! in arrival order, and chunk emission order matches arrival order.

use crate::defaults;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Configuration for the chunker.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Items accumulated before a size-based flush.
    pub max_size: usize,
    /// Inactivity timeout before a partial buffer is flushed.
    pub flush_interval: Duration,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_size: defaults::CHUNK_MAX_FRAMES,
            flush_interval: Duration::from_millis(defaults::CHUNK_FLUSH_INTERVAL_MS),
        }
    }
}

/// Station that batches items into chunks.
///
/// Runs as `async fn run(input, output)` connected by bounded channels,
/// like the other pipeline stations.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Creates a chunker with default configuration.
    pub fn new() -> Self {
        Self::with_config(ChunkerConfig::default())
    }

    /// Creates a chunker with custom thresholds.
    pub fn with_config(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Runs the chunker until the input channel closes.
    ///
    /// A non-empty buffer is emitted as one final chunk on completion.
    /// Stops early if the output receiver is dropped.
    pub async fn run<T: Send>(self, mut input: mpsc::Receiver<T>, output: mpsc::Sender<Vec<T>>) {
        let mut buffer: Vec<T> = Vec::new();

        loop {
            let item = if buffer.is_empty() {
                // Nothing pending — no timer to race against.
                match input.recv().await {
                    Some(item) => item,
                    None => break,
                }
            } else {
                // The sleep is re-created on every iteration, so each
                // new item restarts the inactivity window.
                tokio::select! {
                    item = input.recv() => match item {
                        Some(item) => item,
                        None => break,
                    },
                    _ = sleep(self.config.flush_interval) => {
                        if output.send(std::mem::take(&mut buffer)).await.is_err() {
                            return;
                        }
                        continue;
                    }
                }
            };

            buffer.push(item);
            if buffer.len() >= self.config.max_size
                && output.send(std::mem::take(&mut buffer)).await.is_err()
            {
                return;
            }
        }

        if !buffer.is_empty() {
            let _ = output.send(buffer).await;
        }
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}
