//! Query recorder: pulls fixed-size frames from a capture source,
//! computes amplitudes, and persists the session to a WAV file.
//!
//! The read loop runs on a blocking task. Frame emission and WAV
//! persistence are independent: a write failure is logged and recording
//! continues; a dropped frame receiver stops the loop. Whatever ends
//! the loop, the finalization tail (flush + header back-patch) always
//! runs before the device is released.

use crate::audio::capture::CaptureSource;
use crate::audio::wav;
use crate::defaults;
use crate::error::{Result, VoiqError};
use crate::streaming::frame::AudioFrame;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Configuration for the recorder.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Sample rate written to the WAV header and used for capture.
    pub sample_rate: u32,
    /// Frame channel capacity.
    pub channel_capacity: usize,
    /// Polling interval when no samples are available (ms).
    pub poll_interval_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            channel_capacity: defaults::FRAME_CHANNEL_CAPACITY,
            poll_interval_ms: defaults::CAPTURE_POLL_INTERVAL_MS,
        }
    }
}

/// Records one capture session at a time from a [`CaptureSource`].
///
/// `start` returns a channel of [`AudioFrame`]s; `stop` joins the read
/// loop (waiting for WAV finalization) and returns the finalized file.
/// `stop` is safe to call repeatedly: late calls return the last
/// finalized file.
pub struct QueryRecorder<S: CaptureSource + 'static> {
    source: Arc<std::sync::Mutex<S>>,
    config: RecorderConfig,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    last_file: Option<PathBuf>,
}

impl<S: CaptureSource + 'static> QueryRecorder<S> {
    /// Creates a recorder around a capture source.
    pub fn new(source: S) -> Self {
        Self::with_config(source, RecorderConfig::default())
    }

    /// Creates a recorder with custom configuration.
    pub fn with_config(source: S, config: RecorderConfig) -> Self {
        Self {
            source: Arc::new(std::sync::Mutex::new(source)),
            config,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
            last_file: None,
        }
    }

    /// Returns true while a capture session is active.
    pub fn is_recording(&self) -> bool {
        self.task.is_some()
    }

    /// Starts capturing to `path` and returns the frame channel.
    ///
    /// Device acquisition or sink creation failure is fatal; nothing is
    /// spawned in that case. Only one session may be active at a time —
    /// callers serialize start/stop.
    pub fn start(&mut self, path: PathBuf) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.task.is_some() {
            return Err(VoiqError::RecorderBusy);
        }

        let mut writer = wav::create_recording(&path, self.config.sample_rate)?;
        {
            let mut source = lock_source(&self.source);
            source.start()?;
        }

        self.running.store(true, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let running = self.running.clone();
        let source = self.source.clone();
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let file = path.clone();

        let task = tokio::task::spawn_blocking(move || {
            let mut source = lock_source(&source);
            let mut sequence = 0u64;

            while running.load(Ordering::SeqCst) {
                match source.read_samples() {
                    Ok(samples) if !samples.is_empty() => {
                        let amplitude = wav::rms_amplitude(&samples);
                        let frame =
                            AudioFrame::new(sequence, wav::samples_to_bytes(&samples), amplitude);
                        sequence += 1;

                        // Check liveness again before handing the frame on
                        if running.load(Ordering::SeqCst)
                            && tx.blocking_send(frame).is_err()
                        {
                            // Receiver dropped — consumer-side cancellation
                            break;
                        }

                        // Persist independently of emission
                        if let Err(e) = wav::append_samples(&mut writer, &samples) {
                            eprintln!(
                                "voiq: error writing to audio file {}: {}",
                                file.display(),
                                e
                            );
                        }
                    }
                    Ok(_) => {
                        // No samples yet, wait briefly
                        std::thread::sleep(poll_interval);
                    }
                    Err(e) => {
                        eprintln!("voiq: audio capture error: {}", e);
                        break;
                    }
                }
            }

            // Finalization tail — runs regardless of how the loop ended.
            // finalize() flushes and back-patches the RIFF/data sizes.
            if let Err(e) = writer.finalize() {
                eprintln!("voiq: error finalizing {}: {}", file.display(), e);
            }
            if let Err(e) = source.stop() {
                eprintln!("voiq: error releasing capture device: {}", e);
            }
        });

        self.task = Some(task);
        self.last_file = Some(path);
        Ok(rx)
    }

    /// Stops the capture loop, waits for WAV finalization, and returns
    /// the finalized file.
    ///
    /// A no-op when not recording: returns the last finalized file (or
    /// None if nothing was ever recorded).
    pub async fn stop(&mut self) -> Option<PathBuf> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                eprintln!("voiq: recorder task failed: {}", e);
            }
        }
        self.last_file.clone()
    }
}

/// Lock the shared capture source, recovering from a poisoned lock.
fn lock_source<S>(source: &Arc<std::sync::Mutex<S>>) -> std::sync::MutexGuard<'_, S> {
    match source.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
