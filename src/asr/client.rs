//! Recognition stream client.
//!
//! One WebSocket connection per query. Outbound and inbound directions
//! run as separate tasks multiplexed over the same stream: the sender
//! forwards audio chunks (config frame first), the receiver parses
//! result frames and forwards usable alternatives downstream.

use crate::asr::protocol::{Alternative, RecognitionResponse, StreamConfig};
use crate::config::AsrConfig;
use crate::defaults;
use crate::error::{Result, VoiqError};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

/// Trait for streaming speech recognizers.
///
/// This trait allows swapping implementations (remote service vs mock).
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Open one recognition stream for `request_id`.
    ///
    /// `audio` supplies chunk payloads in order; the returned channel
    /// yields the alternatives of each usable inbound result and closes
    /// when the stream ends (server close, idle timeout, or error).
    async fn stream(
        &self,
        request_id: Uuid,
        audio: mpsc::Receiver<Vec<u8>>,
    ) -> Result<mpsc::Receiver<Vec<Alternative>>>;
}

/// Remote recognizer reached over WebSocket.
pub struct CloudRecognizer {
    url: String,
    model: String,
    sample_rate: u32,
    idle_timeout: Duration,
}

impl CloudRecognizer {
    /// Creates a client from the ASR section of the config.
    pub fn new(config: &AsrConfig) -> Self {
        Self {
            url: config.url.clone(),
            model: config.model.clone(),
            sample_rate: defaults::SAMPLE_RATE,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }

    /// Overrides the capture sample rate announced in the config frame.
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }
}

#[async_trait]
impl Recognizer for CloudRecognizer {
    async fn stream(
        &self,
        request_id: Uuid,
        mut audio: mpsc::Receiver<Vec<u8>>,
    ) -> Result<mpsc::Receiver<Vec<Alternative>>> {
        let (ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| VoiqError::RecognitionStream {
                message: format!("connect to {} failed: {}", self.url, e),
            })?;
        let (mut sink, mut source) = ws.split();

        // Config frame precedes any audio
        let config = StreamConfig {
            sample_rate_hz: self.sample_rate,
            model: self.model.clone(),
            request_id,
        };
        let config_json = config.to_json().map_err(|e| VoiqError::RecognitionStream {
            message: format!("config frame serialization failed: {}", e),
        })?;
        sink.send(Message::Text(config_json.into()))
            .await
            .map_err(|e| VoiqError::RecognitionStream {
                message: format!("config frame send failed: {}", e),
            })?;

        // Outbound: forward chunk payloads, close when the source ends.
        // A send failure means the server tore the stream down; stop
        // sending and let the inbound side observe the close.
        tokio::spawn(async move {
            while let Some(payload) = audio.recv().await {
                if sink.send(Message::Binary(payload.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
        });

        // Inbound: parse result frames until close, error, or idle
        // timeout. The timeout counts from the last received frame and
        // is treated as stream completion.
        let (tx, rx) = mpsc::channel(16);
        let idle_timeout = self.idle_timeout;
        tokio::spawn(async move {
            loop {
                let message = match tokio::time::timeout(idle_timeout, source.next()).await {
                    Err(_) => {
                        eprintln!(
                            "voiq: recognition stream idle for {}s, treating as complete",
                            idle_timeout.as_secs()
                        );
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(Err(e))) => {
                        eprintln!("voiq: recognition stream error: {}", e);
                        break;
                    }
                    Ok(Some(Ok(message))) => message,
                };

                match message {
                    Message::Text(text) => match RecognitionResponse::from_json(&text) {
                        Ok(response) => {
                            if let Some(alternatives) = response.primary_alternatives() {
                                if tx.send(alternatives.to_vec()).await.is_err() {
                                    // Downstream cancelled the query
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            eprintln!("voiq: unparseable recognition frame: {}", e);
                        }
                    },
                    Message::Close(_) => break,
                    // Ping/pong handled by tungstenite; binary unused
                    _ => {}
                }
            }
        });

        Ok(rx)
    }
}

/// Mock recognizer for tests.
///
/// Consumes the audio channel, records received payloads, and replays a
/// scripted sequence of result batches (one batch per received chunk,
/// then the remainder when the audio side closes).
pub struct MockRecognizer {
    scripted: std::sync::Mutex<Vec<Vec<Alternative>>>,
    received: std::sync::Arc<std::sync::Mutex<Vec<Vec<u8>>>>,
    fail_connect: bool,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            scripted: std::sync::Mutex::new(Vec::new()),
            received: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
            fail_connect: false,
        }
    }

    /// Script the result batches to emit.
    pub fn with_results(self, results: Vec<Vec<Alternative>>) -> Self {
        if let Ok(mut scripted) = self.scripted.lock() {
            *scripted = results;
        }
        self
    }

    /// Configure the mock to fail on stream open.
    pub fn with_connect_failure(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Chunk payloads received so far.
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    async fn stream(
        &self,
        _request_id: Uuid,
        mut audio: mpsc::Receiver<Vec<u8>>,
    ) -> Result<mpsc::Receiver<Vec<Alternative>>> {
        if self.fail_connect {
            return Err(VoiqError::RecognitionStream {
                message: "mock connect failure".to_string(),
            });
        }

        let mut scripted: std::collections::VecDeque<Vec<Alternative>> = self
            .scripted
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
            .into();
        let received = self.received.clone();
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            while let Some(payload) = audio.recv().await {
                if let Ok(mut r) = received.lock() {
                    r.push(payload);
                }
                if let Some(batch) = scripted.pop_front() {
                    if tx.send(batch).await.is_err() {
                        return;
                    }
                }
            }
            // Audio finished: drain any remaining scripted batches,
            // then close (ending the stream).
            while let Some(batch) = scripted.pop_front() {
                if tx.send(batch).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }
}
