//! Session runtime: drives the reducer and executes its commands.
//!
//! All `SessionState` reads and writes happen on this single task;
//! everything else (capture loop, chunker, recognition stream, timers,
//! submissions) communicates with it through the input channel. The
//! runtime ends when every input sender is gone — the handle held by
//! the application plus any still-active pipeline pumps.

use crate::api::QueryApi;
use crate::asr::client::Recognizer;
use crate::audio::capture::CaptureSource;
use crate::audio::playback::Player;
use crate::audio::recorder::QueryRecorder;
use crate::config::Config;
use crate::error::{Result, VoiqError};
use crate::session::reducer::{Reducer, ReducerConfig};
use crate::session::state::{Command, Event, Intent, QueryResult, SessionInput, SessionState};
use crate::streaming::chunker::{Chunker, ChunkerConfig};
use crate::streaming::frame::chunk_payload;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

/// Capacity of the session input channel.
const INPUT_CAPACITY: usize = 1024;

/// Runtime behavior lifted from the config.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Directory for query and comment recordings.
    pub data_dir: PathBuf,
    /// Chunker thresholds for the audio → transport stage.
    pub chunker: ChunkerConfig,
    /// Hard cap on query length.
    pub max_duration: Duration,
    /// Abort in-flight submissions on Cancel instead of abandoning
    /// them to finish in the background.
    pub cancel_aborts_uploads: bool,
    /// Show the result grid without an initial selection.
    pub grid_first: bool,
    /// Amplitude ring length.
    pub amplitude_window: usize,
    /// Diagnostic verbosity (0 = quiet, 2 = transition logging).
    pub verbosity: u8,
}

impl RuntimeConfig {
    /// Derive runtime settings from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            data_dir: config.data_dir(),
            chunker: ChunkerConfig {
                max_size: config.query.chunk_max_frames,
                flush_interval: config.query.chunk_flush_interval(),
            },
            max_duration: config.query.max_duration(),
            cancel_aborts_uploads: config.query.cancel_aborts_uploads,
            grid_first: config.query.grid_first,
            amplitude_window: config.query.amplitude_window,
            verbosity: 0,
        }
    }

    /// Set diagnostic verbosity.
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// Handle used by the application to drive and observe a session.
#[derive(Clone)]
pub struct SessionHandle {
    input_tx: mpsc::Sender<SessionInput>,
    state_rx: watch::Receiver<SessionState>,
}

impl SessionHandle {
    /// Queue a user intent.
    pub async fn dispatch(&self, intent: Intent) -> Result<()> {
        self.input_tx
            .send(SessionInput::Intent(intent))
            .await
            .map_err(|_| VoiqError::SessionClosed)
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }
}

/// Owns the session's components and runs the reduce/execute loop.
pub struct SessionRuntime<S: CaptureSource + 'static> {
    config: RuntimeConfig,
    reducer: Reducer,
    state: SessionState,
    recorder: QueryRecorder<S>,
    recognizer: Arc<dyn Recognizer>,
    api: Arc<QueryApi>,
    player: Arc<dyn Player>,
    input_tx: mpsc::WeakSender<SessionInput>,
    input_rx: mpsc::Receiver<SessionInput>,
    state_tx: watch::Sender<SessionState>,
    hard_cap: Option<JoinHandle<()>>,
    submissions: JoinSet<()>,
    /// Request id of the active main capture, if any.
    capture_active: Option<Uuid>,
    /// Request id of the active voice-over capture, if any.
    voice_over_active: Option<Uuid>,
}

impl<S: CaptureSource + 'static> SessionRuntime<S> {
    /// Build a runtime and the handle that drives it.
    pub fn new(
        config: RuntimeConfig,
        recorder: QueryRecorder<S>,
        recognizer: Arc<dyn Recognizer>,
        api: Arc<QueryApi>,
        player: Arc<dyn Player>,
    ) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(INPUT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);

        let reducer = Reducer::new(ReducerConfig {
            grid_first: config.grid_first,
            amplitude_window: config.amplitude_window,
        });

        let runtime = Self {
            config,
            reducer,
            state: SessionState::Idle,
            recorder,
            recognizer,
            api,
            player,
            input_tx: input_tx.downgrade(),
            input_rx,
            state_tx,
            hard_cap: None,
            submissions: JoinSet::new(),
            capture_active: None,
            voice_over_active: None,
        };
        let handle = SessionHandle { input_tx, state_rx };
        (runtime, handle)
    }

    /// Run until the last input sender is dropped, then tear down:
    /// finalize any active capture and drain outstanding submissions.
    pub async fn run(mut self) {
        while let Some(input) = self.input_rx.recv().await {
            let (next, commands) = self.reducer.reduce(&self.state, &input);

            if self.config.verbosity >= 2 {
                if next.name() != self.state.name() {
                    eprintln!("voiq: session {} -> {}", self.state.name(), next.name());
                } else if commands.is_empty() && next == self.state {
                    eprintln!("voiq: input ignored in {}: {:?}", self.state.name(), input);
                }
            }

            self.state = next;
            self.state_tx.send_replace(self.state.clone());

            for command in commands {
                self.execute(command).await;
            }

            self.reap_submissions();
        }

        // Teardown: the handle and all pumps are gone.
        if self.capture_active.is_some() || self.voice_over_active.is_some() {
            self.recorder.stop().await;
        }
        if let Some(timer) = self.hard_cap.take() {
            timer.abort();
        }
        // Bounded-retry submissions terminate on their own; wait for
        // the stragglers unless the cancel policy says otherwise.
        if self.config.cancel_aborts_uploads {
            self.submissions.abort_all();
        }
        while let Some(result) = self.submissions.join_next().await {
            if let Err(e) = result
                && !e.is_cancelled()
            {
                eprintln!("voiq: submission task failed: {}", e);
            }
        }
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::StartCapture { request_id } => self.start_capture(request_id).await,
            Command::StopCapture { request_id } => self.stop_capture(request_id).await,
            Command::CancelHardCap => {
                if let Some(timer) = self.hard_cap.take() {
                    timer.abort();
                }
            }
            Command::SubmitQuery { request_id, file } => {
                let api = self.api.clone();
                let verbosity = self.config.verbosity;
                self.submissions.spawn(async move {
                    match api.submit_query(request_id, &file).await {
                        Ok(id) => {
                            if verbosity >= 2 {
                                eprintln!("voiq: query {} uploaded as {}", request_id, id);
                            }
                        }
                        Err(e) => eprintln!("voiq: query upload failed: {}", e),
                    }
                });
            }
            Command::SubmitResults {
                request_id,
                results,
            } => {
                let api = self.api.clone();
                self.submissions.spawn(async move {
                    if let Err(e) = api.submit_results(request_id, &results).await {
                        eprintln!("voiq: results upload failed: {}", e);
                    }
                });
            }
            Command::SubmitRating { request_id, result } => {
                let api = self.api.clone();
                self.submissions.spawn(async move {
                    if let Err(e) = api.submit_rating(request_id, &result).await {
                        eprintln!("voiq: rating upload failed: {}", e);
                    }
                });
            }
            Command::StartVoiceOver { request_id } => self.start_voice_over(request_id),
            Command::StopVoiceOver { request_id } => self.stop_voice_over(request_id).await,
            Command::TogglePlayback { file } => {
                let playing = self.player.toggle(&file);
                self.inject(SessionInput::Event(Event::PlaybackChanged { playing }));
            }
            Command::AbortSubmissions => {
                if self.config.cancel_aborts_uploads {
                    self.submissions.abort_all();
                }
                // Otherwise deliberately abandoned: the uploads may
                // outlive the state transition (at-most-once delivery).
            }
        }
    }

    /// Start the main capture and wire up the pipeline stages:
    /// recorder → amplitude tap → chunker → payload concat →
    /// recognition stream → session events.
    async fn start_capture(&mut self, request_id: Uuid) {
        if let Err(e) = std::fs::create_dir_all(&self.config.data_dir) {
            eprintln!(
                "voiq: cannot create data dir {}: {}",
                self.config.data_dir.display(),
                e
            );
        }
        let path = self.config.data_dir.join(format!("{}.wav", request_id));

        let mut frames = match self.recorder.start(path) {
            Ok(frames) => frames,
            Err(e) => {
                // Device acquisition failure is fatal to this query
                eprintln!("voiq: cannot start capture: {}", e);
                self.inject(SessionInput::Intent(Intent::Cancel));
                return;
            }
        };
        self.capture_active = Some(request_id);

        let Some(input_tx) = self.input_tx.upgrade() else {
            return;
        };

        // Chunker station: frames in, chunks out
        let (frame_tx, frame_rx) = mpsc::channel(INPUT_CAPACITY);
        let (chunk_tx, mut chunk_rx) = mpsc::channel(16);
        tokio::spawn(Chunker::with_config(self.config.chunker.clone()).run(frame_rx, chunk_tx));

        // Amplitude tap: every frame's amplitude goes to the session,
        // the frame itself to the chunker. Amplitudes are display-only
        // and lossy: when the session queue is busy (e.g. while a stop
        // is finalizing) they are dropped rather than backing up the
        // audio path.
        let amplitude_tx = input_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                let amplitude = frame.amplitude;
                if frame_tx.send(frame).await.is_err() {
                    break;
                }
                use tokio::sync::mpsc::error::TrySendError;
                match amplitude_tx.try_send(SessionInput::Event(Event::Amplitude {
                    request_id,
                    amplitude,
                })) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        });

        // Payload stage: chunk of frames → one transport payload
        let (payload_tx, payload_rx) = mpsc::channel(16);
        tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                if payload_tx.send(chunk_payload(&chunk)).await.is_err() {
                    break;
                }
            }
        });

        // Recognition stream: forward result batches, then signal
        // completion. A failed stream open still finishes the query so
        // the session can settle with whatever it has.
        let recognizer = self.recognizer.clone();
        let results_tx = input_tx.clone();
        tokio::spawn(async move {
            match recognizer.stream(request_id, payload_rx).await {
                Ok(mut batches) => {
                    while let Some(alternatives) = batches.recv().await {
                        let results = QueryResult::from_alternatives(&alternatives);
                        if results_tx
                            .send(SessionInput::Event(Event::PartialResults {
                                request_id,
                                results,
                            }))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                }
                Err(e) => eprintln!("voiq: recognition stream unavailable: {}", e),
            }
            let _ = results_tx
                .send(SessionInput::Event(Event::RecognitionFinished {
                    request_id,
                }))
                .await;
        });

        // Hard cap: issues a Stop when the query runs too long. Holds
        // only a weak sender so an idle timer cannot keep the session
        // alive.
        let cap_tx = input_tx.downgrade();
        let max_duration = self.config.max_duration;
        self.hard_cap = Some(tokio::spawn(async move {
            tokio::time::sleep(max_duration).await;
            if let Some(tx) = cap_tx.upgrade() {
                let _ = tx
                    .send(SessionInput::Event(Event::HardCapElapsed { request_id }))
                    .await;
            }
        }));
    }

    /// Finalize the main capture and report the WAV file back as an
    /// event (which performs the Streaming → Processing transition).
    async fn stop_capture(&mut self, request_id: Uuid) {
        if self.capture_active != Some(request_id) {
            return;
        }
        self.capture_active = None;
        let file = self.recorder.stop().await;
        if let Some(file) = file {
            self.inject(SessionInput::Event(Event::CaptureStopped {
                request_id,
                file,
            }));
        }
    }

    /// Start the secondary voice-over capture. Frames are drained and
    /// discarded; only the persisted file matters.
    fn start_voice_over(&mut self, request_id: Uuid) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = self
            .config
            .data_dir
            .join(format!("{}-comment-{}.wav", request_id, millis));

        match self.recorder.start(path) {
            Ok(mut frames) => {
                self.voice_over_active = Some(request_id);
                tokio::spawn(async move { while frames.recv().await.is_some() {} });
            }
            Err(e) => eprintln!("voiq: cannot start voice-over capture: {}", e),
        }
    }

    /// Stop the voice-over capture and upload the comment file.
    async fn stop_voice_over(&mut self, request_id: Uuid) {
        if self.voice_over_active.take() != Some(request_id) {
            return;
        }
        if let Some(file) = self.recorder.stop().await {
            let api = self.api.clone();
            self.submissions.spawn(async move {
                if let Err(e) = api.submit_comment(request_id, &file).await {
                    eprintln!("voiq: comment upload failed: {}", e);
                }
            });
        }
    }

    /// Queue an input produced by the runtime itself.
    fn inject(&self, input: SessionInput) {
        if let Some(tx) = self.input_tx.upgrade()
            && tx.try_send(input).is_err()
        {
            eprintln!("voiq: session input queue full, dropping internal event");
        }
    }

    /// Collect completed submission tasks so the set stays small.
    fn reap_submissions(&mut self) {
        while let Some(result) = self.submissions.try_join_next() {
            if let Err(e) = result
                && !e.is_cancelled()
            {
                eprintln!("voiq: submission task failed: {}", e);
            }
        }
    }
}
