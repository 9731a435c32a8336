//! Session state, intents, events, and commands.
//!
//! One voice query is a single [`SessionState`] value threaded through
//! the reducer. The state machine is the sole owner of session state;
//! everything else communicates with it through [`SessionInput`]
//! messages and observes [`Command`]s coming back.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::asr::protocol::Alternative;

/// User judgment attached to one recognition result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rating {
    Positive,
    Negative,
    #[default]
    Unrated,
}

impl Rating {
    /// Cycle used by the non-modal grid toggle.
    pub fn toggled(self) -> Self {
        match self {
            Rating::Positive => Rating::Negative,
            Rating::Negative => Rating::Unrated,
            Rating::Unrated => Rating::Positive,
        }
    }
}

/// One recognized label with its confidence and the user's rating.
///
/// The transcript doubles as a photo/label key on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub rating: Rating,
}

impl QueryResult {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
            rating: Rating::Unrated,
        }
    }

    /// Build the result list from one inbound batch of alternatives.
    pub fn from_alternatives(alternatives: &[Alternative]) -> Vec<Self> {
        alternatives
            .iter()
            .map(|a| Self::new(a.transcript.clone(), a.confidence))
            .collect()
    }
}

/// Lifecycle of one voice query.
///
/// At most one variant is active at a time; the `request_id` threading
/// through the non-Idle variants correlates pipeline events and lets
/// stale ones be dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No active request.
    Idle,
    /// Capturing and streaming audio to the recognizer.
    Streaming {
        request_id: Uuid,
        /// Bounded ring of recent amplitudes for the level display.
        amplitudes: Vec<i32>,
        results: Vec<QueryResult>,
    },
    /// Capture finalized; awaiting the final recognition result.
    Processing {
        request_id: Uuid,
        recording: PathBuf,
        results: Vec<QueryResult>,
    },
    /// Results on screen; rating, voice-over and playback available.
    ImageResults {
        request_id: Uuid,
        results: Vec<QueryResult>,
        recording: PathBuf,
        recording_voice_over: bool,
        playing: bool,
        selected: Option<usize>,
        show_confirm_dialog: bool,
    },
}

impl SessionState {
    /// Request id of the active query, if any.
    pub fn request_id(&self) -> Option<Uuid> {
        match self {
            SessionState::Idle => None,
            SessionState::Streaming { request_id, .. }
            | SessionState::Processing { request_id, .. }
            | SessionState::ImageResults { request_id, .. } => Some(*request_id),
        }
    }

    /// Short state name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Streaming { .. } => "Streaming",
            SessionState::Processing { .. } => "Processing",
            SessionState::ImageResults { .. } => "ImageResults",
        }
    }
}

/// User-driven inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start,
    Stop,
    Cancel,
    SelectImage(usize),
    DeselectImage,
    RatePositive,
    RateNegative,
    ToggleRating(usize),
    NewQuery,
    NewQueryConfirm,
    NewQueryCancel,
    RecordVoiceOver,
    StopVoiceOver,
    TogglePlayback,
}

/// Pipeline-driven inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// One captured frame's amplitude.
    Amplitude { request_id: Uuid, amplitude: i32 },
    /// Incremental recognition results (replace, not append).
    PartialResults {
        request_id: Uuid,
        results: Vec<QueryResult>,
    },
    /// The recognition stream ended (server close or idle timeout).
    RecognitionFinished { request_id: Uuid },
    /// Capture finalization completed; the WAV file is ready.
    CaptureStopped { request_id: Uuid, file: PathBuf },
    /// The hard cap on query length elapsed.
    HardCapElapsed { request_id: Uuid },
    /// Playback flipped between playing and paused.
    PlaybackChanged { playing: bool },
}

/// Anything the reducer consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Intent(Intent),
    Event(Event),
}

impl From<Intent> for SessionInput {
    fn from(intent: Intent) -> Self {
        SessionInput::Intent(intent)
    }
}

impl From<Event> for SessionInput {
    fn from(event: Event) -> Self {
        SessionInput::Event(event)
    }
}

/// Side effects requested by the reducer, executed by the runtime.
///
/// The reducer never performs I/O itself; it only returns the new state
/// plus the commands that should run.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start capture + recognition + hard-cap timer for a new query.
    StartCapture { request_id: Uuid },
    /// Finalize the main capture; completion comes back as
    /// [`Event::CaptureStopped`].
    StopCapture { request_id: Uuid },
    /// Abort the hard-cap timer (terminal state reached).
    CancelHardCap,
    /// Upload the finalized query recording.
    SubmitQuery { request_id: Uuid, file: PathBuf },
    /// Upload the current result list.
    SubmitResults {
        request_id: Uuid,
        results: Vec<QueryResult>,
    },
    /// Upload a single updated rating.
    SubmitRating {
        request_id: Uuid,
        result: QueryResult,
    },
    /// Start the secondary voice-over capture.
    StartVoiceOver { request_id: Uuid },
    /// Stop the voice-over capture and upload the comment.
    StopVoiceOver { request_id: Uuid },
    /// Toggle playback of the finalized recording.
    TogglePlayback { file: PathBuf },
    /// Apply the configured cancel policy to in-flight submissions.
    AbortSubmissions,
}

/// Push an amplitude into a bounded ring, dropping the oldest value
/// once the window is full.
pub fn push_amplitude(amplitudes: &mut Vec<i32>, amplitude: i32, window: usize) {
    if window == 0 {
        return;
    }
    while amplitudes.len() >= window {
        amplitudes.remove(0);
    }
    amplitudes.push(amplitude);
}

/// Seed ring shown at the start of a query: a full window of silence.
pub fn silent_ring(window: usize) -> Vec<i32> {
    vec![0; window]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_toggle_cycle() {
        assert_eq!(Rating::Positive.toggled(), Rating::Negative);
        assert_eq!(Rating::Negative.toggled(), Rating::Unrated);
        assert_eq!(Rating::Unrated.toggled(), Rating::Positive);
    }

    #[test]
    fn test_rating_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&Rating::Positive).expect("serialize"),
            "\"POSITIVE\""
        );
        assert_eq!(
            serde_json::to_string(&Rating::Unrated).expect("serialize"),
            "\"UNRATED\""
        );
    }

    #[test]
    fn test_query_result_json_shape() {
        let result = QueryResult::new("millet", 0.92);
        let json = serde_json::to_string(&result).expect("serialize");
        assert!(json.contains("\"label\":\"millet\""));
        assert!(json.contains("\"rating\":\"UNRATED\""));

        // Rating defaults to UNRATED when absent
        let parsed: QueryResult =
            serde_json::from_str(r#"{"label":"corn","confidence":0.5}"#).expect("parse");
        assert_eq!(parsed.rating, Rating::Unrated);
    }

    #[test]
    fn test_from_alternatives_keeps_order() {
        let alternatives = vec![
            Alternative {
                transcript: "corn".to_string(),
                confidence: 0.9,
            },
            Alternative {
                transcript: "wheat".to_string(),
                confidence: 0.3,
            },
        ];
        let results = QueryResult::from_alternatives(&alternatives);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label, "corn");
        assert_eq!(results[1].label, "wheat");
        assert_eq!(results[0].rating, Rating::Unrated);
    }

    #[test]
    fn test_push_amplitude_bounded() {
        let mut ring = silent_ring(3);
        assert_eq!(ring, vec![0, 0, 0]);

        push_amplitude(&mut ring, 10, 3);
        assert_eq!(ring, vec![0, 0, 10]);

        push_amplitude(&mut ring, 20, 3);
        push_amplitude(&mut ring, 30, 3);
        assert_eq!(ring, vec![10, 20, 30]);

        push_amplitude(&mut ring, 40, 3);
        assert_eq!(ring, vec![20, 30, 40]);
    }

    #[test]
    fn test_state_request_id() {
        assert_eq!(SessionState::Idle.request_id(), None);
        let id = Uuid::new_v4();
        let state = SessionState::Streaming {
            request_id: id,
            amplitudes: Vec::new(),
            results: Vec::new(),
        };
        assert_eq!(state.request_id(), Some(id));
        assert_eq!(state.name(), "Streaming");
    }
}
