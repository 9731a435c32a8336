//! Pure reducer for the session state machine.
//!
//! `reduce` consumes the current state and one input, and returns the
//! next state plus the commands the runtime should execute. It never
//! performs I/O. Inputs not listed for a state are no-ops; events
//! carrying a request id other than the active one are stale and
//! dropped.

use crate::session::state::{
    Command, Event, Intent, QueryResult, Rating, SessionInput, SessionState, push_amplitude,
    silent_ring,
};
use uuid::Uuid;

/// Reducer behavior knobs lifted from the config.
#[derive(Debug, Clone)]
pub struct ReducerConfig {
    /// Show the result grid without an initial selection.
    pub grid_first: bool,
    /// Amplitude ring length.
    pub amplitude_window: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            grid_first: false,
            amplitude_window: crate::defaults::AMPLITUDE_WINDOW,
        }
    }
}

/// The session reducer.
pub struct Reducer {
    config: ReducerConfig,
}

impl Reducer {
    pub fn new(config: ReducerConfig) -> Self {
        Self { config }
    }

    /// Apply one input. Unhandled inputs return the state unchanged
    /// with no commands.
    pub fn reduce(
        &self,
        state: &SessionState,
        input: &SessionInput,
    ) -> (SessionState, Vec<Command>) {
        match input {
            SessionInput::Intent(intent) => self.reduce_intent(state, intent),
            SessionInput::Event(event) => self.reduce_event(state, event),
        }
    }

    fn reduce_intent(
        &self,
        state: &SessionState,
        intent: &Intent,
    ) -> (SessionState, Vec<Command>) {
        match (state, intent) {
            // ── Query lifecycle ───────────────────────────────────────
            (SessionState::Idle, Intent::Start) => self.start_query(Vec::new()),

            // Starting over from the results screen: wind down any
            // voice-over capture, then begin a fresh query.
            (
                SessionState::ImageResults {
                    request_id,
                    recording_voice_over,
                    ..
                },
                Intent::Start,
            ) => {
                let mut pre = Vec::new();
                if *recording_voice_over {
                    pre.push(Command::StopVoiceOver {
                        request_id: *request_id,
                    });
                }
                self.start_query(pre)
            }

            (SessionState::Streaming { request_id, .. }, Intent::Stop) => (
                // State advances when CaptureStopped comes back; the
                // pipeline keeps running meanwhile.
                state.clone(),
                vec![Command::StopCapture {
                    request_id: *request_id,
                }],
            ),

            (SessionState::Idle, Intent::Cancel) => (SessionState::Idle, Vec::new()),
            (_, Intent::Cancel) => {
                let mut commands = Vec::new();
                if let SessionState::Streaming { request_id, .. } = state {
                    commands.push(Command::StopCapture {
                        request_id: *request_id,
                    });
                }
                if let SessionState::ImageResults {
                    request_id,
                    recording_voice_over: true,
                    ..
                } = state
                {
                    commands.push(Command::StopVoiceOver {
                        request_id: *request_id,
                    });
                }
                commands.push(Command::CancelHardCap);
                commands.push(Command::AbortSubmissions);
                (SessionState::Idle, commands)
            }

            // ── Selection ─────────────────────────────────────────────
            (SessionState::ImageResults { results, .. }, Intent::SelectImage(index))
                if *index < results.len() =>
            {
                (
                    with_selection(state, Some(*index)).unwrap_or_else(|| state.clone()),
                    Vec::new(),
                )
            }

            (SessionState::ImageResults { .. }, Intent::DeselectImage) => (
                with_selection(state, None).unwrap_or_else(|| state.clone()),
                Vec::new(),
            ),

            // ── Rating ────────────────────────────────────────────────
            (SessionState::ImageResults { .. }, Intent::RatePositive) => {
                self.rate_selected(state, Rating::Positive)
            }
            (SessionState::ImageResults { .. }, Intent::RateNegative) => {
                self.rate_selected(state, Rating::Negative)
            }
            (SessionState::ImageResults { .. }, Intent::ToggleRating(index)) => {
                self.toggle_rating(state, *index)
            }

            // ── New-query confirmation dialog ─────────────────────────
            (SessionState::ImageResults { .. }, Intent::NewQuery) => {
                (with_dialog(state, true), Vec::new())
            }
            (SessionState::ImageResults { .. }, Intent::NewQueryCancel) => {
                (with_dialog(state, false), Vec::new())
            }
            (SessionState::ImageResults { .. }, Intent::NewQueryConfirm) => {
                (SessionState::Idle, Vec::new())
            }

            // ── Voice-over comment ────────────────────────────────────
            (
                SessionState::ImageResults {
                    request_id,
                    recording_voice_over: false,
                    ..
                },
                Intent::RecordVoiceOver,
            ) => (
                with_voice_over(state, true),
                vec![Command::StartVoiceOver {
                    request_id: *request_id,
                }],
            ),
            (
                SessionState::ImageResults {
                    request_id,
                    recording_voice_over: true,
                    ..
                },
                Intent::StopVoiceOver,
            ) => (
                with_voice_over(state, false),
                vec![Command::StopVoiceOver {
                    request_id: *request_id,
                }],
            ),

            // ── Playback ──────────────────────────────────────────────
            (SessionState::ImageResults { recording, .. }, Intent::TogglePlayback) => (
                state.clone(),
                vec![Command::TogglePlayback {
                    file: recording.clone(),
                }],
            ),

            // Everything else is a no-op in the current state
            _ => (state.clone(), Vec::new()),
        }
    }

    fn reduce_event(&self, state: &SessionState, event: &Event) -> (SessionState, Vec<Command>) {
        match (state, event) {
            (
                SessionState::Streaming {
                    request_id,
                    amplitudes,
                    results,
                },
                Event::Amplitude {
                    request_id: event_id,
                    amplitude,
                },
            ) if event_id == request_id => {
                let mut amplitudes = amplitudes.clone();
                push_amplitude(&mut amplitudes, *amplitude, self.config.amplitude_window);
                (
                    SessionState::Streaming {
                        request_id: *request_id,
                        amplitudes,
                        results: results.clone(),
                    },
                    Vec::new(),
                )
            }

            (
                SessionState::Streaming {
                    request_id,
                    amplitudes,
                    ..
                },
                Event::PartialResults {
                    request_id: event_id,
                    results,
                },
            ) if event_id == request_id => (
                SessionState::Streaming {
                    request_id: *request_id,
                    amplitudes: amplitudes.clone(),
                    results: results.clone(),
                },
                Vec::new(),
            ),

            // The hard cap acts exactly like a user Stop.
            (
                SessionState::Streaming { request_id, .. },
                Event::HardCapElapsed {
                    request_id: event_id,
                },
            ) if event_id == request_id => (
                state.clone(),
                vec![Command::StopCapture {
                    request_id: *request_id,
                }],
            ),

            // Capture finalized: enter Processing, cancel the cap, and
            // upload the recording in the background.
            (
                SessionState::Streaming {
                    request_id,
                    results,
                    ..
                },
                Event::CaptureStopped {
                    request_id: event_id,
                    file,
                },
            ) if event_id == request_id => (
                SessionState::Processing {
                    request_id: *request_id,
                    recording: file.clone(),
                    results: results.clone(),
                },
                vec![
                    Command::CancelHardCap,
                    Command::SubmitQuery {
                        request_id: *request_id,
                        file: file.clone(),
                    },
                ],
            ),

            // A (possibly final) result arriving while Processing
            // replaces the list and is uploaded.
            (
                SessionState::Processing {
                    request_id,
                    recording,
                    ..
                },
                Event::PartialResults {
                    request_id: event_id,
                    results,
                },
            ) if event_id == request_id => (
                SessionState::Processing {
                    request_id: *request_id,
                    recording: recording.clone(),
                    results: results.clone(),
                },
                vec![Command::SubmitResults {
                    request_id: *request_id,
                    results: results.clone(),
                }],
            ),

            (
                SessionState::Processing {
                    request_id,
                    recording,
                    results,
                },
                Event::RecognitionFinished {
                    request_id: event_id,
                },
            ) if event_id == request_id => (
                SessionState::ImageResults {
                    request_id: *request_id,
                    results: results.clone(),
                    recording: recording.clone(),
                    recording_voice_over: false,
                    playing: false,
                    selected: self.initial_selection(results),
                    show_confirm_dialog: false,
                },
                Vec::new(),
            ),

            (SessionState::ImageResults { .. }, Event::PlaybackChanged { playing }) => {
                (with_playing(state, *playing), Vec::new())
            }

            // Stale or out-of-state event
            _ => (state.clone(), Vec::new()),
        }
    }

    fn start_query(&self, mut pre_commands: Vec<Command>) -> (SessionState, Vec<Command>) {
        let request_id = Uuid::new_v4();
        pre_commands.push(Command::StartCapture { request_id });
        (
            SessionState::Streaming {
                request_id,
                amplitudes: silent_ring(self.config.amplitude_window),
                results: Vec::new(),
            },
            pre_commands,
        )
    }

    fn initial_selection(&self, results: &[QueryResult]) -> Option<usize> {
        if self.config.grid_first || results.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    /// Rate the currently selected result and advance the selection to
    /// the next unrated one.
    fn rate_selected(
        &self,
        state: &SessionState,
        rating: Rating,
    ) -> (SessionState, Vec<Command>) {
        let SessionState::ImageResults {
            request_id,
            results,
            recording,
            recording_voice_over,
            playing,
            selected: Some(index),
            show_confirm_dialog,
        } = state
        else {
            return (state.clone(), Vec::new());
        };
        if *index >= results.len() {
            return (state.clone(), Vec::new());
        }

        let mut results = results.clone();
        results[*index].rating = rating;
        let rated = results[*index].clone();
        let next = next_unrated_index(*index, &results);

        (
            SessionState::ImageResults {
                request_id: *request_id,
                results,
                recording: recording.clone(),
                recording_voice_over: *recording_voice_over,
                playing: *playing,
                selected: next,
                show_confirm_dialog: *show_confirm_dialog,
            },
            vec![Command::SubmitRating {
                request_id: *request_id,
                result: rated,
            }],
        )
    }

    /// Cycle the rating of an explicit index without moving selection.
    fn toggle_rating(&self, state: &SessionState, index: usize) -> (SessionState, Vec<Command>) {
        let SessionState::ImageResults {
            request_id,
            results,
            recording,
            recording_voice_over,
            playing,
            selected,
            show_confirm_dialog,
        } = state
        else {
            return (state.clone(), Vec::new());
        };
        if index >= results.len() {
            return (state.clone(), Vec::new());
        }

        let mut results = results.clone();
        results[index].rating = results[index].rating.toggled();
        let rated = results[index].clone();

        (
            SessionState::ImageResults {
                request_id: *request_id,
                results,
                recording: recording.clone(),
                recording_voice_over: *recording_voice_over,
                playing: *playing,
                selected: *selected,
                show_confirm_dialog: *show_confirm_dialog,
            },
            vec![Command::SubmitRating {
                request_id: *request_id,
                result: rated,
            }],
        )
    }
}

impl Default for Reducer {
    fn default() -> Self {
        Self::new(ReducerConfig::default())
    }
}

/// Find the next unrated result: forward from `from` to the end, then
/// wrapping to search from the start up to `from`. None when every
/// result is rated.
pub fn next_unrated_index(from: usize, results: &[QueryResult]) -> Option<usize> {
    if results.is_empty() {
        return None;
    }
    let from = from.min(results.len());
    results[from..]
        .iter()
        .position(|r| r.rating == Rating::Unrated)
        .map(|offset| from + offset)
        .or_else(|| {
            results[..from]
                .iter()
                .position(|r| r.rating == Rating::Unrated)
        })
}

fn with_selection(state: &SessionState, selected: Option<usize>) -> Option<SessionState> {
    if let SessionState::ImageResults {
        request_id,
        results,
        recording,
        recording_voice_over,
        playing,
        show_confirm_dialog,
        ..
    } = state
    {
        Some(SessionState::ImageResults {
            request_id: *request_id,
            results: results.clone(),
            recording: recording.clone(),
            recording_voice_over: *recording_voice_over,
            playing: *playing,
            selected,
            show_confirm_dialog: *show_confirm_dialog,
        })
    } else {
        None
    }
}

fn with_dialog(state: &SessionState, show: bool) -> SessionState {
    if let SessionState::ImageResults {
        request_id,
        results,
        recording,
        recording_voice_over,
        playing,
        selected,
        ..
    } = state
    {
        SessionState::ImageResults {
            request_id: *request_id,
            results: results.clone(),
            recording: recording.clone(),
            recording_voice_over: *recording_voice_over,
            playing: *playing,
            selected: *selected,
            show_confirm_dialog: show,
        }
    } else {
        state.clone()
    }
}

fn with_voice_over(state: &SessionState, recording_voice_over: bool) -> SessionState {
    if let SessionState::ImageResults {
        request_id,
        results,
        recording,
        playing,
        selected,
        show_confirm_dialog,
        ..
    } = state
    {
        SessionState::ImageResults {
            request_id: *request_id,
            results: results.clone(),
            recording: recording.clone(),
            recording_voice_over,
            playing: *playing,
            selected: *selected,
            show_confirm_dialog: *show_confirm_dialog,
        }
    } else {
        state.clone()
    }
}

fn with_playing(state: &SessionState, playing: bool) -> SessionState {
    if let SessionState::ImageResults {
        request_id,
        results,
        recording,
        recording_voice_over,
        selected,
        show_confirm_dialog,
        ..
    } = state
    {
        SessionState::ImageResults {
            request_id: *request_id,
            results: results.clone(),
            recording: recording.clone(),
            recording_voice_over: *recording_voice_over,
            playing,
            selected: *selected,
            show_confirm_dialog: *show_confirm_dialog,
        }
    } else {
        state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn reducer() -> Reducer {
        Reducer::new(ReducerConfig {
            grid_first: false,
            amplitude_window: 4,
        })
    }

    fn results(ratings: &[Rating]) -> Vec<QueryResult> {
        ratings
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let mut result = QueryResult::new(format!("label-{i}"), 0.5);
                result.rating = *r;
                result
            })
            .collect()
    }

    fn image_results(
        request_id: Uuid,
        results: Vec<QueryResult>,
        selected: Option<usize>,
    ) -> SessionState {
        SessionState::ImageResults {
            request_id,
            results,
            recording: PathBuf::from("/tmp/query.wav"),
            recording_voice_over: false,
            playing: false,
            selected,
            show_confirm_dialog: false,
        }
    }

    #[test]
    fn test_start_from_idle_begins_streaming() {
        let (state, commands) = reducer().reduce(&SessionState::Idle, &Intent::Start.into());
        let SessionState::Streaming {
            request_id,
            amplitudes,
            results,
        } = &state
        else {
            panic!("expected Streaming, got {}", state.name());
        };
        assert_eq!(amplitudes.len(), 4);
        assert!(results.is_empty());
        assert_eq!(
            commands,
            vec![Command::StartCapture {
                request_id: *request_id
            }]
        );
    }

    #[test]
    fn test_stop_requests_capture_finalization() {
        let (streaming, _) = reducer().reduce(&SessionState::Idle, &Intent::Start.into());
        let id = streaming.request_id().expect("id");

        let (state, commands) = reducer().reduce(&streaming, &Intent::Stop.into());
        // State holds until CaptureStopped arrives
        assert_eq!(state, streaming);
        assert_eq!(commands, vec![Command::StopCapture { request_id: id }]);
    }

    #[test]
    fn test_capture_stopped_enters_processing_and_submits() {
        let (streaming, _) = reducer().reduce(&SessionState::Idle, &Intent::Start.into());
        let id = streaming.request_id().expect("id");
        let file = PathBuf::from("/tmp/q.wav");

        let (state, commands) = reducer().reduce(
            &streaming,
            &Event::CaptureStopped {
                request_id: id,
                file: file.clone(),
            }
            .into(),
        );
        assert!(matches!(state, SessionState::Processing { .. }));
        assert_eq!(state.request_id(), Some(id));
        assert_eq!(
            commands,
            vec![
                Command::CancelHardCap,
                Command::SubmitQuery {
                    request_id: id,
                    file
                }
            ]
        );
    }

    #[test]
    fn test_hard_cap_acts_as_stop() {
        let (streaming, _) = reducer().reduce(&SessionState::Idle, &Intent::Start.into());
        let id = streaming.request_id().expect("id");
        let (state, commands) =
            reducer().reduce(&streaming, &Event::HardCapElapsed { request_id: id }.into());
        assert_eq!(state, streaming);
        assert_eq!(commands, vec![Command::StopCapture { request_id: id }]);
    }

    #[test]
    fn test_amplitude_appends_to_bounded_ring() {
        let (mut state, _) = reducer().reduce(&SessionState::Idle, &Intent::Start.into());
        let id = state.request_id().expect("id");

        for amplitude in [10, 20, 30, 40, 50] {
            (state, _) = reducer().reduce(
                &state,
                &Event::Amplitude {
                    request_id: id,
                    amplitude,
                }
                .into(),
            );
        }
        let SessionState::Streaming { amplitudes, .. } = &state else {
            panic!("expected Streaming");
        };
        // Window of 4: the seed zeros and the oldest amplitude fell out
        assert_eq!(amplitudes, &vec![20, 30, 40, 50]);
    }

    #[test]
    fn test_stale_event_is_dropped() {
        let (streaming, _) = reducer().reduce(&SessionState::Idle, &Intent::Start.into());
        let stale = Uuid::new_v4();

        let (state, commands) = reducer().reduce(
            &streaming,
            &Event::PartialResults {
                request_id: stale,
                results: results(&[Rating::Unrated]),
            }
            .into(),
        );
        assert_eq!(state, streaming);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_partial_results_replace_in_streaming() {
        let (streaming, _) = reducer().reduce(&SessionState::Idle, &Intent::Start.into());
        let id = streaming.request_id().expect("id");

        let (state, commands) = reducer().reduce(
            &streaming,
            &Event::PartialResults {
                request_id: id,
                results: results(&[Rating::Unrated, Rating::Unrated]),
            }
            .into(),
        );
        let SessionState::Streaming { results: r, .. } = &state else {
            panic!("expected Streaming");
        };
        assert_eq!(r.len(), 2);
        // No submission while still streaming
        assert!(commands.is_empty());
    }

    #[test]
    fn test_results_in_processing_are_submitted() {
        let id = Uuid::new_v4();
        let processing = SessionState::Processing {
            request_id: id,
            recording: PathBuf::from("/tmp/q.wav"),
            results: Vec::new(),
        };
        let batch = results(&[Rating::Unrated]);

        let (state, commands) = reducer().reduce(
            &processing,
            &Event::PartialResults {
                request_id: id,
                results: batch.clone(),
            }
            .into(),
        );
        assert!(matches!(state, SessionState::Processing { .. }));
        assert_eq!(
            commands,
            vec![Command::SubmitResults {
                request_id: id,
                results: batch
            }]
        );
    }

    #[test]
    fn test_recognition_finished_shows_results_with_first_selected() {
        let id = Uuid::new_v4();
        let processing = SessionState::Processing {
            request_id: id,
            recording: PathBuf::from("/tmp/q.wav"),
            results: results(&[Rating::Unrated, Rating::Unrated]),
        };

        let (state, commands) =
            reducer().reduce(&processing, &Event::RecognitionFinished { request_id: id }.into());
        let SessionState::ImageResults { selected, .. } = &state else {
            panic!("expected ImageResults");
        };
        assert_eq!(*selected, Some(0));
        assert!(commands.is_empty());
    }

    #[test]
    fn test_grid_first_skips_initial_selection() {
        let reducer = Reducer::new(ReducerConfig {
            grid_first: true,
            amplitude_window: 4,
        });
        let id = Uuid::new_v4();
        let processing = SessionState::Processing {
            request_id: id,
            recording: PathBuf::from("/tmp/q.wav"),
            results: results(&[Rating::Unrated]),
        };
        let (state, _) =
            reducer.reduce(&processing, &Event::RecognitionFinished { request_id: id }.into());
        let SessionState::ImageResults { selected, .. } = &state else {
            panic!("expected ImageResults");
        };
        assert_eq!(*selected, None);
    }

    #[test]
    fn test_recognition_finished_with_no_results_selects_none() {
        let id = Uuid::new_v4();
        let processing = SessionState::Processing {
            request_id: id,
            recording: PathBuf::from("/tmp/q.wav"),
            results: Vec::new(),
        };
        let (state, _) =
            reducer().reduce(&processing, &Event::RecognitionFinished { request_id: id }.into());
        let SessionState::ImageResults { selected, .. } = &state else {
            panic!("expected ImageResults");
        };
        assert_eq!(*selected, None);
    }

    #[test]
    fn test_rate_advances_to_next_unrated() {
        let id = Uuid::new_v4();
        let state = image_results(
            id,
            results(&[Rating::Unrated, Rating::Unrated, Rating::Unrated]),
            Some(0),
        );

        let (state, commands) = reducer().reduce(&state, &Intent::RatePositive.into());
        let SessionState::ImageResults {
            results: r,
            selected,
            ..
        } = &state
        else {
            panic!("expected ImageResults");
        };
        assert_eq!(r[0].rating, Rating::Positive);
        assert_eq!(*selected, Some(1));
        assert!(matches!(
            commands.as_slice(),
            [Command::SubmitRating { result, .. }] if result.rating == Rating::Positive
        ));
    }

    #[test]
    fn test_rate_wraps_to_earlier_unrated() {
        let id = Uuid::new_v4();
        let state = image_results(
            id,
            results(&[Rating::Unrated, Rating::Positive, Rating::Unrated]),
            Some(2),
        );

        let (state, _) = reducer().reduce(&state, &Intent::RateNegative.into());
        let SessionState::ImageResults { selected, .. } = &state else {
            panic!("expected ImageResults");
        };
        // Forward search finds nothing past index 2; wrap finds index 0
        assert_eq!(*selected, Some(0));
    }

    #[test]
    fn test_rating_last_unrated_clears_selection() {
        let id = Uuid::new_v4();
        let state = image_results(
            id,
            results(&[Rating::Positive, Rating::Negative, Rating::Unrated]),
            Some(2),
        );

        let (state, _) = reducer().reduce(&state, &Intent::RatePositive.into());
        let SessionState::ImageResults { selected, .. } = &state else {
            panic!("expected ImageResults");
        };
        assert_eq!(*selected, None);
    }

    #[test]
    fn test_rate_without_selection_is_noop() {
        let id = Uuid::new_v4();
        let state = image_results(id, results(&[Rating::Unrated]), None);
        let (next, commands) = reducer().reduce(&state, &Intent::RatePositive.into());
        assert_eq!(next, state);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_toggle_rating_cycles_without_moving_selection() {
        let id = Uuid::new_v4();
        let state = image_results(id, results(&[Rating::Unrated, Rating::Unrated]), Some(1));

        let (state, commands) = reducer().reduce(&state, &Intent::ToggleRating(0).into());
        let SessionState::ImageResults {
            results: r,
            selected,
            ..
        } = &state
        else {
            panic!("expected ImageResults");
        };
        assert_eq!(r[0].rating, Rating::Positive);
        assert_eq!(*selected, Some(1));
        assert_eq!(commands.len(), 1);

        // Cycle continues: POSITIVE → NEGATIVE → UNRATED
        let (state, _) = reducer().reduce(&state, &Intent::ToggleRating(0).into());
        let (state, _) = reducer().reduce(&state, &Intent::ToggleRating(0).into());
        let SessionState::ImageResults { results: r, .. } = &state else {
            panic!("expected ImageResults");
        };
        assert_eq!(r[0].rating, Rating::Unrated);
    }

    #[test]
    fn test_new_query_dialog_flow() {
        let id = Uuid::new_v4();
        let state = image_results(id, results(&[Rating::Unrated]), Some(0));

        let (state, _) = reducer().reduce(&state, &Intent::NewQuery.into());
        assert!(matches!(
            state,
            SessionState::ImageResults {
                show_confirm_dialog: true,
                ..
            }
        ));

        let (kept, _) = reducer().reduce(&state, &Intent::NewQueryCancel.into());
        assert!(matches!(
            kept,
            SessionState::ImageResults {
                show_confirm_dialog: false,
                ..
            }
        ));

        let (idle, _) = reducer().reduce(&state, &Intent::NewQueryConfirm.into());
        assert_eq!(idle, SessionState::Idle);
    }

    #[test]
    fn test_voice_over_round_trip() {
        let id = Uuid::new_v4();
        let state = image_results(id, results(&[Rating::Unrated]), Some(0));

        let (state, commands) = reducer().reduce(&state, &Intent::RecordVoiceOver.into());
        assert!(matches!(
            state,
            SessionState::ImageResults {
                recording_voice_over: true,
                ..
            }
        ));
        assert_eq!(commands, vec![Command::StartVoiceOver { request_id: id }]);

        // Starting again while recording is a no-op
        let (same, commands) = reducer().reduce(&state, &Intent::RecordVoiceOver.into());
        assert_eq!(same, state);
        assert!(commands.is_empty());

        let (state, commands) = reducer().reduce(&state, &Intent::StopVoiceOver.into());
        assert!(matches!(
            state,
            SessionState::ImageResults {
                recording_voice_over: false,
                ..
            }
        ));
        assert_eq!(commands, vec![Command::StopVoiceOver { request_id: id }]);
    }

    #[test]
    fn test_cancel_from_streaming_stops_everything() {
        let (streaming, _) = reducer().reduce(&SessionState::Idle, &Intent::Start.into());
        let id = streaming.request_id().expect("id");

        let (state, commands) = reducer().reduce(&streaming, &Intent::Cancel.into());
        assert_eq!(state, SessionState::Idle);
        assert_eq!(
            commands,
            vec![
                Command::StopCapture { request_id: id },
                Command::CancelHardCap,
                Command::AbortSubmissions,
            ]
        );
    }

    #[test]
    fn test_capture_stopped_after_cancel_is_dropped() {
        let (streaming, _) = reducer().reduce(&SessionState::Idle, &Intent::Start.into());
        let id = streaming.request_id().expect("id");
        let (idle, _) = reducer().reduce(&streaming, &Intent::Cancel.into());

        let (state, commands) = reducer().reduce(
            &idle,
            &Event::CaptureStopped {
                request_id: id,
                file: PathBuf::from("/tmp/q.wav"),
            }
            .into(),
        );
        assert_eq!(state, SessionState::Idle);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_start_from_image_results_begins_new_query() {
        let id = Uuid::new_v4();
        let state = image_results(id, results(&[Rating::Unrated]), Some(0));

        let (state, commands) = reducer().reduce(&state, &Intent::Start.into());
        assert!(matches!(state, SessionState::Streaming { .. }));
        let new_id = state.request_id().expect("id");
        assert_ne!(new_id, id);
        assert_eq!(
            commands,
            vec![Command::StartCapture {
                request_id: new_id
            }]
        );
    }

    #[test]
    fn test_playback_events_flip_flag() {
        let id = Uuid::new_v4();
        let state = image_results(id, results(&[Rating::Unrated]), Some(0));

        let (state, commands) = reducer().reduce(&state, &Intent::TogglePlayback.into());
        assert_eq!(
            commands,
            vec![Command::TogglePlayback {
                file: PathBuf::from("/tmp/query.wav")
            }]
        );

        let (state, _) =
            reducer().reduce(&state, &Event::PlaybackChanged { playing: true }.into());
        assert!(matches!(
            state,
            SessionState::ImageResults { playing: true, .. }
        ));
    }

    #[test]
    fn test_select_and_deselect() {
        let id = Uuid::new_v4();
        let state = image_results(id, results(&[Rating::Unrated, Rating::Unrated]), None);

        let (state, _) = reducer().reduce(&state, &Intent::SelectImage(1).into());
        assert!(matches!(
            state,
            SessionState::ImageResults {
                selected: Some(1),
                ..
            }
        ));

        // Out-of-range selection is a no-op
        let (same, _) = reducer().reduce(&state, &Intent::SelectImage(9).into());
        assert_eq!(same, state);

        let (state, _) = reducer().reduce(&state, &Intent::DeselectImage.into());
        assert!(matches!(
            state,
            SessionState::ImageResults { selected: None, .. }
        ));
    }

    #[test]
    fn test_next_unrated_index_search() {
        let r = results(&[Rating::Positive, Rating::Unrated, Rating::Positive]);
        assert_eq!(next_unrated_index(0, &r), Some(1));
        assert_eq!(next_unrated_index(2, &r), Some(1));

        let all_rated = results(&[Rating::Positive, Rating::Negative]);
        assert_eq!(next_unrated_index(1, &all_rated), None);

        assert_eq!(next_unrated_index(0, &[]), None);
    }
}
