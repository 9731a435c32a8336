//! Voice query application entry point.
//!
//! Orchestrates the complete flow: record → stream to the recognizer →
//! show results → rate/comment → upload. The terminal stands in for
//! the visual UI: a line-oriented prompt feeds intents into the
//! session, a watcher task renders state changes.

use crate::api::QueryApi;
use crate::asr::client::CloudRecognizer;
use crate::audio::capture::CpalCaptureSource;
use crate::audio::playback::NullPlayer;
use crate::audio::recorder::{QueryRecorder, RecorderConfig};
use crate::config::Config;
use crate::error::Result;
use crate::output;
use crate::session::runtime::{RuntimeConfig, SessionHandle, SessionRuntime};
use crate::session::state::{Intent, SessionState};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Run an interactive voice query session.
///
/// # Arguments
/// * `config` - Base configuration (can be overridden by CLI args)
/// * `device` - Optional device override from CLI
/// * `model` - Optional model override from CLI
/// * `max_duration` - Optional hard-cap override from CLI, in seconds
/// * `quiet` - Suppress status messages
/// * `verbosity` - Verbosity level (0=default, 1=meter+results, 2=full diagnostics)
pub async fn run_query_command(
    mut config: Config,
    device: Option<String>,
    model: Option<String>,
    max_duration: Option<u64>,
    quiet: bool,
    verbosity: u8,
) -> Result<()> {
    // Apply CLI overrides
    if let Some(d) = device {
        config.audio.device = Some(d);
    }
    if let Some(m) = model {
        config.asr.model = m;
    }
    if let Some(secs) = max_duration {
        config.query.max_duration_secs = secs;
    }
    config.validate()?;

    let source = CpalCaptureSource::with_frame_samples(
        config.audio.device.as_deref(),
        config.audio.frame_samples,
    )?;
    let recorder = QueryRecorder::with_config(
        source,
        RecorderConfig {
            sample_rate: config.audio.sample_rate,
            ..RecorderConfig::default()
        },
    );
    let recognizer =
        Arc::new(CloudRecognizer::new(&config.asr).with_sample_rate(config.audio.sample_rate));
    let api = Arc::new(QueryApi::new(&config.api));
    let player = Arc::new(NullPlayer::new());

    let runtime_config = RuntimeConfig::from_config(&config).with_verbosity(verbosity);
    let (runtime, handle) = SessionRuntime::new(runtime_config, recorder, recognizer, api, player);

    let runtime_task = tokio::spawn(runtime.run());
    // The render task observes state only; holding a full handle here
    // would keep the runtime's input channel open forever.
    let render_task = tokio::spawn(render_loop(handle.subscribe(), quiet, verbosity));

    if !quiet {
        print_help();
    }
    prompt_loop(handle).await?;

    // The last handle is gone; the runtime ends once its pumps drain,
    // which also closes the state watch and stops the renderer.
    if let Err(e) = runtime_task.await {
        eprintln!("voiq: session runtime failed: {}", e);
    }
    let _ = render_task.await;
    Ok(())
}

fn print_help() {
    println!("commands:");
    println!("  start | stop | cancel      control the voice query");
    println!("  rate + | rate -            rate the selected result");
    println!("  toggle N | select N | deselect");
    println!("  comment | comment stop     record a voice-over comment");
    println!("  play                       toggle playback of the recording");
    println!("  new | yes | no             start over (with confirmation)");
    println!("  quit                       exit");
}

/// Read stdin lines and dispatch the mapped intents until EOF/quit.
async fn prompt_loop(handle: SessionHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_lowercase();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "q" {
            break;
        }
        match parse_intent(&line) {
            Some(intent) => handle.dispatch(intent).await?,
            None => eprintln!("voiq: unknown command: {}", line),
        }
    }
    // Wind down any in-flight query so the capture loop releases the
    // device and the pipeline pumps drain.
    let _ = handle.dispatch(Intent::Cancel).await;
    Ok(())
}

/// Map one prompt line to a session intent.
fn parse_intent(line: &str) -> Option<Intent> {
    let mut words = line.split_whitespace();
    let command = words.next()?;
    let argument = words.next();

    match (command, argument) {
        ("start", None) => Some(Intent::Start),
        ("stop", None) => Some(Intent::Stop),
        ("cancel", None) => Some(Intent::Cancel),
        ("rate", Some("+")) => Some(Intent::RatePositive),
        ("rate", Some("-")) => Some(Intent::RateNegative),
        ("toggle", Some(n)) => n.parse().ok().map(Intent::ToggleRating),
        ("select", Some(n)) => n.parse().ok().map(Intent::SelectImage),
        ("deselect", None) => Some(Intent::DeselectImage),
        ("comment", None) => Some(Intent::RecordVoiceOver),
        ("comment", Some("stop")) => Some(Intent::StopVoiceOver),
        ("play", None) => Some(Intent::TogglePlayback),
        ("new", None) => Some(Intent::NewQuery),
        ("yes", None) => Some(Intent::NewQueryConfirm),
        ("no", None) => Some(Intent::NewQueryCancel),
        _ => None,
    }
}

/// Render state changes: live meter while streaming, result table on
/// entering the results screen.
async fn render_loop(
    mut states: tokio::sync::watch::Receiver<SessionState>,
    quiet: bool,
    verbosity: u8,
) {
    let mut last_name = "";

    loop {
        {
            let state = states.borrow_and_update().clone();
            let entered = state.name() != last_name;
            last_name = state.name();

            match &state {
                SessionState::Idle => {
                    if entered && !quiet {
                        output::clear_line();
                        println!("idle — type 'start' to begin a query");
                    }
                }
                SessionState::Streaming { amplitudes, .. } => {
                    if !quiet && verbosity >= 1 {
                        output::show_meter(amplitudes.last().copied().unwrap_or(0));
                    }
                }
                SessionState::Processing { .. } => {
                    if entered && !quiet {
                        output::clear_line();
                        println!("processing…");
                    }
                }
                SessionState::ImageResults {
                    results,
                    selected,
                    show_confirm_dialog,
                    recording_voice_over,
                    ..
                } => {
                    if entered && !quiet {
                        output::clear_line();
                        output::render_results(results, *selected);
                    }
                    if *show_confirm_dialog && !quiet {
                        println!("start a new query? (yes/no)");
                    }
                    if *recording_voice_over && !quiet && verbosity >= 1 {
                        eprintln!("voiq: recording voice-over…");
                    }
                }
            }
        }

        if states.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intents() {
        assert_eq!(parse_intent("start"), Some(Intent::Start));
        assert_eq!(parse_intent("rate +"), Some(Intent::RatePositive));
        assert_eq!(parse_intent("rate -"), Some(Intent::RateNegative));
        assert_eq!(parse_intent("toggle 3"), Some(Intent::ToggleRating(3)));
        assert_eq!(parse_intent("select 0"), Some(Intent::SelectImage(0)));
        assert_eq!(parse_intent("comment"), Some(Intent::RecordVoiceOver));
        assert_eq!(parse_intent("comment stop"), Some(Intent::StopVoiceOver));
        assert_eq!(parse_intent("yes"), Some(Intent::NewQueryConfirm));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(parse_intent("frobnicate"), None);
        assert_eq!(parse_intent("toggle abc"), None);
        assert_eq!(parse_intent("rate"), None);
    }
}
