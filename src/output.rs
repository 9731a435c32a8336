//! Terminal rendering for the CLI session.
//!
//! A live amplitude meter while streaming and a result table with
//! colored confidence and rating glyphs on the results screen.

use crate::session::state::{QueryResult, Rating};
use std::io::{self, Write};

const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Meter bar width in characters.
const METER_WIDTH: usize = 30;

/// Amplitude at which the meter saturates. RMS of speech at normal
/// levels sits well below full scale.
const METER_FULL_SCALE: i32 = 8192;

/// Clear the current terminal line (replaces the level meter).
pub fn clear_line() {
    eprint!("\r\x1b[2K");
}

/// Return the ANSI color code for a confidence value.
fn confidence_color(confidence: f64) -> &'static str {
    if confidence >= 0.8 {
        GREEN
    } else if confidence >= 0.5 {
        YELLOW
    } else {
        RED
    }
}

/// Glyph for a rating: `+`, `-`, or `·`.
pub fn rating_glyph(rating: Rating) -> &'static str {
    match rating {
        Rating::Positive => "+",
        Rating::Negative => "-",
        Rating::Unrated => "·",
    }
}

/// Build a level bar like `[#######---------------]` from an RMS
/// amplitude.
pub fn format_meter(amplitude: i32) -> String {
    let clamped = amplitude.clamp(0, METER_FULL_SCALE);
    let filled = (clamped as usize * METER_WIDTH) / METER_FULL_SCALE as usize;
    let mut bar = String::with_capacity(METER_WIDTH + 2);
    bar.push('[');
    for i in 0..METER_WIDTH {
        bar.push(if i < filled { '#' } else { '-' });
    }
    bar.push(']');
    bar
}

/// Draw the live meter in place on stderr.
pub fn show_meter(amplitude: i32) {
    eprint!("\r{}rec{} {}", RED, RESET, format_meter(amplitude));
    let _ = io::stderr().flush();
}

/// Render the result table to stdout.
///
/// The selected row is marked with `>`; ratings render as glyphs next
/// to each label.
pub fn render_results(results: &[QueryResult], selected: Option<usize>) {
    if results.is_empty() {
        println!("{}no results{}", DIM, RESET);
        return;
    }
    for (index, result) in results.iter().enumerate() {
        let marker = if selected == Some(index) { ">" } else { " " };
        let color = confidence_color(result.confidence);
        println!(
            "{marker} {index:>2}. [{glyph}] {bold}{label}{reset} {color}{confidence:.2}{reset}",
            glyph = rating_glyph(result.rating),
            bold = BOLD,
            label = result.label,
            reset = RESET,
            color = color,
            confidence = result.confidence,
        );
    }
}
