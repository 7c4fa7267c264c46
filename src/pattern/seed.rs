//! Snippet seeding — turn generator output into playable snippets.
//!
//! Snippets span four beats. Start times are fractions of that span, so a
//! pulse of an `n`-step rhythm lasts `4 / n` beats.

use crate::composition::{InstrumentType, Note, Snippet};

use super::{euclidean_rhythm, fibonacci, golden_ratio_points};

const SNIPPET_BEATS: f64 = 4.0;

fn snippet(name: &str, instrument: InstrumentType, notes: Vec<Note>, label: String) -> Snippet {
    Snippet {
        id: name.to_lowercase().replace(' ', "-"),
        name: name.to_string(),
        instrument,
        notes,
        color: String::new(),
        math_pattern: label,
        complexity: 0.0,
        is_locked: false,
    }
}

/// One note per onset of `E(onsets, pulses)`, each lasting one pulse.
pub fn euclidean_snippet(
    name: &str,
    instrument: InstrumentType,
    onsets: usize,
    pulses: usize,
    pitch: &str,
    velocity: f64,
) -> Snippet {
    let pulse_beats = if pulses == 0 {
        0.0
    } else {
        SNIPPET_BEATS / pulses as f64
    };
    let notes = euclidean_rhythm(onsets, pulses)
        .into_iter()
        .enumerate()
        .filter(|&(_, hit)| hit == 1)
        .map(|(i, _)| Note::new(pitch, i as f64 / pulses as f64, pulse_beats, velocity))
        .collect();
    snippet(
        name,
        instrument,
        notes,
        format!("Euclidean Rhythm E({onsets},{pulses})"),
    )
}

/// `count` notes placed at golden-ratio start times, cycling through `pitches`.
///
/// Returns an empty snippet when `pitches` is empty.
pub fn golden_snippet(
    name: &str,
    instrument: InstrumentType,
    pitches: &[&str],
    count: usize,
    velocity: f64,
) -> Snippet {
    let notes = if pitches.is_empty() {
        Vec::new()
    } else {
        golden_ratio_points(count)
            .into_iter()
            .enumerate()
            .map(|(i, start)| Note::new(pitches[i % pitches.len()], start, 0.5, velocity))
            .collect()
    };
    snippet(name, instrument, notes, "Golden Ratio Distribution".to_string())
}

/// `length` evenly spaced notes whose pitch index follows the Fibonacci
/// sequence modulo the number of available pitches.
pub fn fibonacci_snippet(
    name: &str,
    instrument: InstrumentType,
    pitches: &[&str],
    length: usize,
    velocity: f64,
) -> Snippet {
    let notes = if pitches.is_empty() || length == 0 {
        Vec::new()
    } else {
        let step_beats = SNIPPET_BEATS / length as f64;
        fibonacci(length)
            .into_iter()
            .enumerate()
            .map(|(i, term)| {
                let pitch = pitches[(term % pitches.len() as u64) as usize];
                Note::new(pitch, i as f64 / length as f64, step_beats, velocity)
            })
            .collect()
    };
    snippet(name, instrument, notes, "Fibonacci Sequence".to_string())
}
