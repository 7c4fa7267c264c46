//! Snippet scheduler — turns fractional note positions into absolute delays.

use crate::composition::Composition;
use crate::studio::Studio;

/// Beats spanned by one snippet. A snippet always covers one 4-beat measure.
pub const BEATS_PER_SNIPPET: f64 = 4.0;

/// Seconds from the start of a snippet to a note at `start_time` (fraction of
/// the snippet) at `bpm`. Zero when `bpm` is zero.
pub fn snippet_delay(start_time: f64, bpm: u32) -> f64 {
    if bpm == 0 {
        return 0.0;
    }
    start_time * BEATS_PER_SNIPPET * (60.0 / bpm as f64)
}

/// One transport pass: play the first snippet of every unmuted track, in
/// stored track order, at the composition's current tempo.
///
/// Returns the number of voices scheduled.
pub fn schedule_pass(studio: &mut Studio, composition: &Composition) -> usize {
    let mut scheduled = 0;
    for track in composition.audible_tracks() {
        let Some(snippet) = track.active_snippet() else {
            continue;
        };
        scheduled += studio.play_snippet(snippet, composition.bpm).len();
    }
    log::debug!(
        "pass over {:?}: {scheduled} voice(s) at {} bpm",
        composition.title,
        composition.bpm
    );
    scheduled
}
