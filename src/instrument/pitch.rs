//! Pitch resolution — converts "C4", "A#3", "eb2" plus a global transposition
//! into an equal-tempered frequency.
//!
//! Malformed tokens never fail: they resolve to [`FALLBACK_FREQUENCY`] so that
//! sloppy generated content stays audible instead of breaking playback.

/// Reference tuning: A4 = 440 Hz.
pub const REFERENCE_FREQUENCY: f64 = 440.0;

/// Frequency used for tokens that do not parse.
pub const FALLBACK_FREQUENCY: f64 = 440.0;

/// Semitone index of A4 counted from C0.
pub const A4_INDEX: i32 = 57;

/// Parse a pitch token into a semitone index counted from C0.
///
/// Format: `<letter><optional accidental><octave>`
/// - Letter: A–G, either case
/// - Accidental: `#` (sharp) or `b` (flat)
/// - Octave: a single digit 0–9
///
/// Accidentals are applied arithmetically, so `B#3` equals `C4` and `Cb4`
/// equals `B3`.
pub fn semitone_index(token: &str) -> Option<i32> {
    let mut chars = token.chars();

    let class = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut next = chars.next()?;
    let accidental = match next {
        '#' => 1,
        'b' => -1,
        _ => 0,
    };
    if accidental != 0 {
        next = chars.next()?;
    }

    let octave = next.to_digit(10)? as i32;
    if chars.next().is_some() {
        return None;
    }

    Some(octave * 12 + class + accidental)
}

/// Frequency of a semitone index relative to C0, equal temperament.
pub fn index_to_frequency(index: i32) -> f64 {
    REFERENCE_FREQUENCY * 2.0f64.powf((index - A4_INDEX) as f64 / 12.0)
}

/// Resolve a pitch token to a frequency after transposing by `shift` semitones.
///
/// The shift is added to the semitone index before the exponent, so it moves
/// tuning rather than level. Unparseable tokens yield [`FALLBACK_FREQUENCY`].
pub fn resolve_frequency(token: &str, shift: i32) -> f64 {
    match semitone_index(token) {
        Some(index) => index_to_frequency(index + shift),
        None => {
            log::trace!("unparseable pitch {token:?}, using fallback frequency");
            FALLBACK_FREQUENCY
        }
    }
}
