//! Timbre table — maps each instrument category to a waveform and a rule for
//! choosing the oscillator frequency.

use crate::composition::InstrumentType;

use super::oscillator::Waveform;
use super::pitch::resolve_frequency;

/// Kick-like frequency for low drum tokens.
pub const KICK_FREQUENCY: f64 = 60.0;

/// Snare-like frequency for every other drum token.
pub const SNARE_FREQUENCY: f64 = 200.0;

/// Drum tokens whose octave digit is below this play the kick frequency.
const KICK_OCTAVE_LIMIT: u32 = 3;

/// How a timbre turns a pitch token into an oscillator frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyRule {
    /// Equal-tempered pitch, transposed by the global shift.
    Harmonic,
    /// Fixed kick or snare frequency chosen by the token's octave digit.
    /// The global shift does not apply.
    Percussive,
}

/// Waveform plus frequency rule for one instrument category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timbre {
    pub waveform: Waveform,
    pub rule: FrequencyRule,
}

impl Timbre {
    /// Timbre for an instrument category.
    pub fn of(instrument: InstrumentType) -> Self {
        let (waveform, rule) = match instrument {
            InstrumentType::Bass => (Waveform::Sawtooth, FrequencyRule::Harmonic),
            InstrumentType::Pad => (Waveform::Sine, FrequencyRule::Harmonic),
            InstrumentType::Pluck => (Waveform::Triangle, FrequencyRule::Harmonic),
            InstrumentType::Drums => (Waveform::Square, FrequencyRule::Percussive),
            InstrumentType::Synth => (Waveform::Square, FrequencyRule::Harmonic),
        };
        Self { waveform, rule }
    }

    /// Oscillator frequency for `pitch` under this timbre.
    pub fn frequency(&self, pitch: &str, shift: i32) -> f64 {
        match self.rule {
            FrequencyRule::Harmonic => resolve_frequency(pitch, shift),
            FrequencyRule::Percussive => percussive_frequency(pitch),
        }
    }
}

/// Kick for a trailing octave digit below 3, snare otherwise (including tokens
/// without a trailing digit).
fn percussive_frequency(pitch: &str) -> f64 {
    match pitch.chars().last().and_then(|c| c.to_digit(10)) {
        Some(octave) if octave < KICK_OCTAVE_LIMIT => KICK_FREQUENCY,
        _ => SNARE_FREQUENCY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn waveform_per_instrument() {
        assert_eq!(Timbre::of(InstrumentType::Bass).waveform, Waveform::Sawtooth);
        assert_eq!(Timbre::of(InstrumentType::Pad).waveform, Waveform::Sine);
        assert_eq!(Timbre::of(InstrumentType::Pluck).waveform, Waveform::Triangle);
        assert_eq!(Timbre::of(InstrumentType::Drums).waveform, Waveform::Square);
        assert_eq!(Timbre::of(InstrumentType::Synth).waveform, Waveform::Square);
    }

    #[test]
    fn only_drums_are_percussive() {
        for i in InstrumentType::ALL {
            let expected = if i == InstrumentType::Drums {
                FrequencyRule::Percussive
            } else {
                FrequencyRule::Harmonic
            };
            assert_eq!(Timbre::of(i).rule, expected, "{i:?}");
        }
    }

    #[test]
    fn drum_tokens_split_by_octave() {
        let drums = Timbre::of(InstrumentType::Drums);
        assert_eq!(drums.frequency("C1", 0), KICK_FREQUENCY);
        assert_eq!(drums.frequency("C2", 0), KICK_FREQUENCY);
        assert_eq!(drums.frequency("D3", 0), SNARE_FREQUENCY);
        assert_eq!(drums.frequency("F#5", 0), SNARE_FREQUENCY);
        assert_eq!(drums.frequency("snare", 0), SNARE_FREQUENCY);
        assert_eq!(drums.frequency("", 0), SNARE_FREQUENCY);
    }

    #[test]
    fn drums_ignore_pitch_shift() {
        let drums = Timbre::of(InstrumentType::Drums);
        assert_eq!(drums.frequency("C2", 12), KICK_FREQUENCY);
    }

    #[test]
    fn harmonic_follows_shift() {
        let pad = Timbre::of(InstrumentType::Pad);
        assert_approx_eq!(pad.frequency("A4", 0), 440.0, 1e-9);
        assert_approx_eq!(pad.frequency("A4", 12), 880.0, 1e-9);
    }
}
