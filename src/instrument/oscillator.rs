//! Oscillator primitives — phase-driven waveform generation for voices.

use std::f64::consts::PI;

/// Available waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Sawtooth,
    Square,
    Triangle,
}

impl Waveform {
    /// Sample the waveform at `phase` in `[0, 1)`. Returns a value in `[-1, 1]`.
    ///
    /// Every shape starts its cycle at zero or its positive half, matching the
    /// usual oscillator conventions (sine rises, square starts high).
    pub fn sample(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (phase * 2.0 * PI).sin(),
            Waveform::Sawtooth => {
                // Rises from 0 to 1, wraps to -1 at mid-cycle.
                if phase < 0.5 {
                    2.0 * phase
                } else {
                    2.0 * phase - 2.0
                }
            }
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
        }
    }
}

/// Running phase accumulator for one oscillator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Phase(f64);

impl Phase {
    /// Current phase in `[0, 1)`.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Advance by one sample of `frequency` at `sample_rate`.
    #[inline]
    pub fn advance(&mut self, frequency: f64, sample_rate: u32) {
        self.0 = (self.0 + frequency / sample_rate as f64).fract();
    }
}
