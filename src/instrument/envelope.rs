//! Attack/decay gain envelope for scheduled voices.
//!
//! The envelope is described by absolute times on the output clock:
//! - before `start`: 0
//! - `[start, attack_end)`: linear ramp from 0 to `peak`
//! - `[attack_end, decay_end)`: exponential ramp from `peak` toward `floor`
//! - from `decay_end`: holds `floor` until the voice is stopped
//!
//! An exponential ramp never reaches zero, which is why the floor is a small
//! positive value and the voice keeps a short release tail before it stops.

/// Gain automation for one voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainEnvelope {
    pub start: f64,
    pub attack_end: f64,
    pub decay_end: f64,
    pub peak: f64,
    pub floor: f64,
}

impl GainEnvelope {
    /// Envelope for a note starting at `start` and sounding for `sound_duration`
    /// seconds, peaking at `peak` after `attack` seconds.
    pub fn new(start: f64, attack: f64, sound_duration: f64, peak: f64, floor: f64) -> Self {
        Self {
            start,
            attack_end: start + attack.max(0.0),
            decay_end: start + sound_duration.max(0.0),
            peak: peak.max(0.0),
            // Never above the peak.
            floor: floor.max(f64::MIN_POSITIVE).min(peak.max(0.0)),
        }
    }

    /// Whether the envelope can produce any sound at all.
    pub fn is_silent(&self) -> bool {
        self.peak <= 0.0
    }

    /// Gain at absolute time `t`.
    pub fn gain_at(&self, t: f64) -> f64 {
        if self.is_silent() || t < self.start {
            return 0.0;
        }

        if t < self.attack_end {
            let progress = (t - self.start) / (self.attack_end - self.start);
            return self.peak * progress;
        }

        // No room left for the decay: drop straight to the floor.
        if self.decay_end <= self.attack_end {
            return self.floor;
        }

        if t < self.decay_end {
            let progress = (t - self.attack_end) / (self.decay_end - self.attack_end);
            return self.peak * (self.floor / self.peak).powf(progress);
        }

        self.floor
    }
}
