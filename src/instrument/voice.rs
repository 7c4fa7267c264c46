//! Voices — one oscillator plus gain envelope per scheduled note.
//!
//! A [`Voice`] is a plain value: everything needed to render it is fixed when
//! it is built, including the frequency. Later pitch-shift changes therefore
//! never touch voices that are already scheduled.

use serde::{Deserialize, Serialize};

use crate::composition::{InstrumentType, Note};

use super::envelope::GainEnvelope;
use super::oscillator::Waveform;
use super::timbre::Timbre;

/// Shape constants shared by every voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Linear attack length in seconds.
    pub attack: f64,
    /// Peak gain reached by a note of velocity 1.
    pub peak_scale: f64,
    /// Extra time after the decay before the oscillator stops, in seconds.
    pub release_tail: f64,
    /// Level the exponential decay heads toward.
    pub floor: f64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            attack: 0.02,
            peak_scale: 0.5,
            release_tail: 0.1,
            floor: 0.001,
        }
    }
}

/// Seconds a note sounds for at `bpm`, before the release tail.
pub fn sound_duration(beats: f64, bpm: u32) -> f64 {
    if bpm == 0 || !beats.is_finite() {
        return 0.0;
    }
    beats.max(0.0) * 60.0 / bpm as f64
}

/// A fully scheduled voice on the output clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub frequency: f64,
    pub waveform: Waveform,
    pub envelope: GainEnvelope,
    /// Output-clock time the oscillator starts, in seconds.
    pub start: f64,
    /// Output-clock time the oscillator is torn down, in seconds.
    pub stop: f64,
    /// Scheduling epoch the voice belongs to.
    pub epoch: u64,
}

impl Voice {
    /// Build the voice for `note` starting at absolute time `start`.
    ///
    /// Returns `None` when `bpm` is zero, since no duration can be derived.
    pub fn for_note(
        note: &Note,
        instrument: InstrumentType,
        bpm: u32,
        start: f64,
        shift: i32,
        settings: &VoiceSettings,
        epoch: u64,
    ) -> Option<Self> {
        if bpm == 0 {
            return None;
        }

        let timbre = Timbre::of(instrument);
        let sound = sound_duration(note.duration, bpm);
        let velocity = if note.velocity.is_nan() {
            0.0
        } else {
            note.velocity.clamp(0.0, 1.0)
        };

        let envelope = GainEnvelope::new(
            start,
            settings.attack,
            sound,
            velocity * settings.peak_scale,
            settings.floor,
        );

        Some(Self {
            frequency: timbre.frequency(&note.pitch, shift),
            waveform: timbre.waveform,
            envelope,
            start,
            stop: start + sound + settings.release_tail,
            epoch,
        })
    }

    /// Whether the voice is sounding (started and not yet stopped) at `t`.
    pub fn is_active_at(&self, t: f64) -> bool {
        t >= self.start && t < self.stop
    }

    /// Whether the voice has been torn down by `t`.
    pub fn is_finished_at(&self, t: f64) -> bool {
        t >= self.stop
    }

    /// Output sample at `t` for the given oscillator phase.
    #[inline]
    pub fn sample(&self, t: f64, phase: f64) -> f64 {
        if !self.is_active_at(t) {
            return 0.0;
        }
        self.waveform.sample(phase) * self.envelope.gain_at(t)
    }
}
