//! Output bus — the single master gain stage every voice feeds into.
//!
//! The bus owns the scheduled voices, their oscillator phases, the output
//! clock (in frames) and the analyzer tap. It knows nothing about devices:
//! the cpal callback and the offline backend both drive it by calling
//! [`OutputBus::render`].

use serde::{Deserialize, Serialize};

use crate::instrument::{Phase, Voice};

use super::analyzer::{Analyzer, AnalyzerSettings};

/// Initial voice capacity, reserved up front so scheduling rarely allocates
/// on the audio thread.
const VOICE_CAPACITY: usize = 256;

/// Master bus configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSettings {
    /// Master gain applied to the voice sum.
    pub master_gain: f32,
    /// Hard clamp applied after the master gain, in `(0, 1]`.
    pub ceiling: f32,
    pub analyzer: AnalyzerSettings,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            master_gain: 0.5,
            ceiling: 0.95,
            analyzer: AnalyzerSettings::default(),
        }
    }
}

struct ActiveVoice {
    voice: Voice,
    phase: Phase,
}

/// Mixes scheduled voices into interleaved output frames.
pub struct OutputBus {
    voices: Vec<ActiveVoice>,
    master_gain: f32,
    ceiling: f32,
    sample_rate: u32,
    channels: u16,
    frame: u64,
    min_epoch: u64,
    analyzer: Analyzer,
}

impl OutputBus {
    pub fn new(sample_rate: u32, channels: u16, settings: &BusSettings) -> Self {
        Self {
            voices: Vec::with_capacity(VOICE_CAPACITY),
            master_gain: settings.master_gain.clamp(0.0, 1.0),
            ceiling: settings.ceiling.clamp(f32::EPSILON, 1.0),
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
            frame: 0,
            min_epoch: 0,
            analyzer: Analyzer::new(&settings.analyzer),
        }
    }

    /// Add a voice. Voices from an epoch that was already silenced are dropped.
    pub fn schedule(&mut self, voice: Voice) {
        if voice.epoch < self.min_epoch {
            return;
        }
        self.voices.push(ActiveVoice {
            voice,
            phase: Phase::default(),
        });
    }

    /// Set the master gain (clamped to `0.0..=1.0`).
    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 1.0);
    }

    /// Drop every voice older than `epoch`, including ones still waiting to start.
    pub fn silence(&mut self, epoch: u64) {
        self.min_epoch = self.min_epoch.max(epoch);
        let min_epoch = self.min_epoch;
        self.voices.retain(|v| v.voice.epoch >= min_epoch);
    }

    /// Current output-clock time in seconds.
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    /// Voices that are playing or waiting to start.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Latest analyzer output.
    pub fn spectrum(&self) -> &[u8] {
        self.analyzer.byte_frequency_data()
    }

    /// Fill `output` (interleaved, `channels` samples per frame) and advance
    /// the clock by the number of frames written.
    pub fn render(&mut self, output: &mut [f32]) {
        let channels = self.channels as usize;
        let sample_rate = self.sample_rate;

        for frame in output.chunks_mut(channels) {
            let t = self.frame as f64 / sample_rate as f64;

            let mut sum = 0.0_f64;
            for active in self.voices.iter_mut() {
                if !active.voice.is_active_at(t) {
                    continue;
                }
                sum += active.voice.sample(t, active.phase.value());
                active.phase.advance(active.voice.frequency, sample_rate);
            }

            let mixed = (sum as f32 * self.master_gain).clamp(-self.ceiling, self.ceiling);
            frame.fill(mixed);
            self.analyzer.push(mixed);
            self.frame += 1;
        }

        let now = self.current_time();
        self.voices.retain(|v| !v.voice.is_finished_at(now));
        self.analyzer.analyze();
    }
}
