//! Spectral analyzer tap on the master bus.
//!
//! Produces byte magnitudes the way a browser analyser node does: Blackman
//! window, magnitude scaled by `1/N`, exponential smoothing over successive
//! analyses, then a linear map of the decibel value from
//! `[min_db, max_db]` onto `0..=255`.

use std::f32::consts::PI;
use std::sync::Arc;

use realfft::num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 2048;

/// Analyzer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    /// FFT length. Rounded up to a power of two within 32..=2048.
    pub fft_size: usize,
    /// Weight of the previous analysis, in `[0, 1)`.
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyzerSettings {
    /// The FFT length actually used.
    pub fn effective_fft_size(&self) -> usize {
        self.fft_size
            .clamp(MIN_FFT_SIZE, MAX_FFT_SIZE)
            .next_power_of_two()
    }
}

/// Rolling FFT analyzer producing a fixed-size byte spectrum.
pub struct Analyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    history: Vec<f32>,
    write_pos: usize,
    window: Vec<f32>,
    windowed: Vec<f32>,
    spectrum: Vec<Complex32>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl Analyzer {
    pub fn new(settings: &AnalyzerSettings) -> Self {
        let size = settings.effective_fft_size();
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let spectrum = fft.make_output_vec();

        let window = (0..size)
            .map(|i| {
                let x = i as f32 / size as f32;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();

        let bins = size / 2;
        let (min_db, max_db) = if settings.max_db > settings.min_db {
            (settings.min_db, settings.max_db)
        } else {
            let defaults = AnalyzerSettings::default();
            (defaults.min_db, defaults.max_db)
        };

        Self {
            fft,
            history: vec![0.0; size],
            write_pos: 0,
            window,
            windowed: vec![0.0; size],
            spectrum,
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
            smoothing: settings.smoothing.clamp(0.0, 0.999),
            min_db,
            max_db,
        }
    }

    /// FFT length.
    pub fn fft_size(&self) -> usize {
        self.history.len()
    }

    /// Number of magnitude bins (half the FFT length).
    pub fn bin_count(&self) -> usize {
        self.bytes.len()
    }

    /// Center frequency of bin `k` at `sample_rate`.
    pub fn bin_frequency(&self, k: usize, sample_rate: u32) -> f32 {
        k as f32 * sample_rate as f32 / self.fft_size() as f32
    }

    /// Feed one post-gain sample.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.history[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.history.len();
    }

    /// Run one analysis over the most recent `fft_size` samples.
    pub fn analyze(&mut self) {
        let size = self.history.len();
        for i in 0..size {
            let sample = self.history[(self.write_pos + i) % size];
            self.windowed[i] = sample * self.window[i];
        }

        if self.fft.process(&mut self.windowed, &mut self.spectrum).is_err() {
            return;
        }

        let scale = 1.0 / size as f32;
        let range = self.max_db - self.min_db;
        for k in 0..self.bytes.len() {
            let magnitude = self.spectrum[k].norm() * scale;
            let smoothed = self.smoothing * self.smoothed[k] + (1.0 - self.smoothing) * magnitude;
            self.smoothed[k] = smoothed;

            self.bytes[k] = if smoothed <= 0.0 {
                0
            } else {
                let db = 20.0 * smoothed.log10();
                (255.0 * (db - self.min_db) / range).clamp(0.0, 255.0) as u8
            };
        }
    }

    /// Latest byte magnitudes, one per bin.
    pub fn byte_frequency_data(&self) -> &[u8] {
        &self.bytes
    }
}
