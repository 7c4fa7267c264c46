//! Output clock shared between the audio thread and the control side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Frames rendered by the audio thread, readable from any thread.
#[derive(Debug, Clone)]
pub struct SharedClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl SharedClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate.max(1),
        }
    }

    /// Publish the frame count. Called from the audio thread after each block.
    pub fn store(&self, frames: u64) {
        self.frames.store(frames, Ordering::Release);
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Output time in seconds.
    pub fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
