//! Offline backend — the output bus driven by hand instead of by a device.
//!
//! Time only moves when [`OfflineBackend::render`] is called, which makes it
//! the backend of choice for tests and headless hosts.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::instrument::Voice;

use super::mixer::{BusSettings, OutputBus};
use super::{AudioError, OutputBackend};

struct OfflineState {
    bus: OutputBus,
    scheduled: Vec<Voice>,
    suspended: bool,
}

/// Manually clocked [`OutputBackend`].
///
/// Clones share state, so a test can hand one clone to a `Studio` and keep
/// another to render and inspect.
#[derive(Clone)]
pub struct OfflineBackend {
    inner: Arc<Mutex<OfflineState>>,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32, channels: u16, settings: &BusSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(OfflineState {
                bus: OutputBus::new(sample_rate, channels, settings),
                scheduled: Vec::new(),
                suspended: false,
            })),
        }
    }

    /// Render `frames` frames and return them interleaved.
    ///
    /// While suspended the clock does not move and nothing is returned.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut state = self.inner.lock();
        if state.suspended {
            return Vec::new();
        }
        let mut out = vec![0.0; frames * state.bus.channels() as usize];
        state.bus.render(&mut out);
        out
    }

    /// Every voice ever scheduled, in scheduling order.
    pub fn scheduled(&self) -> Vec<Voice> {
        self.inner.lock().scheduled.clone()
    }

    /// Voices the bus still holds (playing or waiting to start).
    pub fn active_voices(&self) -> usize {
        self.inner.lock().bus.voice_count()
    }

    pub fn is_suspended(&self) -> bool {
        self.inner.lock().suspended
    }

    pub fn master_gain(&self) -> f32 {
        self.inner.lock().bus.master_gain()
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.lock().bus.sample_rate()
    }
}

impl OutputBackend for OfflineBackend {
    fn current_time(&self) -> f64 {
        self.inner.lock().bus.current_time()
    }

    fn schedule(&mut self, voice: Voice) -> Result<(), AudioError> {
        let mut state = self.inner.lock();
        state.scheduled.push(voice);
        state.bus.schedule(voice);
        Ok(())
    }

    fn set_master_gain(&mut self, gain: f32) -> Result<(), AudioError> {
        self.inner.lock().bus.set_master_gain(gain);
        Ok(())
    }

    fn silence(&mut self, epoch: u64) -> Result<(), AudioError> {
        self.inner.lock().bus.silence(epoch);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.inner.lock().suspended = false;
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), AudioError> {
        self.inner.lock().suspended = true;
        Ok(())
    }

    fn spectrum(&self) -> Vec<u8> {
        self.inner.lock().bus.spectrum().to_vec()
    }
}
