//! Audio engine — dedicated thread, lock-free queue, single master bus, spectrum tap.
//!
//! The audio engine owns the cpal output stream and communicates with it via a
//! lock-free ring buffer. The control thread sends [`AudioCommand`]s to the
//! audio thread, which drains them in its callback, mixes every scheduled
//! voice through the [`OutputBus`] and publishes the output clock and the
//! latest analyzer snapshot back.
//!
//! [`OutputBackend`] is the seam the studio talks to; [`OfflineBackend`] is a
//! manually clocked implementation for tests and headless use.

pub mod analyzer;
pub mod callback;
pub mod clock;
pub mod command;
pub mod mixer;
pub mod offline;

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Producer, Split},
    HeapRb,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use analyzer::{Analyzer, AnalyzerSettings};
pub use clock::SharedClock;
pub use command::AudioCommand;
pub use mixer::{BusSettings, OutputBus};
pub use offline::OfflineBackend;

use crate::instrument::Voice;
use callback::AudioCallback;

/// Ring buffer capacity (number of commands).
const RING_BUFFER_CAPACITY: usize = 1024;

/// Audio engine errors.
#[derive(Debug, Error)]
pub enum AudioError {
    /// No audio output device found.
    #[error("no audio output device found")]
    NoOutputDevice,
    /// Failed to query device configuration.
    #[error("device config error: {0}")]
    DeviceConfig(String),
    /// Failed to build the audio stream.
    #[error("stream build error: {0}")]
    StreamBuild(String),
    /// Failed to start or pause the audio stream.
    #[error("stream play error: {0}")]
    StreamPlay(String),
    /// Ring buffer is full — audio thread is not draining fast enough.
    #[error("audio command ring buffer is full")]
    BufferFull,
}

/// Optional overrides for the output device configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// Where scheduled voices go.
///
/// Times are seconds on the backend's own output clock.
pub trait OutputBackend {
    /// Current output-clock time in seconds.
    fn current_time(&self) -> f64;

    /// Hand a fully scheduled voice to the master bus.
    fn schedule(&mut self, voice: Voice) -> Result<(), AudioError>;

    fn set_master_gain(&mut self, gain: f32) -> Result<(), AudioError>;

    /// Drop every voice from an epoch older than `epoch`.
    fn silence(&mut self, epoch: u64) -> Result<(), AudioError>;

    /// Resume output if suspended. A no-op when already running.
    fn resume(&mut self) -> Result<(), AudioError>;

    fn suspend(&mut self) -> Result<(), AudioError>;

    /// Latest byte-magnitude snapshot of the master bus.
    fn spectrum(&self) -> Vec<u8>;
}

/// The audio engine. Owns the cpal stream and ring buffer producer.
///
/// Created on the control thread, sends commands to the audio thread via the
/// lock-free ring buffer.
pub struct AudioEngine {
    stream: cpal::Stream,
    producer: ringbuf::HeapProd<AudioCommand>,
    clock: SharedClock,
    spectrum: Arc<Mutex<Vec<u8>>>,
    sample_rate: u32,
    channels: u16,
    suspended: bool,
}

impl AudioEngine {
    /// Create and start the audio engine with the default output device and
    /// default bus settings.
    pub fn new() -> Result<Self, AudioError> {
        Self::open(&DeviceSettings::default(), &BusSettings::default())
    }

    /// Create and start the audio engine on the default output device.
    ///
    /// `device` overrides the device's preferred sample rate and channel count.
    pub fn open(device: &DeviceSettings, bus: &BusSettings) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let output = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let config = output
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

        let sample_rate = device.sample_rate.unwrap_or(config.sample_rate().0);
        let channels = device.channels.unwrap_or(config.channels());

        Self::build_with_device(&output, sample_rate, channels, bus)
    }

    /// Internal builder: sets up ring buffer, callback, and stream.
    fn build_with_device(
        device: &cpal::Device,
        sample_rate: u32,
        channels: u16,
        bus_settings: &BusSettings,
    ) -> Result<Self, AudioError> {
        let rb = HeapRb::<AudioCommand>::new(RING_BUFFER_CAPACITY);
        let (producer, consumer) = rb.split();

        let clock = SharedClock::new(sample_rate);
        let spectrum = Arc::new(Mutex::new(Vec::new()));
        let bus = OutputBus::new(sample_rate, channels, bus_settings);
        let mut audio_callback =
            AudioCallback::new(consumer, bus, clock.clone(), Arc::clone(&spectrum));

        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_fn = |err: cpal::StreamError| {
            log::error!("audio stream error: {err}");
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    audio_callback.process(data);
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

        log::info!("audio output opened: {sample_rate} Hz, {channels} channel(s)");

        Ok(Self {
            stream,
            producer,
            clock,
            spectrum,
            sample_rate,
            channels,
            suspended: false,
        })
    }

    fn send(&mut self, cmd: AudioCommand) -> Result<(), AudioError> {
        self.producer
            .try_push(cmd)
            .map_err(|_| AudioError::BufferFull)
    }

    /// Get the sample rate of the audio stream.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of output channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl OutputBackend for AudioEngine {
    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn schedule(&mut self, voice: Voice) -> Result<(), AudioError> {
        self.send(AudioCommand::Schedule(voice))
    }

    fn set_master_gain(&mut self, gain: f32) -> Result<(), AudioError> {
        self.send(AudioCommand::SetMasterGain(gain))
    }

    fn silence(&mut self, epoch: u64) -> Result<(), AudioError> {
        self.send(AudioCommand::Silence { epoch })
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        if !self.suspended {
            return Ok(());
        }
        self.stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;
        self.suspended = false;
        log::debug!("audio output resumed");
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), AudioError> {
        self.stream
            .pause()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;
        self.suspended = true;
        log::debug!("audio output suspended");
        Ok(())
    }

    fn spectrum(&self) -> Vec<u8> {
        self.spectrum.lock().clone()
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        log::info!("audio output closed");
    }
}
