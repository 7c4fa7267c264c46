//! Audio callback — runs on the cpal audio thread.
//!
//! Drains commands from the ring buffer into the output bus, renders the
//! block, then publishes the frame clock and the latest spectrum.

use std::sync::Arc;

use parking_lot::Mutex;
use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use super::clock::SharedClock;
use super::command::AudioCommand;
use super::mixer::OutputBus;

/// State that lives on the audio thread. Accessed only from the cpal callback.
pub struct AudioCallback {
    consumer: HeapCons<AudioCommand>,
    bus: OutputBus,
    clock: SharedClock,
    spectrum: Arc<Mutex<Vec<u8>>>,
}

impl AudioCallback {
    pub fn new(
        consumer: HeapCons<AudioCommand>,
        bus: OutputBus,
        clock: SharedClock,
        spectrum: Arc<Mutex<Vec<u8>>>,
    ) -> Self {
        Self {
            consumer,
            bus,
            clock,
            spectrum,
        }
    }

    /// Called by cpal for each output block. Fills `output` with samples.
    pub fn process(&mut self, output: &mut [f32]) {
        while let Some(cmd) = self.consumer.try_pop() {
            match cmd {
                AudioCommand::Schedule(voice) => self.bus.schedule(voice),
                AudioCommand::SetMasterGain(g) => self.bus.set_master_gain(g),
                AudioCommand::Silence { epoch } => self.bus.silence(epoch),
            }
        }

        self.bus.render(output);
        self.clock.store(self.bus.frame());

        // Never block the audio thread; a reader holding the lock just gets
        // the previous snapshot next time.
        if let Some(mut shared) = self.spectrum.try_lock() {
            shared.clear();
            shared.extend_from_slice(self.bus.spectrum());
        }
    }

    /// Voices currently held by the bus.
    pub fn voice_count(&self) -> usize {
        self.bus.voice_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mixer::BusSettings;
    use crate::composition::{InstrumentType, Note};
    use crate::instrument::{Voice, VoiceSettings};
    use ringbuf::{
        traits::{Producer, Split},
        HeapRb,
    };

    struct Rig {
        prod: ringbuf::HeapProd<AudioCommand>,
        callback: AudioCallback,
        clock: SharedClock,
        spectrum: Arc<Mutex<Vec<u8>>>,
    }

    fn setup(capacity: usize) -> Rig {
        let rb = HeapRb::<AudioCommand>::new(capacity);
        let (prod, cons) = rb.split();
        let clock = SharedClock::new(44100);
        let spectrum = Arc::new(Mutex::new(Vec::new()));
        let bus = OutputBus::new(44100, 2, &BusSettings::default());
        let callback = AudioCallback::new(cons, bus, clock.clone(), Arc::clone(&spectrum));
        Rig {
            prod,
            callback,
            clock,
            spectrum,
        }
    }

    fn voice(epoch: u64) -> Voice {
        Voice::for_note(
            &Note::new("A3", 0.0, 1.0, 1.0),
            InstrumentType::Bass,
            120,
            0.0,
            0,
            &VoiceSettings::default(),
            epoch,
        )
        .unwrap()
    }

    #[test]
    fn test_callback_silence_on_empty() {
        let mut rig = setup(16);
        let mut output = vec![999.0f32; 64];
        rig.callback.process(&mut output);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_callback_advances_clock() {
        let mut rig = setup(16);
        let mut output = vec![0.0f32; 882];
        rig.callback.process(&mut output);
        assert_eq!(rig.clock.frames(), 441);
        assert!((rig.clock.now() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_callback_plays_scheduled_voice() {
        let mut rig = setup(16);
        rig.prod.try_push(AudioCommand::Schedule(voice(0))).unwrap();

        let mut output = vec![0.0f32; 2048];
        rig.callback.process(&mut output);
        assert!(output.iter().any(|s| s.abs() > 0.01));
        assert_eq!(rig.callback.voice_count(), 1);
    }

    #[test]
    fn test_callback_applies_gain() {
        let mut rig = setup(16);
        rig.prod.try_push(AudioCommand::SetMasterGain(0.0)).unwrap();
        rig.prod.try_push(AudioCommand::Schedule(voice(0))).unwrap();

        let mut output = vec![0.0f32; 2048];
        rig.callback.process(&mut output);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_callback_silence_command_drops_voices() {
        let mut rig = setup(16);
        rig.prod.try_push(AudioCommand::Schedule(voice(0))).unwrap();
        rig.prod.try_push(AudioCommand::Silence { epoch: 1 }).unwrap();

        let mut output = vec![999.0f32; 256];
        rig.callback.process(&mut output);
        assert!(output.iter().all(|&s| s == 0.0));
        assert_eq!(rig.callback.voice_count(), 0);
    }

    #[test]
    fn test_callback_publishes_spectrum() {
        let mut rig = setup(16);
        rig.prod.try_push(AudioCommand::Schedule(voice(0))).unwrap();

        let mut output = vec![0.0f32; 4096];
        rig.callback.process(&mut output);

        let spectrum = rig.spectrum.lock();
        assert_eq!(spectrum.len(), 128);
        assert!(spectrum.iter().any(|&m| m > 0));
    }

    #[test]
    fn test_callback_skips_spectrum_when_locked() {
        let mut rig = setup(16);
        rig.prod.try_push(AudioCommand::Schedule(voice(0))).unwrap();

        let guard = rig.spectrum.lock();
        let mut output = vec![0.0f32; 512];
        rig.callback.process(&mut output);
        assert!(guard.is_empty());
        drop(guard);

        rig.callback.process(&mut output);
        assert_eq!(rig.spectrum.lock().len(), 128);
    }
}
