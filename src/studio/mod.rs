//! Studio — the engine context every sound request goes through.
//!
//! A [`Studio`] owns the output backend, the global pitch shift and the
//! configuration. Nothing is opened until the first note is played; if opening
//! fails the studio stays silent (every request is a no-op) until
//! [`Studio::dispose`] resets it.

pub mod config;

pub use config::{
    default_config_path, load_config, load_config_from, save_config, ConfigError, StudioConfig,
};

use crate::audio::{AudioEngine, AudioError, OutputBackend};
use crate::composition::{Composition, InstrumentType, Note, Snippet};
use crate::instrument::Voice;
use crate::sequencer::scheduler::snippet_delay;

/// Opens the output backend on first use.
pub type BackendFactory =
    Box<dyn FnMut(&StudioConfig) -> Result<Box<dyn OutputBackend>, AudioError>>;

enum Backend {
    Closed,
    Open(Box<dyn OutputBackend>),
    /// Opening failed; stay silent until dispose.
    Unavailable,
}

/// Engine context: lazily opened output plus the studio-wide pitch shift.
pub struct Studio {
    config: StudioConfig,
    factory: BackendFactory,
    backend: Backend,
    pitch_shift: i32,
    epoch: u64,
    /// Latest stop time among voices still allowed to sound.
    last_stop: Option<f64>,
}

impl Studio {
    /// A studio that plays through the default cpal output device.
    pub fn new(config: StudioConfig) -> Self {
        Self::with_backend_factory(config, |config: &StudioConfig| {
            let engine = AudioEngine::open(&config.device, &config.bus)?;
            Ok(Box::new(engine) as Box<dyn OutputBackend>)
        })
    }

    /// A studio that opens its backend through `factory`.
    pub fn with_backend_factory<F>(config: StudioConfig, factory: F) -> Self
    where
        F: FnMut(&StudioConfig) -> Result<Box<dyn OutputBackend>, AudioError> + 'static,
    {
        Self {
            config,
            factory: Box::new(factory),
            backend: Backend::Closed,
            pitch_shift: 0,
            epoch: 0,
            last_stop: None,
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Whether a backend is currently open.
    pub fn is_open(&self) -> bool {
        matches!(self.backend, Backend::Open(_))
    }

    /// Whether opening the backend failed and the studio is silent.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.backend, Backend::Unavailable)
    }

    /// Global transposition in semitones, applied to notes scheduled from now on.
    pub fn set_pitch_shift(&mut self, semitones: i32) {
        if semitones != self.pitch_shift {
            log::debug!("pitch shift {} -> {semitones}", self.pitch_shift);
        }
        self.pitch_shift = semitones;
    }

    pub fn pitch_shift(&self) -> i32 {
        self.pitch_shift
    }

    /// Adopt the settings a composition carries for the whole studio.
    pub fn apply_composition(&mut self, composition: &Composition) {
        self.set_pitch_shift(composition.global_pitch_shift);
    }

    /// Master gain for the bus, applied immediately when a backend is open.
    pub fn set_master_gain(&mut self, gain: f32) {
        self.config.bus.master_gain = gain.clamp(0.0, 1.0);
        if let Backend::Open(backend) = &mut self.backend {
            if let Err(e) = backend.set_master_gain(self.config.bus.master_gain) {
                log::warn!("master gain not applied: {e}");
            }
        }
    }

    /// Schedule one note `delay` seconds from now.
    ///
    /// Returns the scheduled voice, or `None` when nothing was scheduled
    /// (tempo 0, or no audio output).
    pub fn play_note(
        &mut self,
        note: &Note,
        instrument: InstrumentType,
        bpm: u32,
        delay: f64,
    ) -> Option<Voice> {
        if bpm == 0 {
            log::debug!("ignoring note {} at tempo 0", note.pitch);
            return None;
        }
        let now = self.ensure_backend()?.current_time();
        self.schedule_at(note, instrument, bpm, now + non_negative(delay))
    }

    /// Schedule every note of `snippet` relative to one shared "now".
    pub fn play_snippet(&mut self, snippet: &Snippet, bpm: u32) -> Vec<Voice> {
        if bpm == 0 {
            log::debug!("ignoring snippet {:?} at tempo 0", snippet.name);
            return Vec::new();
        }
        let Some(now) = self.ensure_backend().map(|b| b.current_time()) else {
            return Vec::new();
        };

        snippet
            .notes
            .iter()
            .filter_map(|note| {
                let start = now + non_negative(snippet_delay(note.start_time, bpm));
                self.schedule_at(note, snippet.instrument, bpm, start)
            })
            .collect()
    }

    /// Latest byte spectrum of the master bus. Empty when no backend is open.
    pub fn spectrum(&self) -> Vec<u8> {
        match &self.backend {
            Backend::Open(backend) => backend.spectrum(),
            _ => Vec::new(),
        }
    }

    /// Output-clock time, if a backend is open.
    pub fn current_time(&self) -> Option<f64> {
        match &self.backend {
            Backend::Open(backend) => Some(backend.current_time()),
            _ => None,
        }
    }

    /// Output-clock time at which the last scheduled voice stops.
    ///
    /// `None` when nothing is pending: no voice was scheduled since the
    /// backend opened, or a hard stop silenced them.
    pub fn last_voice_stop(&self) -> Option<f64> {
        self.last_stop
    }

    /// Pause output. The next sound request resumes it.
    pub fn suspend(&mut self) {
        if let Backend::Open(backend) = &mut self.backend {
            if let Err(e) = backend.suspend() {
                log::warn!("suspend failed: {e}");
            }
        }
    }

    /// Silence every voice scheduled so far, including ones not yet started.
    pub fn hard_stop(&mut self) {
        self.epoch += 1;
        self.last_stop = None;
        if let Backend::Open(backend) = &mut self.backend {
            if let Err(e) = backend.silence(self.epoch) {
                log::warn!("hard stop not delivered: {e}");
            }
        }
        log::debug!("hard stop, epoch {}", self.epoch);
    }

    /// Close the backend. The next sound request opens a fresh one.
    pub fn dispose(&mut self) {
        if !matches!(self.backend, Backend::Closed) {
            log::info!("studio disposed");
        }
        self.backend = Backend::Closed;
        self.last_stop = None;
    }

    fn ensure_backend(&mut self) -> Option<&mut Box<dyn OutputBackend>> {
        if matches!(self.backend, Backend::Closed) {
            self.backend = match (self.factory)(&self.config) {
                Ok(backend) => {
                    log::info!("studio output opened");
                    Backend::Open(backend)
                }
                Err(e) => {
                    log::warn!("audio output unavailable, studio is silent: {e}");
                    Backend::Unavailable
                }
            };
        }

        match &mut self.backend {
            Backend::Open(backend) => {
                if let Err(e) = backend.resume() {
                    log::warn!("resume failed: {e}");
                }
                Some(backend)
            }
            _ => None,
        }
    }

    fn schedule_at(
        &mut self,
        note: &Note,
        instrument: InstrumentType,
        bpm: u32,
        start: f64,
    ) -> Option<Voice> {
        let voice = Voice::for_note(
            note,
            instrument,
            bpm,
            start,
            self.pitch_shift,
            &self.config.voice,
            self.epoch,
        )?;

        let Backend::Open(backend) = &mut self.backend else {
            return None;
        };
        match backend.schedule(voice) {
            Ok(()) => {
                self.last_stop = Some(self.last_stop.map_or(voice.stop, |t| t.max(voice.stop)));
                log::trace!(
                    "voice {} {:.2} Hz at {:.3}s",
                    note.pitch,
                    voice.frequency,
                    voice.start
                );
                Some(voice)
            }
            Err(e) => {
                log::warn!("dropped note {}: {e}", note.pitch);
                None
            }
        }
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Negative and NaN delays play immediately.
fn non_negative(seconds: f64) -> f64 {
    if seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BusSettings, OfflineBackend};
    use crate::composition::test_fixture::snippet;
    use assert_approx_eq::assert_approx_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn offline_studio() -> (Studio, OfflineBackend) {
        let backend = OfflineBackend::new(44100, 2, &BusSettings::default());
        let handle = backend.clone();
        let studio = Studio::with_backend_factory(
            StudioConfig::default(),
            move |_| Ok(Box::new(backend.clone()) as Box<dyn OutputBackend>),
        );
        (studio, handle)
    }

    fn failing_studio(attempts: Rc<Cell<u32>>) -> Studio {
        Studio::with_backend_factory(StudioConfig::default(), move |_| {
            attempts.set(attempts.get() + 1);
            Err(AudioError::NoOutputDevice)
        })
    }

    #[test]
    fn backend_opens_lazily() {
        let (mut studio, _backend) = offline_studio();
        assert!(!studio.is_open());
        assert!(studio.spectrum().is_empty());
        assert!(studio.current_time().is_none());

        studio.play_note(&Note::new("A4", 0.0, 1.0, 1.0), InstrumentType::Pad, 120, 0.0);
        assert!(studio.is_open());
        assert_eq!(studio.spectrum().len(), 128);
    }

    #[test]
    fn play_note_starts_after_delay() {
        let (mut studio, backend) = offline_studio();
        studio.play_note(&Note::new("A4", 0.0, 1.0, 1.0), InstrumentType::Pad, 120, 0.0);
        backend.render(44100);

        let voice = studio
            .play_note(&Note::new("A4", 0.0, 1.0, 1.0), InstrumentType::Pad, 120, 0.25)
            .unwrap();
        assert_approx_eq!(voice.start, 1.25, 1e-9);
        assert_approx_eq!(voice.stop, 1.25 + 0.5 + 0.1, 1e-9);
    }

    #[test]
    fn negative_delay_plays_now() {
        let (mut studio, _backend) = offline_studio();
        let voice = studio
            .play_note(&Note::new("A4", 0.0, 1.0, 1.0), InstrumentType::Pad, 120, -3.0)
            .unwrap();
        assert_eq!(voice.start, 0.0);
    }

    #[test]
    fn zero_bpm_is_a_no_op() {
        let (mut studio, backend) = offline_studio();
        assert!(studio
            .play_note(&Note::new("A4", 0.0, 1.0, 1.0), InstrumentType::Pad, 0, 0.0)
            .is_none());
        assert!(backend.scheduled().is_empty());
        assert!(!studio.is_open());
    }

    #[test]
    fn pitch_shift_applies_to_later_notes_only() {
        let (mut studio, backend) = offline_studio();
        let note = Note::new("A4", 0.0, 1.0, 1.0);
        studio.play_note(&note, InstrumentType::Pad, 120, 0.0);
        studio.set_pitch_shift(12);
        studio.play_note(&note, InstrumentType::Pad, 120, 0.0);

        let voices = backend.scheduled();
        assert_approx_eq!(voices[0].frequency, 440.0, 1e-9);
        assert_approx_eq!(voices[1].frequency, 880.0, 1e-9);
    }

    #[test]
    fn apply_composition_adopts_shift() {
        let (mut studio, _backend) = offline_studio();
        let mut comp = crate::composition::test_fixture::composition(120, vec![]);
        comp.global_pitch_shift = -5;
        studio.apply_composition(&comp);
        assert_eq!(studio.pitch_shift(), -5);
    }

    #[test]
    fn play_snippet_spreads_notes_over_the_measure() {
        let (mut studio, backend) = offline_studio();
        let s = snippet(
            "lead",
            InstrumentType::Synth,
            vec![
                Note::new("C4", 0.0, 0.5, 0.8),
                Note::new("E4", 0.25, 0.5, 0.8),
                Note::new("G4", 0.5, 0.5, 0.8),
            ],
        );
        let voices = studio.play_snippet(&s, 120);
        assert_eq!(voices.len(), 3);
        assert_approx_eq!(voices[0].start, 0.0, 1e-9);
        assert_approx_eq!(voices[1].start, 0.5, 1e-9);
        assert_approx_eq!(voices[2].start, 1.0, 1e-9);
        assert_eq!(backend.scheduled().len(), 3);
    }

    #[test]
    fn failure_fails_closed_until_dispose() {
        let attempts = Rc::new(Cell::new(0));
        let mut studio = failing_studio(Rc::clone(&attempts));
        let note = Note::new("A4", 0.0, 1.0, 1.0);

        assert!(studio.play_note(&note, InstrumentType::Pad, 120, 0.0).is_none());
        assert!(studio.play_note(&note, InstrumentType::Pad, 120, 0.0).is_none());
        assert!(studio.is_unavailable());
        assert_eq!(attempts.get(), 1);
        assert!(studio.spectrum().is_empty());

        studio.dispose();
        assert!(studio.play_note(&note, InstrumentType::Pad, 120, 0.0).is_none());
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn sound_request_resumes_suspended_output() {
        let (mut studio, backend) = offline_studio();
        let note = Note::new("A4", 0.0, 1.0, 1.0);
        studio.play_note(&note, InstrumentType::Pad, 120, 0.0);
        studio.suspend();
        assert!(backend.is_suspended());
        studio.play_note(&note, InstrumentType::Pad, 120, 0.0);
        assert!(!backend.is_suspended());
    }

    #[test]
    fn hard_stop_silences_pending_voices() {
        let (mut studio, backend) = offline_studio();
        let note = Note::new("A4", 0.0, 1.0, 1.0);
        studio.play_note(&note, InstrumentType::Pad, 120, 0.0);
        studio.play_note(&note, InstrumentType::Pad, 120, 2.0);
        assert_eq!(backend.active_voices(), 2);

        studio.hard_stop();
        assert_eq!(backend.active_voices(), 0);

        let voice = studio.play_note(&note, InstrumentType::Pad, 120, 0.0).unwrap();
        assert_eq!(voice.epoch, 1);
        assert_eq!(backend.active_voices(), 1);
    }

    #[test]
    fn dispose_reopens_on_next_request() {
        let opened = Rc::new(Cell::new(0));
        let counter = Rc::clone(&opened);
        let mut studio = Studio::with_backend_factory(StudioConfig::default(), move |config| {
            counter.set(counter.get() + 1);
            let backend = OfflineBackend::new(44100, 1, &config.bus);
            Ok(Box::new(backend) as Box<dyn OutputBackend>)
        });
        let note = Note::new("A4", 0.0, 1.0, 1.0);
        studio.play_note(&note, InstrumentType::Pad, 120, 0.0);
        studio.dispose();
        assert!(!studio.is_open());
        studio.play_note(&note, InstrumentType::Pad, 120, 0.0);
        assert_eq!(opened.get(), 2);
    }

    #[test]
    fn last_voice_stop_follows_the_latest_voice() {
        let (mut studio, _backend) = offline_studio();
        assert!(studio.last_voice_stop().is_none());

        let note = Note::new("A4", 0.0, 1.0, 1.0);
        studio.play_note(&note, InstrumentType::Pad, 120, 1.0);
        studio.play_note(&note, InstrumentType::Pad, 120, 0.0);
        assert_approx_eq!(studio.last_voice_stop().unwrap(), 1.6, 1e-9);

        studio.hard_stop();
        assert!(studio.last_voice_stop().is_none());

        studio.play_note(&note, InstrumentType::Pad, 120, 0.0);
        studio.dispose();
        assert!(studio.last_voice_stop().is_none());
    }

    #[test]
    fn master_gain_reaches_open_backend() {
        let (mut studio, backend) = offline_studio();
        studio.play_note(&Note::new("A4", 0.0, 1.0, 1.0), InstrumentType::Pad, 120, 0.0);
        studio.set_master_gain(0.2);
        assert!((backend.master_gain() - 0.2).abs() < 1e-6);
        assert!((studio.config().bus.master_gain - 0.2).abs() < 1e-6);
    }
}
