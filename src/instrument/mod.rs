//! Instruments — pitch resolution, timbres, oscillators, envelopes and voices.
//!
//! Everything here is pure: turning a note into a [`Voice`] involves no audio
//! device, so the whole synthesis description can be tested offline.

pub mod envelope;
pub mod oscillator;
pub mod pitch;
pub mod timbre;
pub mod voice;

pub use envelope::GainEnvelope;
pub use oscillator::{Phase, Waveform};
pub use pitch::{resolve_frequency, semitone_index, FALLBACK_FREQUENCY};
pub use timbre::{FrequencyRule, Timbre};
pub use voice::{sound_duration, Voice, VoiceSettings};
