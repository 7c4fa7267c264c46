//! Aura — the audio and pattern core of a music composition studio.
//!
//! Compositions are made audible by scheduling one synthesized voice per note
//! on a single master bus, retriggered once per measure by the transport loop.
//! Deterministic pattern generators seed new snippets.

pub mod audio;
pub mod composition;
pub mod instrument;
pub mod pattern;
pub mod sequencer;
pub mod studio;
