//! Commands sent from the control thread to the audio thread via ring buffer.

use crate::instrument::Voice;

/// Commands sent from the control thread to the audio thread via ring buffer.
#[derive(Debug, Clone, Copy)]
pub enum AudioCommand {
    /// Add a fully scheduled voice to the output bus.
    Schedule(Voice),

    /// Set master gain (0.0 to 1.0).
    SetMasterGain(f32),

    /// Drop every voice whose epoch is older than `epoch`.
    Silence { epoch: u64 },
}
