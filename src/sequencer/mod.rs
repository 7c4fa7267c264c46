//! Sequencer — snippet scheduling and the measure-length transport loop.

pub mod scheduler;
pub mod transport;

pub use scheduler::{schedule_pass, snippet_delay, BEATS_PER_SNIPPET};
pub use transport::{measure_period, PlayState, TransportLoop};
