//! Pattern generators — deterministic numeric sequences used to seed snippets.
//!
//! Every generator is a pure function: same input, same output, no state.
//! Degenerate input never panics; it yields an empty or minimal sequence.

pub mod euclidean;
pub mod fibonacci;
pub mod golden;
pub mod seed;

pub use euclidean::euclidean_rhythm;
pub use fibonacci::fibonacci;
pub use golden::{golden_ratio_points, PHI};
pub use seed::{euclidean_snippet, fibonacci_snippet, golden_snippet};
