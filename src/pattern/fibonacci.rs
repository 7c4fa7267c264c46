//! Fibonacci growth sequence.

/// First `length` terms of the Fibonacci sequence seeded with `[1, 1]`.
///
/// `fibonacci(0)` is empty and `fibonacci(1)` is `[1]`. Terms that would
/// overflow `u64` saturate at `u64::MAX`.
pub fn fibonacci(length: usize) -> Vec<u64> {
    let mut sequence: Vec<u64> = Vec::with_capacity(length);
    for i in 0..length {
        let term = if i < 2 {
            1
        } else {
            sequence[i - 1].saturating_add(sequence[i - 2])
        };
        sequence.push(term);
    }
    sequence
}
