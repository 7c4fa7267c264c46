//! Golden-ratio low-discrepancy distribution.

/// The golden ratio, to the precision the studio has always used.
pub const PHI: f64 = 1.61803398875;

/// `length` points produced by accumulating [`PHI`] modulo 1, sorted ascending.
///
/// The accumulator starts at 0, so the first generated point is `PHI % 1`.
/// Callers get a monotonic distribution, not the accumulation order.
pub fn golden_ratio_points(length: usize) -> Vec<f64> {
    let mut current = 0.0_f64;
    let mut points: Vec<f64> = (0..length)
        .map(|_| {
            current = (current + PHI) % 1.0;
            current
        })
        .collect();
    points.sort_by(|a, b| a.total_cmp(b));
    points
}
