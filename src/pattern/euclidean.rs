//! Euclidean rhythm via a Bresenham-style bucket accumulator.

/// Distribute `onsets` pulses as evenly as possible over `total_pulses` slots.
///
/// Each step adds `onsets` to a bucket; whenever the bucket reaches
/// `total_pulses` the step is an onset and `total_pulses` is subtracted.
/// Out-of-range input (`onsets > total_pulses`) yields all rests.
pub fn euclidean_rhythm(onsets: usize, total_pulses: usize) -> Vec<u8> {
    let mut pattern = vec![0u8; total_pulses];
    if onsets > total_pulses {
        return pattern;
    }

    let mut bucket = 0;
    for slot in pattern.iter_mut() {
        bucket += onsets;
        if bucket >= total_pulses {
            bucket -= total_pulses;
            *slot = 1;
        }
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tresillo() {
        assert_eq!(euclidean_rhythm(3, 8), vec![0, 0, 1, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn no_onsets_is_silent() {
        assert_eq!(euclidean_rhythm(0, 8), vec![0; 8]);
    }

    #[test]
    fn all_onsets_is_full() {
        assert_eq!(euclidean_rhythm(8, 8), vec![1; 8]);
    }

    #[test]
    fn zero_pulses_is_empty() {
        assert!(euclidean_rhythm(0, 0).is_empty());
    }

    #[test]
    fn out_of_range_is_all_rests() {
        assert_eq!(euclidean_rhythm(5, 4), vec![0; 4]);
    }

    #[test]
    fn onset_count_matches() {
        for n in 1..=16 {
            for k in 0..=n {
                let pattern = euclidean_rhythm(k, n);
                assert_eq!(pattern.len(), n);
                let ones = pattern.iter().filter(|&&p| p == 1).count();
                assert_eq!(ones, k, "E({k},{n})");
            }
        }
    }
}
