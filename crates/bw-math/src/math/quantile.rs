//! Order statistics.
//!
//! Percentiles use linear interpolation between closest ranks
//! (`rank = p/100 · (n − 1)`), so P50 of an even-length sample is the midpoint
//! of the two central values.

use std::cmp::Ordering;

/// Sort a copy of the finite values in ascending order.
pub fn sorted_finite(samples: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Percentile of an already-sorted slice. `p` is in `[0, 100]` and is clamped.
///
/// Returns `None` for empty input.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || p.is_nan() {
        return None;
    }
    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Percentile of an unsorted sample.
pub fn percentile(samples: &[f64], p: f64) -> Option<f64> {
    percentile_sorted(&sorted_finite(samples), p)
}

/// Several percentiles of one sample, sorting only once.
pub fn percentiles(samples: &[f64], ps: &[f64]) -> Option<Vec<f64>> {
    let sorted = sorted_finite(samples);
    ps.iter().map(|&p| percentile_sorted(&sorted, p)).collect()
}

/// Median of an unsorted sample.
pub fn median(samples: &[f64]) -> Option<f64> {
    percentile(samples, 50.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&xs, 0.0), Some(1.0));
        assert_eq!(percentile(&xs, 100.0), Some(4.0));
        assert_eq!(percentile(&xs, 50.0), Some(2.5));
        assert_eq!(percentile(&xs, 25.0), Some(1.75));
    }

    #[test]
    fn test_percentile_unsorted_input() {
        let xs = [9.0, 1.0, 5.0];
        assert_eq!(median(&xs), Some(5.0));
    }

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentiles(&[], &[25.0, 75.0]), None);
    }

    #[test]
    fn test_percentile_clamps_p() {
        let xs = [1.0, 2.0];
        assert_eq!(percentile(&xs, -10.0), Some(1.0));
        assert_eq!(percentile(&xs, 250.0), Some(2.0));
    }

    #[test]
    fn test_percentiles_batch() {
        let xs: Vec<f64> = (1..=101).map(|i| i as f64).collect();
        let ps = percentiles(&xs, &[25.0, 50.0, 75.0, 95.0]).unwrap();
        assert_eq!(ps, vec![26.0, 51.0, 76.0, 96.0]);
    }

    #[test]
    fn test_nan_ignored() {
        let xs = [f64::NAN, 3.0, 1.0];
        assert_eq!(median(&xs), Some(2.0));
    }
}
