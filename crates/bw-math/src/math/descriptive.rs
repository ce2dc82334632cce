//! Descriptive statistics over finite samples.
//!
//! Callers are expected to pass finite values (see [`filter_finite`]).
//! Dispersion uses the population form, matching how the engine compares
//! bucket counts against their own mean.

use serde::{Deserialize, Serialize};

/// Keep only finite values.
pub fn filter_finite(samples: &[f64]) -> Vec<f64> {
    samples.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean. Returns 0.0 for empty input.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population variance. Returns 0.0 for fewer than two samples.
pub fn variance(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let m = mean(samples);
    samples.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / samples.len() as f64
}

/// Population standard deviation.
pub fn std_dev(samples: &[f64]) -> f64 {
    variance(samples).sqrt()
}

/// Coefficient of variation (stddev / mean).
///
/// Returns 0.0 when the mean is not strictly positive; a grouping with no
/// events carries no pattern.
pub fn coefficient_of_variation(samples: &[f64]) -> f64 {
    let m = mean(samples);
    if m <= 0.0 {
        return 0.0;
    }
    std_dev(samples) / m
}

/// Welford accumulator for streaming mean/variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OnlineStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl OnlineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a slice in one pass.
    pub fn from_slice(samples: &[f64]) -> Self {
        let mut stats = Self::new();
        for &x in samples {
            stats.push(x);
        }
        stats
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance of the pushed values.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / self.count as f64).max(0.0)
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_mean_and_variance() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx_eq(mean(&xs), 5.0, 1e-12));
        assert!(approx_eq(variance(&xs), 4.0, 1e-12));
        assert!(approx_eq(std_dev(&xs), 2.0, 1e-12));
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(variance(&[3.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[]), 0.0);
    }

    #[test]
    fn test_cov_zero_mean() {
        assert_eq!(coefficient_of_variation(&[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cov_constant_series() {
        assert_eq!(coefficient_of_variation(&[3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_online_matches_batch() {
        let xs = [1.5, 2.5, 10.0, -3.0, 7.25, 0.0];
        let online = OnlineStats::from_slice(&xs);
        assert_eq!(online.count(), 6);
        assert!(approx_eq(online.mean(), mean(&xs), 1e-12));
        assert!(approx_eq(online.variance(), variance(&xs), 1e-9));
    }

    #[test]
    fn test_filter_finite() {
        let xs = [1.0, f64::NAN, f64::INFINITY, 2.0];
        assert_eq!(filter_finite(&xs), vec![1.0, 2.0]);
    }
}
