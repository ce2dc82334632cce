//! Recent-versus-historical divergence test.
//!
//! Splits the inter-arrival series into a recent tail and the history before
//! it and compares the two with a two-sample Kolmogorov–Smirnov test. A low
//! p-value means the recent process no longer looks like the past one.

use bw_config::GoodnessOfFitConfig;
use bw_math::ks;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::inter_arrival::InterArrivalStats;

/// p-value reported when the test cannot run.
pub const NEUTRAL_P_VALUE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodnessOfFit {
    /// Whether both sides had enough samples to test.
    pub applicable: bool,
    pub statistic: f64,
    pub p_value: f64,
    pub recent_samples: usize,
    pub historical_samples: usize,
    pub diverged: bool,
}

impl GoodnessOfFit {
    fn not_applicable(recent: usize, historical: usize) -> Self {
        Self {
            applicable: false,
            statistic: 0.0,
            p_value: NEUTRAL_P_VALUE,
            recent_samples: recent,
            historical_samples: historical,
            diverged: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GoodnessOfFitTester {
    config: GoodnessOfFitConfig,
}

impl GoodnessOfFitTester {
    pub fn new(config: GoodnessOfFitConfig) -> Self {
        Self { config }
    }

    pub fn test(&self, stats: &InterArrivalStats) -> GoodnessOfFit {
        let n = stats.deltas.len();
        let recent = self.recent_count(stats);
        let historical = n - recent;
        if recent < self.config.min_samples_per_side || historical < self.config.min_samples_per_side
        {
            debug!(recent, historical, "goodness-of-fit not applicable");
            return GoodnessOfFit::not_applicable(recent, historical);
        }

        let (past, tail) = stats.deltas.split_at(historical);
        let Some(result) = ks::two_sample(past, tail) else {
            return GoodnessOfFit::not_applicable(recent, historical);
        };
        let fit = GoodnessOfFit {
            applicable: true,
            statistic: result.statistic,
            p_value: result.p_value,
            recent_samples: recent,
            historical_samples: historical,
            diverged: result.p_value < self.config.significance,
        };
        debug!(
            recent,
            historical,
            d = fit.statistic,
            p_value = fit.p_value,
            diverged = fit.diverged,
            "goodness-of-fit tested"
        );
        fit
    }

    /// Size of the recent tail: deltas inside the recent window, bounded by
    /// the configured fractions of the series.
    fn recent_count(&self, stats: &InterArrivalStats) -> usize {
        let n = stats.deltas.len();
        let c = &self.config;
        let lower = (c.min_recent_fraction * n as f64).ceil() as usize;
        let upper = (c.max_recent_fraction * n as f64).floor() as usize;

        let in_window = match stats.delta_times.last() {
            Some(&last) => {
                let cutoff = last - Duration::seconds((c.recent_window_days * 86_400.0) as i64);
                stats.delta_times.iter().filter(|t| **t > cutoff).count()
            }
            None => lower,
        };
        in_window.max(lower).min(upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn stats_from(deltas: Vec<f64>) -> InterArrivalStats {
        let t0: DateTime<Utc> = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut t = t0;
        let delta_times = deltas
            .iter()
            .map(|d| {
                t += Duration::seconds(*d as i64);
                t
            })
            .collect();
        InterArrivalStats {
            sample_count: deltas.len(),
            duplicates_dropped: 0,
            lambda_hat: 0.0,
            mean_delta: 0.0,
            std_dev: 0.0,
            coefficient_of_variation: 0.0,
            deltas,
            delta_times,
        }
    }

    #[test]
    fn test_identical_halves_do_not_diverge() {
        let fit = GoodnessOfFitTester::default().test(&stats_from(vec![3600.0; 299]));
        assert!(fit.applicable);
        assert_eq!(fit.recent_samples, 149);
        assert_eq!(fit.historical_samples, 150);
        assert_eq!(fit.statistic, 0.0);
        assert_eq!(fit.p_value, 1.0);
        assert!(!fit.diverged);
    }

    #[test]
    fn test_shifted_tail_diverges() {
        let mut deltas = vec![3600.0; 150];
        deltas.extend(std::iter::repeat(600.0).take(150));
        let fit = GoodnessOfFitTester::default().test(&stats_from(deltas));
        assert!(fit.applicable);
        assert_eq!(fit.statistic, 1.0);
        assert!(fit.p_value < 1e-6);
        assert!(fit.diverged);
    }

    #[test]
    fn test_long_history_uses_time_window() {
        // 400 daily deltas: only the last 30 days are recent, raised to 25%.
        let fit = GoodnessOfFitTester::default().test(&stats_from(vec![86_400.0; 400]));
        assert_eq!(fit.recent_samples, 100);
        assert_eq!(fit.historical_samples, 300);
    }

    #[test]
    fn test_small_sides_not_applicable() {
        let fit = GoodnessOfFitTester::default().test(&stats_from(vec![60.0; 30]));
        assert!(!fit.applicable);
        assert_eq!(fit.p_value, NEUTRAL_P_VALUE);
        assert!(!fit.diverged);
    }
}
