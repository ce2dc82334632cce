//! Long-run rate trend over fixed windows.
//!
//! Windows of `window_days` are laid back from the most recent event; the
//! oldest window is dropped unless it is complete. A line is fitted through
//! the per-window counts and the slope is judged relative to the mean count.

use bw_common::TrendDirection;
use bw_config::TrendConfig;
use bw_math::{mean, ols};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::snapshot::EventSnapshot;

/// Result of trend analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// Event counts per complete window, oldest first.
    pub window_counts: Vec<f64>,
    /// Change in count per window.
    pub slope: f64,
    /// `slope / mean count`.
    pub relative_slope: f64,
    pub r_squared: f64,
    /// Multiplier applied to the candidate interval when this trend decides.
    pub interval_factor: f64,
    /// Whether enough windows existed to fit a line.
    pub evaluated: bool,
}

impl TrendAnalysis {
    fn stable(window_counts: Vec<f64>, evaluated: bool) -> Self {
        Self {
            direction: TrendDirection::Stable,
            window_counts,
            slope: 0.0,
            relative_slope: 0.0,
            r_squared: 0.0,
            interval_factor: 1.0,
            evaluated,
        }
    }

    pub fn is_trending(&self) -> bool {
        self.direction != TrendDirection::Stable
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, snapshot: &EventSnapshot) -> TrendAnalysis {
        let counts = self.window_counts(snapshot);
        if counts.len() < self.config.min_windows {
            debug!(windows = counts.len(), "too few windows for trend fit");
            return TrendAnalysis::stable(counts, false);
        }

        let xs: Vec<f64> = (0..counts.len()).map(|i| i as f64).collect();
        let avg = mean(&counts);
        let Some(fit) = ols(&xs, &counts) else {
            return TrendAnalysis::stable(counts, false);
        };
        if avg <= 0.0 {
            return TrendAnalysis::stable(counts, true);
        }

        let relative_slope = fit.slope / avg;
        let c = &self.config;
        let significant = relative_slope.abs() > c.noise_floor && fit.r_squared >= c.min_r_squared;
        let (direction, interval_factor) = if !significant {
            (TrendDirection::Stable, 1.0)
        } else if relative_slope > 0.0 {
            (
                TrendDirection::Increasing,
                1.0 - (c.slope_gain * relative_slope).min(c.max_shorten),
            )
        } else {
            (
                TrendDirection::Decreasing,
                1.0 + (c.slope_gain * relative_slope.abs()).min(c.max_lengthen),
            )
        };

        debug!(
            windows = counts.len(),
            slope = fit.slope,
            relative_slope,
            r_squared = fit.r_squared,
            direction = %direction,
            "trend fitted"
        );
        TrendAnalysis {
            direction,
            window_counts: counts,
            slope: fit.slope,
            relative_slope,
            r_squared: fit.r_squared,
            interval_factor,
            evaluated: true,
        }
    }

    /// Counts per complete window, oldest first.
    fn window_counts(&self, snapshot: &EventSnapshot) -> Vec<f64> {
        let (Some(first), Some(last)) = (snapshot.first_open(), snapshot.last_open()) else {
            return Vec::new();
        };
        let window = Duration::seconds((self.config.window_days * 86_400.0) as i64);
        if window <= Duration::zero() {
            return Vec::new();
        }
        let complete = ((last - first).num_seconds() / window.num_seconds()).max(0) as usize;
        if complete == 0 {
            return Vec::new();
        }

        // Window k (0 = newest) covers (last - (k+1)w, last - kw].
        let mut counts = vec![0.0; complete];
        for event in snapshot.events() {
            let age = (last - event.open_time).num_seconds();
            let k = (age / window.num_seconds()) as usize;
            if k < complete {
                counts[k] += 1.0;
            }
        }
        counts.reverse();
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bw_common::Event;
    use chrono::{DateTime, TimeZone, Utc};

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    /// Events laid out so that window k (0 = newest) holds `counts[k]`,
    /// plus one older event so the oldest listed window is complete.
    fn windows_newest_first(counts: &[usize]) -> EventSnapshot {
        let week = Duration::days(7);
        let mut events = Vec::new();
        for (k, &count) in counts.iter().enumerate() {
            let end = anchor() - week * k as i32;
            for j in 0..count {
                let t = end - Duration::seconds(j as i64 * week.num_seconds() / count as i64);
                events.push(Event::new(format!("{k}-{j}"), "b", t));
            }
        }
        let oldest = anchor() - week * counts.len() as i32 - Duration::hours(1);
        events.push(Event::new("pad", "b", oldest));
        EventSnapshot::new(events)
    }

    #[test]
    fn test_increasing_rate() {
        let trend = TrendAnalyzer::default().analyze(&windows_newest_first(&[40, 30, 20, 10]));
        assert_eq!(trend.window_counts, vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!(approx_eq(trend.relative_slope, 0.4, 1e-9));
        assert!(approx_eq(trend.r_squared, 1.0, 1e-9));
        // 1 - min(2 * 0.4, 0.5)
        assert!(approx_eq(trend.interval_factor, 0.5, 1e-9));
    }

    #[test]
    fn test_decreasing_rate() {
        let trend = TrendAnalyzer::default().analyze(&windows_newest_first(&[20, 22, 24, 26]));
        assert_eq!(trend.direction, TrendDirection::Decreasing);
        // slope -2 over mean 23
        assert!(approx_eq(trend.relative_slope, -2.0 / 23.0, 1e-9));
        assert!(approx_eq(trend.interval_factor, 1.0 + 4.0 / 23.0, 1e-9));
    }

    #[test]
    fn test_flat_rate_is_stable() {
        let trend = TrendAnalyzer::default().analyze(&windows_newest_first(&[20, 20, 20, 20]));
        assert!(trend.evaluated);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.interval_factor, 1.0);
        assert!(!trend.is_trending());
    }

    #[test]
    fn test_noise_below_floor_is_stable() {
        // slope 0.5 over mean 100.75: 0.5% per window.
        let trend = TrendAnalyzer::default().analyze(&windows_newest_first(&[102, 100, 101, 100]));
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_too_few_windows() {
        let trend = TrendAnalyzer::default().analyze(&windows_newest_first(&[30, 10]));
        assert!(!trend.evaluated);
        assert_eq!(trend.window_counts.len(), 2);
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_partial_window_dropped() {
        // Without the padding event the oldest window would be partial.
        let snap = windows_newest_first(&[5, 5, 5]);
        let trend = TrendAnalyzer::default().analyze(&snap);
        assert_eq!(trend.window_counts.len(), 3);

        let events: Vec<_> = snap.events().iter().filter(|e| e.id != "pad").cloned().collect();
        let trend = TrendAnalyzer::default().analyze(&EventSnapshot::new(events));
        assert_eq!(trend.window_counts.len(), 2);
    }
}
