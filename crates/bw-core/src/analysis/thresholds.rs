//! Percentile thresholds of the inter-arrival distribution.
//!
//! The percentile fields are raw. The three strategy candidates are the
//! same percentiles clamped to the configured interval bounds, so every
//! candidate a rule reads is already a valid polling interval.

use bw_config::{IntervalBounds, PollingStrategy};
use bw_math::percentiles;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    /// Clamped P25.
    pub aggressive: f64,
    /// Clamped P50.
    pub moderate: f64,
    /// Clamped P75.
    pub conservative: f64,
}

impl Thresholds {
    /// Percentiles of `deltas`, or `None` when empty.
    pub fn from_deltas(deltas: &[f64], bounds: &IntervalBounds) -> Option<Self> {
        let ps = percentiles(deltas, &[25.0, 50.0, 75.0, 95.0])?;
        Some(Self {
            p25: ps[0],
            p50: ps[1],
            p75: ps[2],
            p95: ps[3],
            aggressive: bounds.clamp(ps[0]),
            moderate: bounds.clamp(ps[1]),
            conservative: bounds.clamp(ps[2]),
        })
    }

    /// Clamped candidate for a polling strategy.
    pub fn candidate(&self, strategy: PollingStrategy) -> f64 {
        match strategy {
            PollingStrategy::Conservative => self.conservative,
            PollingStrategy::Moderate => self.moderate,
            PollingStrategy::Aggressive => self.aggressive,
        }
    }
}
