//! Inter-arrival modelling under a homogeneous Poisson assumption.
//!
//! Deltas between consecutive sorted open times are treated as `Exp(λ)`
//! draws; `λ̂ = n / Σδ` is the maximum-likelihood rate. Zero deltas
//! (duplicate timestamps) carry no timing information and are dropped.

use bw_config::InterArrivalConfig;
use bw_math::{coefficient_of_variation, exponential, mean, std_dev};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::snapshot::EventSnapshot;

/// Fitted inter-arrival statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterArrivalStats {
    /// Number of positive deltas.
    pub sample_count: usize,
    /// Zero deltas skipped.
    pub duplicates_dropped: usize,
    /// Events per second; 0 without samples.
    pub lambda_hat: f64,
    pub mean_delta: f64,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    /// Deltas in seconds, in event order.
    pub deltas: Vec<f64>,
    /// Open time of the later event of each delta.
    #[serde(skip)]
    pub delta_times: Vec<DateTime<Utc>>,
}

impl InterArrivalStats {
    fn empty(duplicates_dropped: usize) -> Self {
        Self {
            sample_count: 0,
            duplicates_dropped,
            lambda_hat: 0.0,
            mean_delta: 0.0,
            std_dev: 0.0,
            coefficient_of_variation: 0.0,
            deltas: Vec::new(),
            delta_times: Vec::new(),
        }
    }

    /// Whether there are enough samples to model anything.
    pub fn is_sufficient(&self, minimum_samples: usize) -> bool {
        self.sample_count >= minimum_samples
    }

    /// Mean events per hour, for reasoning strings.
    pub fn events_per_hour(&self) -> f64 {
        self.lambda_hat * 3_600.0
    }
}

/// Fits the exponential inter-arrival model.
#[derive(Debug, Clone, Default)]
pub struct InterArrivalAnalyzer {
    config: InterArrivalConfig,
}

impl InterArrivalAnalyzer {
    pub fn new(config: InterArrivalConfig) -> Self {
        Self { config }
    }

    pub fn minimum_samples(&self) -> usize {
        self.config.minimum_samples
    }

    pub fn analyze(&self, snapshot: &EventSnapshot) -> InterArrivalStats {
        let events = snapshot.events();
        let mut deltas = Vec::with_capacity(events.len().saturating_sub(1));
        let mut delta_times = Vec::with_capacity(deltas.capacity());
        let mut duplicates = 0usize;

        for pair in events.windows(2) {
            let dt = (pair[1].open_time - pair[0].open_time).num_milliseconds() as f64 / 1_000.0;
            if dt > 0.0 {
                deltas.push(dt);
                delta_times.push(pair[1].open_time);
            } else {
                duplicates += 1;
            }
        }

        if deltas.is_empty() {
            return InterArrivalStats::empty(duplicates);
        }

        let lambda_hat = exponential::rate_mle(&deltas).unwrap_or(0.0);
        let stats = InterArrivalStats {
            sample_count: deltas.len(),
            duplicates_dropped: duplicates,
            lambda_hat,
            mean_delta: mean(&deltas),
            std_dev: std_dev(&deltas),
            coefficient_of_variation: coefficient_of_variation(&deltas),
            deltas,
            delta_times,
        };
        debug!(
            samples = stats.sample_count,
            duplicates = stats.duplicates_dropped,
            lambda_hat = stats.lambda_hat,
            cov = stats.coefficient_of_variation,
            sufficient = stats.is_sufficient(self.config.minimum_samples),
            "inter-arrival model fitted"
        );
        stats
    }
}
