//! Analysis configuration types.
//!
//! Every section defaults field-by-field, so a config file only needs to name
//! the values it changes:
//! ```json
//! { "schema_version": "1.0.0", "strategy": "conservative",
//!   "seasonal": { "utc_offset_minutes": -480 } }
//! ```

use bw_common::{DEFAULT_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS, MIN_INTERVAL_SECONDS};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::validate::{ValidationError, ValidationResult};

/// Which percentile candidate the engine polls at.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PollingStrategy {
    /// P75 of inter-arrival times: fewer polls, more staleness.
    Conservative,
    /// P50 of inter-arrival times.
    #[default]
    Moderate,
    /// P25 of inter-arrival times: fresher data, more polls.
    Aggressive,
}

impl PollingStrategy {
    pub const ALL: &'static [PollingStrategy] = &[
        PollingStrategy::Conservative,
        PollingStrategy::Moderate,
        PollingStrategy::Aggressive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PollingStrategy::Conservative => "conservative",
            PollingStrategy::Moderate => "moderate",
            PollingStrategy::Aggressive => "aggressive",
        }
    }

    /// Percentile of the inter-arrival distribution this strategy polls at.
    pub fn percentile(&self) -> f64 {
        match self {
            PollingStrategy::Conservative => 75.0,
            PollingStrategy::Moderate => 50.0,
            PollingStrategy::Aggressive => 25.0,
        }
    }
}

impl std::fmt::Display for PollingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PollingStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conservative" | "p75" => Ok(PollingStrategy::Conservative),
            "moderate" | "p50" | "median" => Ok(PollingStrategy::Moderate),
            "aggressive" | "p25" => Ok(PollingStrategy::Aggressive),
            other => Err(ValidationError::InvalidValue {
                field: "strategy".to_string(),
                message: format!("unknown strategy '{other}'"),
            }),
        }
    }
}

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisConfig {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub strategy: PollingStrategy,

    #[serde(default)]
    pub intervals: IntervalBounds,

    #[serde(default)]
    pub inter_arrival: InterArrivalConfig,

    #[serde(default)]
    pub seasonal: SeasonalConfig,

    #[serde(default)]
    pub trend: TrendConfig,

    #[serde(default)]
    pub change_point: ChangePointConfig,

    #[serde(default)]
    pub goodness_of_fit: GoodnessOfFitConfig,

    #[serde(default)]
    pub confidence: ConfidenceConfig,

    #[serde(default)]
    pub urgency: UrgencyConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: None,
            strategy: PollingStrategy::default(),
            intervals: IntervalBounds::default(),
            inter_arrival: InterArrivalConfig::default(),
            seasonal: SeasonalConfig::default(),
            trend: TrendConfig::default(),
            change_point: ChangePointConfig::default(),
            goodness_of_fit: GoodnessOfFitConfig::default(),
            confidence: ConfidenceConfig::default(),
            urgency: UrgencyConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a JSON file (parse only).
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse a config from a JSON string (parse only).
    pub fn from_json(json: &str) -> ValidationResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Load and semantically validate a config file.
    pub fn load(path: &Path) -> ValidationResult<Self> {
        let config = Self::from_file(path)?;
        crate::validate::validate_config(&config)?;
        Ok(config)
    }

    /// Stable SHA-256 fingerprint of the effective values.
    pub fn fingerprint(&self) -> String {
        crate::snapshot::hash_config(self)
    }

    /// Clamp an interval into the configured bounds.
    pub fn clamp_interval(&self, seconds: f64) -> f64 {
        self.intervals.clamp(seconds)
    }
}

/// Bounds on emitted intervals. Always inside the 300..86400 s contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IntervalBounds {
    pub min_seconds: f64,
    pub max_seconds: f64,
    /// Interval returned with `insufficientData`.
    pub default_seconds: f64,
}

impl Default for IntervalBounds {
    fn default() -> Self {
        Self {
            min_seconds: MIN_INTERVAL_SECONDS,
            max_seconds: MAX_INTERVAL_SECONDS,
            default_seconds: DEFAULT_INTERVAL_SECONDS,
        }
    }
}

impl IntervalBounds {
    pub fn clamp(&self, seconds: f64) -> f64 {
        let lo = self.min_seconds.max(MIN_INTERVAL_SECONDS);
        let hi = self.max_seconds.min(MAX_INTERVAL_SECONDS).max(lo);
        if seconds.is_nan() {
            return self.default_seconds.clamp(lo, hi);
        }
        seconds.clamp(lo, hi)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InterArrivalConfig {
    /// Samples needed before anything but `insufficientData` is emitted.
    pub minimum_samples: usize,
}

impl Default for InterArrivalConfig {
    fn default() -> Self {
        Self { minimum_samples: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SeasonalConfig {
    /// Bin CoV above which a grouping may be patterned.
    pub cov_threshold: f64,
    /// Required `max / mean` of the bins.
    pub peak_ratio: f64,
    /// Fewer events than this disables seasonal analysis.
    pub min_events: usize,
    pub min_span_days_hourly: f64,
    pub min_span_days_daily: f64,
    pub min_span_days_monthly: f64,
    /// Hour bins at or above `factor × mean` are peak hours.
    pub peak_hour_factor: f64,
    pub busy_weekday_factor: f64,
    pub busy_month_factor: f64,
    /// Offset of local bridge time from UTC, used for bucketing.
    pub utc_offset_minutes: i32,
    /// Multiplier applied to the moderate candidate inside a peak window.
    pub peak_interval_factor: f64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            cov_threshold: 0.4,
            peak_ratio: 2.0,
            min_events: 50,
            min_span_days_hourly: 2.0,
            min_span_days_daily: 14.0,
            min_span_days_monthly: 365.0,
            peak_hour_factor: 1.5,
            busy_weekday_factor: 1.2,
            busy_month_factor: 1.5,
            utc_offset_minutes: 0,
            peak_interval_factor: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TrendConfig {
    pub window_days: f64,
    /// Minimum complete windows for a fit.
    pub min_windows: usize,
    /// `|slope / mean|` below this is noise.
    pub noise_floor: f64,
    pub min_r_squared: f64,
    /// Gain applied to the relative slope when scaling the interval.
    pub slope_gain: f64,
    /// Largest fractional shortening for an increasing trend.
    pub max_shorten: f64,
    /// Largest fractional lengthening for a decreasing trend.
    pub max_lengthen: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window_days: 7.0,
            min_windows: 3,
            noise_floor: 0.05,
            min_r_squared: 0.25,
            slope_gain: 2.0,
            max_shorten: 0.5,
            max_lengthen: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChangePointConfig {
    pub min_calibration_samples: usize,
    pub calibration_fraction: f64,
    /// Rate ratio each CUSUM side is tuned to detect (`λ₁ = ρλ₀` and `λ₀/ρ`).
    pub rate_shift_factor: f64,
    /// CUSUM alarm limit, in log-likelihood-ratio units.
    pub cusum_h: f64,
    /// Floor for the σ of `ln δ` in the calibration prefix.
    pub log_sigma_floor: f64,
    /// Residuals are clipped to `±residual_clip` reference σ.
    pub residual_clip: f64,
    pub ewma_alpha: f64,
    pub ewma_l: f64,
    /// CUSUM and EWMA alarms must fall within `fraction × n` samples.
    pub agreement_window_fraction: f64,
    /// Smallest `2 ln Λ` of the two-rate split for a change to be confirmed.
    pub min_split_statistic: f64,
    /// A change is recent when it starts within the last `fraction × n` samples.
    pub recent_fraction: f64,
    pub min_post_change_samples: usize,
    /// CoV above which the series is very unstable regardless of changes.
    pub very_unstable_cov: f64,
    /// CoV below which a series without a recent change is very stable.
    pub very_stable_cov: f64,
}

impl Default for ChangePointConfig {
    fn default() -> Self {
        Self {
            min_calibration_samples: 10,
            calibration_fraction: 0.25,
            rate_shift_factor: 2.0,
            cusum_h: 7.0,
            log_sigma_floor: 0.1,
            residual_clip: 3.0,
            ewma_alpha: 0.3,
            ewma_l: 2.5,
            agreement_window_fraction: 0.2,
            min_split_statistic: 12.0,
            recent_fraction: 0.6,
            min_post_change_samples: 5,
            very_unstable_cov: 1.5,
            very_stable_cov: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GoodnessOfFitConfig {
    pub recent_window_days: f64,
    pub min_recent_fraction: f64,
    pub max_recent_fraction: f64,
    pub min_samples_per_side: usize,
    pub significance: f64,
}

impl Default for GoodnessOfFitConfig {
    fn default() -> Self {
        Self {
            recent_window_days: 30.0,
            min_recent_fraction: 0.25,
            max_recent_fraction: 0.5,
            min_samples_per_side: 20,
            significance: 0.05,
        }
    }
}

/// Confidence formula coefficients per recommendation method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub change_base: f64,
    pub change_scale_min: f64,
    pub change_scale_max: f64,
    pub seasonal_base: f64,
    pub seasonal_cov_weight: f64,
    pub seasonal_cov_cap: f64,
    pub seasonal_max: f64,
    pub trend_base: f64,
    pub trend_r_squared_weight: f64,
    pub poisson_base: f64,
    pub poisson_p_weight: f64,
    /// Ceiling for degenerate (zero-variance) data.
    pub degenerate_cap: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            change_base: 0.9,
            change_scale_min: 0.5,
            change_scale_max: 0.8,
            seasonal_base: 0.6,
            seasonal_cov_weight: 0.15,
            seasonal_cov_cap: 2.0,
            seasonal_max: 0.9,
            trend_base: 0.5,
            trend_r_squared_weight: 0.3,
            poisson_base: 0.5,
            poisson_p_weight: 0.45,
            degenerate_cap: 0.85,
        }
    }
}

/// Urgency contributions; the summed score is clamped to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct UrgencyConfig {
    pub per_open_bridge: f64,
    pub open_bridge_cap: f64,
    pub peak_hour: f64,
    pub busy_weekday: f64,
    pub unstable: f64,
    pub very_unstable: f64,
    /// Interval shrinks by at most this fraction at full urgency.
    pub max_reduction: f64,
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            per_open_bridge: 0.2,
            open_bridge_cap: 0.4,
            peak_hour: 0.3,
            busy_weekday: 0.2,
            unstable: 0.2,
            very_unstable: 0.3,
            max_reduction: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{
            "schema_version": "1.0.0",
            "strategy": "conservative",
            "seasonal": { "utc_offset_minutes": -480 }
        }"#;
        let config = AnalysisConfig::from_json(json).unwrap();
        assert_eq!(config.strategy, PollingStrategy::Conservative);
        assert_eq!(config.seasonal.utc_offset_minutes, -480);
        assert_eq!(config.seasonal.cov_threshold, 0.4);
        assert_eq!(config.inter_arrival.minimum_samples, 50);
        assert_eq!(config.change_point.cusum_h, 7.0);
        assert_eq!(config.change_point.recent_fraction, 0.6);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "P75".parse::<PollingStrategy>().unwrap(),
            PollingStrategy::Conservative
        );
        assert_eq!(
            "median".parse::<PollingStrategy>().unwrap(),
            PollingStrategy::Moderate
        );
        assert!("fastest".parse::<PollingStrategy>().is_err());
        for s in PollingStrategy::ALL {
            assert_eq!(s.as_str().parse::<PollingStrategy>().unwrap(), *s);
        }
    }

    #[test]
    fn test_clamp_interval() {
        let config = AnalysisConfig::default();
        assert_eq!(config.clamp_interval(10.0), 300.0);
        assert_eq!(config.clamp_interval(1e9), 86_400.0);
        assert_eq!(config.clamp_interval(f64::NAN), 3_600.0);
        assert_eq!(config.clamp_interval(900.0), 900.0);
    }

    #[test]
    fn test_clamp_never_leaves_contract_range() {
        let mut bounds = IntervalBounds::default();
        bounds.min_seconds = 10.0;
        bounds.max_seconds = 1e7;
        assert_eq!(bounds.clamp(1.0), 300.0);
        assert_eq!(bounds.clamp(1e8), 86_400.0);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = AnalysisConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ValidationError::ParseError(_)));
    }

    #[test]
    fn test_fingerprint_tracks_values() {
        let a = AnalysisConfig::default();
        let mut b = AnalysisConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.strategy = PollingStrategy::Aggressive;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
