//! Configuration validation errors and semantic validation.

use bw_common::{MAX_INTERVAL_SECONDS, MIN_INTERVAL_SECONDS};
use thiserror::Error;

use crate::analysis::AnalysisConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate an analysis configuration semantically.
pub fn validate_config(config: &AnalysisConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    let iv = &config.intervals;
    check_range("intervals.min_seconds", iv.min_seconds, MIN_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS)?;
    check_range("intervals.max_seconds", iv.max_seconds, MIN_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS)?;
    if iv.min_seconds > iv.max_seconds {
        return Err(ValidationError::SemanticError(format!(
            "intervals.min_seconds ({}) exceeds intervals.max_seconds ({})",
            iv.min_seconds, iv.max_seconds
        )));
    }
    check_range("intervals.default_seconds", iv.default_seconds, iv.min_seconds, iv.max_seconds)?;

    if config.inter_arrival.minimum_samples < 2 {
        return Err(invalid(
            "inter_arrival.minimum_samples",
            format!("Must be at least 2, got {}", config.inter_arrival.minimum_samples),
        ));
    }

    let s = &config.seasonal;
    check_positive("seasonal.cov_threshold", s.cov_threshold)?;
    check_range("seasonal.peak_ratio", s.peak_ratio, 1.0, f64::MAX)?;
    check_positive("seasonal.min_span_days_hourly", s.min_span_days_hourly)?;
    check_positive("seasonal.min_span_days_daily", s.min_span_days_daily)?;
    check_positive("seasonal.min_span_days_monthly", s.min_span_days_monthly)?;
    check_range("seasonal.peak_hour_factor", s.peak_hour_factor, 1.0, f64::MAX)?;
    check_range("seasonal.busy_weekday_factor", s.busy_weekday_factor, 1.0, f64::MAX)?;
    check_range("seasonal.busy_month_factor", s.busy_month_factor, 1.0, f64::MAX)?;
    check_unit_open("seasonal.peak_interval_factor", s.peak_interval_factor)?;
    if s.utc_offset_minutes.abs() > 14 * 60 {
        return Err(invalid(
            "seasonal.utc_offset_minutes",
            format!("Must be within ±840, got {}", s.utc_offset_minutes),
        ));
    }

    let t = &config.trend;
    check_positive("trend.window_days", t.window_days)?;
    if t.min_windows < 3 {
        return Err(invalid(
            "trend.min_windows",
            format!("A slope fit needs at least 3 windows, got {}", t.min_windows),
        ));
    }
    check_range("trend.noise_floor", t.noise_floor, 0.0, 1.0)?;
    check_range("trend.min_r_squared", t.min_r_squared, 0.0, 1.0)?;
    check_positive("trend.slope_gain", t.slope_gain)?;
    check_unit_open("trend.max_shorten", t.max_shorten)?;
    check_positive("trend.max_lengthen", t.max_lengthen)?;

    let c = &config.change_point;
    if c.min_calibration_samples < 2 {
        return Err(invalid(
            "change_point.min_calibration_samples",
            format!("Must be at least 2, got {}", c.min_calibration_samples),
        ));
    }
    check_unit_open("change_point.calibration_fraction", c.calibration_fraction)?;
    if !(c.rate_shift_factor > 1.0 && c.rate_shift_factor.is_finite()) {
        return Err(invalid(
            "change_point.rate_shift_factor",
            format!("Must be a finite ratio above 1, got {}", c.rate_shift_factor),
        ));
    }
    check_positive("change_point.cusum_h", c.cusum_h)?;
    check_positive("change_point.log_sigma_floor", c.log_sigma_floor)?;
    check_positive("change_point.residual_clip", c.residual_clip)?;
    check_range("change_point.ewma_alpha", c.ewma_alpha, f64::MIN_POSITIVE, 1.0)?;
    check_positive("change_point.ewma_l", c.ewma_l)?;
    check_unit_open("change_point.agreement_window_fraction", c.agreement_window_fraction)?;
    check_range("change_point.min_split_statistic", c.min_split_statistic, 0.0, f64::MAX)?;
    check_unit_open("change_point.recent_fraction", c.recent_fraction)?;
    if c.very_stable_cov >= c.very_unstable_cov {
        return Err(ValidationError::SemanticError(format!(
            "change_point.very_stable_cov ({}) must be below very_unstable_cov ({})",
            c.very_stable_cov, c.very_unstable_cov
        )));
    }

    let g = &config.goodness_of_fit;
    check_positive("goodness_of_fit.recent_window_days", g.recent_window_days)?;
    check_unit_open("goodness_of_fit.min_recent_fraction", g.min_recent_fraction)?;
    check_unit_open("goodness_of_fit.max_recent_fraction", g.max_recent_fraction)?;
    if g.min_recent_fraction > g.max_recent_fraction {
        return Err(ValidationError::SemanticError(format!(
            "goodness_of_fit.min_recent_fraction ({}) exceeds max_recent_fraction ({})",
            g.min_recent_fraction, g.max_recent_fraction
        )));
    }
    check_unit_open("goodness_of_fit.significance", g.significance)?;

    let k = &config.confidence;
    for (field, value) in [
        ("confidence.change_base", k.change_base),
        ("confidence.change_scale_min", k.change_scale_min),
        ("confidence.change_scale_max", k.change_scale_max),
        ("confidence.seasonal_base", k.seasonal_base),
        ("confidence.seasonal_max", k.seasonal_max),
        ("confidence.trend_base", k.trend_base),
        ("confidence.poisson_base", k.poisson_base),
        ("confidence.degenerate_cap", k.degenerate_cap),
    ] {
        check_unit_open(field, value)?;
    }
    if k.change_scale_min > k.change_scale_max {
        return Err(ValidationError::SemanticError(
            "confidence.change_scale_min exceeds change_scale_max".to_string(),
        ));
    }
    // Positive confidence is reserved for real recommendations; the weighted
    // terms must not push any method above 1.
    if k.poisson_base + k.poisson_p_weight > 1.0 {
        return Err(invalid(
            "confidence.poisson_p_weight",
            format!(
                "poisson_base + poisson_p_weight must not exceed 1, got {}",
                k.poisson_base + k.poisson_p_weight
            ),
        ));
    }
    if k.trend_base + k.trend_r_squared_weight > 1.0 {
        return Err(invalid(
            "confidence.trend_r_squared_weight",
            "trend_base + trend_r_squared_weight must not exceed 1".to_string(),
        ));
    }

    let u = &config.urgency;
    for (field, value) in [
        ("urgency.per_open_bridge", u.per_open_bridge),
        ("urgency.open_bridge_cap", u.open_bridge_cap),
        ("urgency.peak_hour", u.peak_hour),
        ("urgency.busy_weekday", u.busy_weekday),
        ("urgency.unstable", u.unstable),
        ("urgency.very_unstable", u.very_unstable),
    ] {
        check_range(field, value, 0.0, 1.0)?;
    }
    check_range("urgency.max_reduction", u.max_reduction, 0.0, 0.9)?;

    Ok(())
}

fn invalid(field: &str, message: String) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message,
    }
}

fn check_range(field: &str, value: f64, lo: f64, hi: f64) -> ValidationResult<()> {
    if !value.is_finite() || value < lo || value > hi {
        return Err(invalid(field, format!("Must be in [{lo}, {hi}], got {value}")));
    }
    Ok(())
}

fn check_positive(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, format!("Must be positive, got {value}")));
    }
    Ok(())
}

/// Value must lie in `(0, 1]`.
fn check_unit_open(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(invalid(field, format!("Must be in (0, 1], got {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        validate_config(&AnalysisConfig::default()).unwrap();
    }

    #[test]
    fn test_version_mismatch() {
        let mut config = AnalysisConfig::default();
        config.schema_version = "0.9.0".to_string();
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.code(), 66);
    }

    #[test]
    fn test_interval_outside_contract() {
        let mut config = AnalysisConfig::default();
        config.intervals.min_seconds = 60.0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "intervals.min_seconds"));
    }

    #[test]
    fn test_default_interval_inside_bounds() {
        let mut config = AnalysisConfig::default();
        config.intervals.max_seconds = 1800.0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("intervals.default_seconds"));
    }

    #[test]
    fn test_nan_rejected() {
        let mut config = AnalysisConfig::default();
        config.change_point.cusum_h = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rate_shift_factor_above_one() {
        let mut config = AnalysisConfig::default();
        config.change_point.rate_shift_factor = 1.0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("rate_shift_factor"));
        config.change_point.rate_shift_factor = 1.5;
        config.change_point.recent_fraction = 0.0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("recent_fraction"));
    }

    #[test]
    fn test_stability_cov_ordering() {
        let mut config = AnalysisConfig::default();
        config.change_point.very_stable_cov = 2.0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::SemanticError(_)));
    }

    #[test]
    fn test_confidence_weights_bounded() {
        let mut config = AnalysisConfig::default();
        config.confidence.poisson_p_weight = 0.6;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("poisson_p_weight"));
    }

    #[test]
    fn test_utc_offset_bounds() {
        let mut config = AnalysisConfig::default();
        config.seasonal.utc_offset_minutes = 900;
        assert!(validate_config(&config).is_err());
        config.seasonal.utc_offset_minutes = -720;
        assert!(validate_config(&config).is_ok());
    }
}
