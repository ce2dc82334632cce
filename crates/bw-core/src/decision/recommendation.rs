//! Rule cascade turning analyzer outputs into one recommendation.
//!
//! Rules are tried in a fixed order and the first applicable one decides:
//! insufficient data, recent confirmed change, seasonal pattern, trend, and finally
//! the plain Poisson model. Every branch clamps its interval and explains
//! itself in `reasoning`.

use bw_common::{RecommendationMethod, RefreshIntervalRecommendation};
use bw_config::AnalysisConfig;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::analysis::{
    ChangeDetection, GoodnessOfFit, InterArrivalStats, SeasonalAnalysis, Thresholds, TrendAnalysis,
};

/// Everything the rules read. Borrowed from one engine run.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub stats: &'a InterArrivalStats,
    pub seasonal: &'a SeasonalAnalysis,
    pub trend: &'a TrendAnalysis,
    pub changes: &'a ChangeDetection,
    pub fit: &'a GoodnessOfFit,
    pub thresholds: Option<&'a Thresholds>,
}

/// Apply the rule cascade.
pub fn decide(
    inputs: &DecisionInputs<'_>,
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> RefreshIntervalRecommendation {
    let minimum = config.inter_arrival.minimum_samples;
    let thresholds = match inputs.thresholds {
        Some(t) if inputs.stats.is_sufficient(minimum) => t,
        _ => return insufficient(inputs.stats, config, now),
    };

    let rec = change_rule(inputs, config, now)
        .or_else(|| seasonal_rule(inputs, thresholds, config, now))
        .or_else(|| trend_rule(inputs, thresholds, config, now))
        .unwrap_or_else(|| poisson_rule(inputs, thresholds, config, now));
    debug!(
        method = %rec.method,
        interval_seconds = rec.interval_seconds,
        confidence = rec.confidence,
        "rule selected"
    );
    rec
}

fn insufficient(
    stats: &InterArrivalStats,
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> RefreshIntervalRecommendation {
    let default = config.clamp_interval(config.intervals.default_seconds);
    RefreshIntervalRecommendation::insufficient_data(
        default,
        format!(
            "Only {} inter-arrival samples (need {}); polling every {} using the default interval",
            stats.sample_count,
            config.inter_arrival.minimum_samples,
            format_interval(default)
        ),
        now,
    )
}

fn change_rule(
    inputs: &DecisionInputs<'_>,
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> Option<RefreshIntervalRecommendation> {
    let change = inputs.changes.recent_change()?;
    let post = inputs.stats.deltas.get(change.index..)?;
    if post.len() < config.change_point.min_post_change_samples {
        return None;
    }
    let candidate = Thresholds::from_deltas(post, &config.intervals)?.candidate(config.strategy);
    let interval = config.clamp_interval(candidate);

    let c = &config.confidence;
    let progress =
        (post.len() as f64 / config.inter_arrival.minimum_samples.max(1) as f64).min(1.0);
    let scale = c.change_scale_min + (c.change_scale_max - c.change_scale_min) * progress;
    let confidence = (c.change_base * scale).clamp(0.0, 1.0);

    let ago = change
        .at
        .map(|at| format!(" {}", format_ago(now - at)))
        .unwrap_or_default();
    let reasoning = format!(
        "Detected {:.1}x rate {}{ago}; polling every {} (P{:.0} of {} post-change intervals)",
        rate_factor(change.rate_ratio()),
        change.direction,
        format_interval(interval),
        config.strategy.percentile(),
        post.len()
    );
    Some(recommendation(
        interval,
        confidence,
        RecommendationMethod::ChangeDetection,
        reasoning,
        now,
    ))
}

fn seasonal_rule(
    inputs: &DecisionInputs<'_>,
    thresholds: &Thresholds,
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> Option<RefreshIntervalRecommendation> {
    let seasonal = inputs.seasonal;
    if !seasonal.has_pattern() {
        return None;
    }
    let in_peak = seasonal.is_peak(now);
    let candidate = if in_peak {
        thresholds.moderate * config.seasonal.peak_interval_factor
    } else {
        thresholds.conservative
    };
    let interval = config.clamp_interval(candidate);

    let c = &config.confidence;
    let cov = seasonal.dominant_cov();
    let confidence = (c.seasonal_base + c.seasonal_cov_weight * cov.min(c.seasonal_cov_cap))
        .min(c.seasonal_max)
        .clamp(0.0, 1.0);

    let window = if in_peak {
        "inside the peak window"
    } else {
        "outside the peak window"
    };
    let reasoning = format!(
        "Strong {} pattern (CoV {:.2}, {}); {window}, polling every {}",
        seasonal.dominant,
        cov,
        seasonal.describe_peak(),
        format_interval(interval)
    );
    Some(recommendation(
        interval,
        confidence,
        RecommendationMethod::SeasonalAnalysis,
        reasoning,
        now,
    ))
}

fn trend_rule(
    inputs: &DecisionInputs<'_>,
    thresholds: &Thresholds,
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> Option<RefreshIntervalRecommendation> {
    let trend = inputs.trend;
    if !trend.is_trending() {
        return None;
    }
    let interval =
        config.clamp_interval(thresholds.candidate(config.strategy) * trend.interval_factor);
    let c = &config.confidence;
    let confidence = (c.trend_base + c.trend_r_squared_weight * trend.r_squared).clamp(0.0, 1.0);
    let reasoning = format!(
        "Event rate {} by {:.1}% per {:.0}-day window (r² {:.2}); polling every {}",
        trend.direction,
        trend.relative_slope.abs() * 100.0,
        config.trend.window_days,
        trend.r_squared,
        format_interval(interval)
    );
    Some(recommendation(
        interval,
        confidence,
        RecommendationMethod::TrendAnalysis,
        reasoning,
        now,
    ))
}

fn poisson_rule(
    inputs: &DecisionInputs<'_>,
    thresholds: &Thresholds,
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> RefreshIntervalRecommendation {
    let interval = config.clamp_interval(thresholds.candidate(config.strategy));
    let c = &config.confidence;
    let mut confidence = c.poisson_base + c.poisson_p_weight * inputs.fit.p_value;
    if inputs.changes.degenerate {
        confidence = confidence.min(c.degenerate_cap);
    }
    let fit_note = if inputs.fit.applicable {
        format!("recent/historical KS p = {:.2}", inputs.fit.p_value)
    } else {
        "too few samples for a recent/historical fit check".to_string()
    };
    let reasoning = format!(
        "Poisson model with {:.2} openings/hour ({} samples, {}); polling every {} (P{:.0})",
        inputs.stats.events_per_hour(),
        inputs.stats.sample_count,
        fit_note,
        format_interval(interval),
        config.strategy.percentile()
    );
    recommendation(
        interval,
        confidence.clamp(0.0, 1.0),
        RecommendationMethod::PoissonProcess,
        reasoning,
        now,
    )
}

fn recommendation(
    interval_seconds: f64,
    confidence: f64,
    method: RecommendationMethod,
    reasoning: String,
    computed_at: DateTime<Utc>,
) -> RefreshIntervalRecommendation {
    RefreshIntervalRecommendation {
        interval_seconds,
        confidence,
        method,
        reasoning,
        computed_at,
    }
}

/// Multiplicative size of a rate change, always `≥ 1`.
fn rate_factor(ratio: f64) -> f64 {
    if ratio > 0.0 && ratio < 1.0 {
        1.0 / ratio
    } else {
        ratio
    }
}

/// Human interval: "45 s", "12 min", "2.5 h".
pub fn format_interval(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{seconds:.0} s")
    } else if seconds < 3_600.0 {
        format!("{:.0} min", seconds / 60.0)
    } else {
        format!("{:.1} h", seconds / 3_600.0)
    }
}

fn format_ago(elapsed: chrono::Duration) -> String {
    let minutes = elapsed.num_minutes();
    if minutes < 0 {
        "recently".to_string()
    } else if minutes < 60 {
        format!("{minutes} min ago")
    } else if minutes < 48 * 60 {
        format!("{} h ago", minutes / 60)
    } else {
        format!("{} days ago", minutes / (24 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ChangeDirection, ChangePoint, GroupingStats};
    use bw_common::{PatternStability, SeasonalPattern, TrendDirection};
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, 8, 30, 0).unwrap()
    }

    fn stats(deltas: Vec<f64>) -> InterArrivalStats {
        InterArrivalStats {
            sample_count: deltas.len(),
            duplicates_dropped: 0,
            lambda_hat: 1.0 / bw_math::mean(&deltas).max(1.0),
            mean_delta: bw_math::mean(&deltas),
            std_dev: bw_math::std_dev(&deltas),
            coefficient_of_variation: bw_math::coefficient_of_variation(&deltas),
            deltas,
            delta_times: Vec::new(),
        }
    }

    fn grouping(cov: f64) -> GroupingStats {
        GroupingStats {
            counts: Vec::new(),
            mean: 1.0,
            std_dev: cov,
            coefficient_of_variation: cov,
            peak_ratio: 1.0,
            evaluated: true,
            patterned: false,
        }
    }

    fn no_season() -> SeasonalAnalysis {
        SeasonalAnalysis {
            dominant: SeasonalPattern::None,
            patterns: vec![SeasonalPattern::None],
            hourly: grouping(0.1),
            daily: grouping(0.1),
            monthly: grouping(0.0),
            peak_hours: BTreeSet::new(),
            busy_weekdays: BTreeSet::new(),
            busy_months: BTreeSet::new(),
            utc_offset_minutes: 0,
        }
    }

    fn flat_trend() -> TrendAnalysis {
        TrendAnalysis {
            direction: TrendDirection::Stable,
            window_counts: Vec::new(),
            slope: 0.0,
            relative_slope: 0.0,
            r_squared: 0.0,
            interval_factor: 1.0,
            evaluated: false,
        }
    }

    fn no_changes(n: usize, degenerate: bool) -> ChangeDetection {
        ChangeDetection {
            change_detected: false,
            change_index: None,
            changes: Vec::new(),
            stability: PatternStability::Stable,
            sample_count: n,
            coefficient_of_variation: 0.0,
            degenerate,
            cusum_alarms: 0,
            ewma_alarms: 0,
        }
    }

    /// A recent 6x rate increase at `index`.
    fn speedup(index: usize) -> ChangePoint {
        ChangePoint {
            index,
            at: None,
            cusum_alarm: index + 13,
            ewma_alarm: index + 1,
            direction: ChangeDirection::RateIncrease,
            likelihood_ratio: 80.0,
            recent: true,
            mean_before: 3_600.0,
            mean_after: 600.0,
        }
    }

    fn fit(p: f64) -> GoodnessOfFit {
        GoodnessOfFit {
            applicable: true,
            statistic: 0.0,
            p_value: p,
            recent_samples: 50,
            historical_samples: 50,
            diverged: p < 0.05,
        }
    }

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    struct Case {
        stats: InterArrivalStats,
        seasonal: SeasonalAnalysis,
        trend: TrendAnalysis,
        changes: ChangeDetection,
        fit: GoodnessOfFit,
        thresholds: Option<Thresholds>,
    }

    impl Case {
        fn poisson(deltas: Vec<f64>) -> Self {
            let n = deltas.len();
            let thresholds = Thresholds::from_deltas(&deltas, &bw_config::IntervalBounds::default());
            Self {
                stats: stats(deltas),
                seasonal: no_season(),
                trend: flat_trend(),
                changes: no_changes(n, false),
                fit: fit(0.6),
                thresholds,
            }
        }

        fn decide(&self, config: &AnalysisConfig) -> RefreshIntervalRecommendation {
            let inputs = DecisionInputs {
                stats: &self.stats,
                seasonal: &self.seasonal,
                trend: &self.trend,
                changes: &self.changes,
                fit: &self.fit,
                thresholds: self.thresholds.as_ref(),
            };
            decide(&inputs, config, now())
        }
    }

    fn spread(n: usize, lo: f64, hi: f64) -> Vec<f64> {
        (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect()
    }

    #[test]
    fn test_insufficient_samples() {
        let rec = Case::poisson(vec![600.0; 19]).decide(&AnalysisConfig::default());
        assert_eq!(rec.method, RecommendationMethod::InsufficientData);
        assert_eq!(rec.interval_seconds, 3_600.0);
        assert_eq!(rec.confidence, 0.0);
        assert!(rec.reasoning.contains("19"));
        assert_eq!(rec.computed_at, now());
    }

    #[test]
    fn test_poisson_confidence_from_p_value() {
        let rec = Case::poisson(spread(101, 600.0, 1800.0)).decide(&AnalysisConfig::default());
        assert_eq!(rec.method, RecommendationMethod::PoissonProcess);
        assert!(approx_eq(rec.interval_seconds, 1_200.0, 1e-9));
        assert!(approx_eq(rec.confidence, 0.5 + 0.45 * 0.6, 1e-12));
        assert!(rec.reasoning.contains("KS p = 0.60"));
        assert!(rec.is_well_formed());
    }

    #[test]
    fn test_poisson_degenerate_cap() {
        let mut case = Case::poisson(vec![3_600.0; 299]);
        case.fit = fit(1.0);
        case.changes = no_changes(299, true);
        let rec = case.decide(&AnalysisConfig::default());
        assert_eq!(rec.method, RecommendationMethod::PoissonProcess);
        assert_eq!(rec.interval_seconds, 3_600.0);
        assert!(approx_eq(rec.confidence, 0.85, 1e-12));
    }

    #[test]
    fn test_strategy_selects_candidate() {
        let case = Case::poisson(spread(101, 600.0, 1800.0));
        let mut config = AnalysisConfig::default();
        config.strategy = bw_config::PollingStrategy::Aggressive;
        assert!(approx_eq(case.decide(&config).interval_seconds, 900.0, 1e-9));
        config.strategy = bw_config::PollingStrategy::Conservative;
        assert!(approx_eq(case.decide(&config).interval_seconds, 1_500.0, 1e-9));
    }

    #[test]
    fn test_interval_clamped() {
        let rec = Case::poisson(vec![30.0; 100]).decide(&AnalysisConfig::default());
        assert_eq!(rec.interval_seconds, 300.0);
        let rec = Case::poisson(vec![200_000.0; 100]).decide(&AnalysisConfig::default());
        assert_eq!(rec.interval_seconds, 86_400.0);
    }

    #[test]
    fn test_change_rule_uses_post_change_sample() {
        let mut deltas = vec![3_600.0; 99];
        deltas.extend(std::iter::repeat(600.0).take(100));
        let mut case = Case::poisson(deltas);
        case.changes.changes.push(ChangePoint {
            at: Some(now() - chrono::Duration::hours(20)),
            ..speedup(99)
        });
        let rec = case.decide(&AnalysisConfig::default());
        assert_eq!(rec.method, RecommendationMethod::ChangeDetection);
        assert_eq!(rec.interval_seconds, 600.0);
        // 100 post-change samples saturate the scale at 0.8.
        assert!(approx_eq(rec.confidence, 0.72, 1e-12));
        assert!(rec.reasoning.contains("6.0x rate increase 20 h ago"));
    }

    #[test]
    fn test_change_rule_scale_grows_with_samples() {
        let mut deltas = vec![3_600.0; 175];
        deltas.extend(std::iter::repeat(600.0).take(25));
        let mut case = Case::poisson(deltas);
        case.changes.changes.push(speedup(175));
        let rec = case.decide(&AnalysisConfig::default());
        // scale = 0.5 + 0.3 * 25/50
        assert!(approx_eq(rec.confidence, 0.9 * 0.65, 1e-12));
    }

    #[test]
    fn test_change_rule_needs_post_change_samples() {
        let mut deltas = vec![3_600.0; 196];
        deltas.extend(std::iter::repeat(600.0).take(4));
        let mut case = Case::poisson(deltas);
        case.changes.changes.push(speedup(196));
        let rec = case.decide(&AnalysisConfig::default());
        assert_eq!(rec.method, RecommendationMethod::PoissonProcess);
    }

    #[test]
    fn test_old_change_falls_through() {
        let mut deltas = vec![3_600.0; 60];
        deltas.extend(std::iter::repeat(600.0).take(140));
        let mut case = Case::poisson(deltas);
        case.changes.changes.push(ChangePoint {
            recent: false,
            ..speedup(60)
        });
        let rec = case.decide(&AnalysisConfig::default());
        assert_eq!(rec.method, RecommendationMethod::PoissonProcess);

        case.seasonal.dominant = SeasonalPattern::Hourly;
        case.seasonal.patterns = vec![SeasonalPattern::Hourly];
        case.seasonal.hourly = grouping(1.2);
        case.seasonal.peak_hours = [8].into_iter().collect();
        let rec = case.decide(&AnalysisConfig::default());
        assert_eq!(rec.method, RecommendationMethod::SeasonalAnalysis);

        case.changes.changes[0].recent = true;
        let rec = case.decide(&AnalysisConfig::default());
        assert_eq!(rec.method, RecommendationMethod::ChangeDetection);
    }

    #[test]
    fn test_seasonal_rule_peak_and_off_peak() {
        let mut case = Case::poisson(spread(101, 600.0, 1800.0));
        case.seasonal.dominant = SeasonalPattern::Hourly;
        case.seasonal.patterns = vec![SeasonalPattern::Hourly];
        case.seasonal.hourly = grouping(1.2);
        case.seasonal.peak_hours = [8].into_iter().collect();
        let rec = case.decide(&AnalysisConfig::default());
        assert_eq!(rec.method, RecommendationMethod::SeasonalAnalysis);
        assert!(approx_eq(rec.interval_seconds, 600.0, 1e-9));
        assert!(approx_eq(rec.confidence, 0.6 + 0.15 * 1.2, 1e-12));
        assert!(rec.reasoning.contains("inside the peak window"));

        case.seasonal.peak_hours = [17].into_iter().collect();
        let rec = case.decide(&AnalysisConfig::default());
        assert!(approx_eq(rec.interval_seconds, 1_500.0, 1e-9));
        assert!(rec.reasoning.contains("outside"));
    }

    #[test]
    fn test_seasonal_confidence_capped() {
        let mut case = Case::poisson(spread(101, 600.0, 1800.0));
        case.seasonal.dominant = SeasonalPattern::Daily;
        case.seasonal.patterns = vec![SeasonalPattern::Daily];
        case.seasonal.daily = grouping(5.0);
        let rec = case.decide(&AnalysisConfig::default());
        assert!(approx_eq(rec.confidence, 0.9, 1e-12));
    }

    #[test]
    fn test_trend_rule_scales_candidate() {
        let mut case = Case::poisson(spread(101, 600.0, 1800.0));
        case.trend = TrendAnalysis {
            direction: TrendDirection::Increasing,
            window_counts: vec![10.0, 20.0, 30.0, 40.0],
            slope: 10.0,
            relative_slope: 0.4,
            r_squared: 1.0,
            interval_factor: 0.5,
            evaluated: true,
        };
        let rec = case.decide(&AnalysisConfig::default());
        assert_eq!(rec.method, RecommendationMethod::TrendAnalysis);
        assert!(approx_eq(rec.interval_seconds, 600.0, 1e-9));
        assert!(approx_eq(rec.confidence, 0.8, 1e-12));
        assert!(rec.reasoning.contains("increasing by 40.0%"));
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(45.0), "45 s");
        assert_eq!(format_interval(600.0), "10 min");
        assert_eq!(format_interval(5_400.0), "1.5 h");
    }
}
