//! End-to-end scenarios for the refresh-interval engine.
//!
//! Each scenario builds a synthetic log, runs the full pipeline, and checks
//! the recommendation and the analyzer outputs behind it.

use bw_common::{PatternStability, RecommendationMethod, SeasonalPattern, DEFAULT_INTERVAL_SECONDS};
use bw_core::analysis::InterArrivalAnalyzer;
use bw_core::synthetic::{self, default_start};
use bw_core::{EventSnapshot, RefreshAnalyzer};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

// ============================================================================
// Scenario A: sparse data
// ============================================================================

#[test]
fn sparse_log_returns_default_interval() {
    let mut rng = StdRng::seed_from_u64(11);
    let events = synthetic::poisson(&mut rng, 1.0 / 5_400.0, 20, default_start(), "fremont");
    let snapshot = EventSnapshot::new(events);

    let rec = RefreshAnalyzer::with_defaults().recommend(&snapshot, at(2024, 1, 3, 12, 0));
    assert_eq!(rec.method, RecommendationMethod::InsufficientData);
    assert_eq!(rec.interval_seconds, DEFAULT_INTERVAL_SECONDS);
    assert_eq!(rec.confidence, 0.0);
    assert!(rec.is_well_formed());
}

#[test]
fn empty_and_single_event_logs_are_insufficient() {
    let analyzer = RefreshAnalyzer::with_defaults();
    let now = at(2024, 1, 3, 12, 0);
    for n in [0usize, 1] {
        let snapshot = EventSnapshot::new(synthetic::regular(600.0, n, default_start(), "b"));
        let report = analyzer.analyze(&snapshot, now);
        assert_eq!(report.recommendation.method, RecommendationMethod::InsufficientData);
        assert_eq!(report.state.pattern_stability, PatternStability::Unknown);
    }
}

// ============================================================================
// Scenario B: perfectly regular
// ============================================================================

#[test]
fn regular_hourly_log_is_very_stable_poisson() {
    let snapshot = EventSnapshot::new(synthetic::regular(3_600.0, 300, default_start(), "fremont"));
    let report = RefreshAnalyzer::with_defaults().analyze(&snapshot, at(2024, 1, 14, 12, 0));

    assert_eq!(report.state.pattern_stability, PatternStability::VeryStable);
    let rec = &report.recommendation;
    assert_eq!(rec.method, RecommendationMethod::PoissonProcess);
    assert!((rec.interval_seconds - 3_600.0).abs() <= 360.0, "{}", rec.interval_seconds);
    assert!(rec.confidence >= 0.8, "{}", rec.confidence);
    assert!(rec.is_well_formed());
}

// ============================================================================
// Scenario C: weekday commute peaks
// ============================================================================

#[test]
fn commute_log_has_hourly_peaks_and_busy_weekdays() {
    let snapshot = EventSnapshot::new(synthetic::commute(500, default_start(), "fremont"));
    // Wednesday, inside the 08:00 peak.
    let report = RefreshAnalyzer::with_defaults().analyze(&snapshot, at(2024, 5, 1, 8, 30));

    for hour in [7u8, 8, 9, 16, 17, 18] {
        assert!(report.seasonal.peak_hours.contains(&hour), "missing peak hour {hour}");
    }
    for day in 1u8..=5 {
        assert!(report.seasonal.busy_weekdays.contains(&day), "missing weekday {day}");
    }
    assert_eq!(report.seasonal.dominant, SeasonalPattern::Hourly);
    assert!(!report.change_points.has_change());
    assert_eq!(report.recommendation.method, RecommendationMethod::SeasonalAnalysis);
    assert_eq!(report.insights.peak_hours, report.seasonal.peak_hours);
}

#[test]
fn commute_log_off_peak_polls_less_often() {
    let analyzer = RefreshAnalyzer::with_defaults();
    let snapshot = EventSnapshot::new(synthetic::commute(500, default_start(), "fremont"));
    let peak = analyzer.recommend(&snapshot, at(2024, 5, 1, 8, 30));
    let night = analyzer.recommend(&snapshot, at(2024, 5, 1, 2, 30));

    assert_eq!(night.method, RecommendationMethod::SeasonalAnalysis);
    assert!(peak.interval_seconds < night.interval_seconds);
}

// ============================================================================
// Scenario D: regime shift
// ============================================================================

#[test]
fn regime_shift_tracks_new_rate() {
    let mut deltas = vec![3_600.0; 99];
    deltas.extend(std::iter::repeat(600.0).take(100));
    let events = synthetic::from_deltas(&deltas, default_start(), "fremont");
    let last = events[events.len() - 1].open_time;
    let snapshot = EventSnapshot::new(events);

    let report = RefreshAnalyzer::with_defaults().analyze(&snapshot, last + Duration::minutes(15));
    let rec = &report.recommendation;
    assert_eq!(rec.method, RecommendationMethod::ChangeDetection);

    let blended = deltas.iter().sum::<f64>() / deltas.len() as f64;
    assert!(
        (rec.interval_seconds - 600.0).abs() < (rec.interval_seconds - blended).abs(),
        "interval {} closer to blended {blended}",
        rec.interval_seconds
    );
    assert_eq!(report.change_points.changes[0].index, 99);
    assert_eq!(report.change_points.change_index, Some(99));
    assert_eq!(report.state.pattern_stability, PatternStability::Unstable);
    assert!(rec.reasoning.contains("increase"), "{}", rec.reasoning);
}

// ============================================================================
// Rate recovery
// ============================================================================

#[test]
fn exponential_rate_is_recovered() {
    for (seed, mean_s) in [(1u64, 1_800.0), (2, 600.0), (3, 7_200.0)] {
        let mut rng = StdRng::seed_from_u64(seed);
        let lambda = 1.0 / mean_s;
        let events = synthetic::poisson(&mut rng, lambda, 2_000, default_start(), "b");
        let stats = InterArrivalAnalyzer::default().analyze(&EventSnapshot::new(events));
        let err = (stats.lambda_hat - lambda).abs() / lambda;
        assert!(err < 0.10, "seed {seed}: λ̂ {} vs λ {lambda}", stats.lambda_hat);
    }
}

#[test]
fn poisson_log_gets_modeled_recommendation() {
    let mut rng = StdRng::seed_from_u64(5);
    let events = synthetic::poisson(&mut rng, 1.0 / 1_800.0, 600, default_start(), "b");
    let snapshot = EventSnapshot::new(events);
    let report = RefreshAnalyzer::with_defaults().analyze(&snapshot, at(2024, 2, 1, 3, 0));
    let rec = &report.recommendation;
    assert!(rec.is_well_formed());
    assert_eq!(rec.method, RecommendationMethod::PoissonProcess, "{}", rec.reasoning);
    assert!(!report.change_points.change_detected);
    assert_eq!(report.state.pattern_stability, PatternStability::Stable);
}

#[test]
fn old_regime_shift_falls_back_to_poisson_model() {
    // The shift at delta 130 of 400 is older than the recent window.
    let mut deltas = vec![3_600.0; 130];
    deltas.extend(std::iter::repeat(600.0).take(270));
    let events = synthetic::from_deltas(&deltas, default_start(), "fremont");
    let last = events[events.len() - 1].open_time;
    let snapshot = EventSnapshot::new(events);

    let report = RefreshAnalyzer::with_defaults().analyze(&snapshot, last + Duration::minutes(5));
    assert_eq!(report.change_points.changes.len(), 1);
    assert_eq!(report.change_points.changes[0].index, 130);
    assert!(!report.change_points.change_detected);
    assert_eq!(report.state.pattern_stability, PatternStability::Stable);
    assert_eq!(report.recommendation.method, RecommendationMethod::PoissonProcess);
}
