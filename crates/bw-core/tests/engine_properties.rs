//! Property-based tests for the recommendation contract.

use bw_common::{Event, RecommendationMethod, MAX_INTERVAL_SECONDS, MIN_INTERVAL_SECONDS};
use bw_config::{get_preset, AnalysisConfig, PresetName};
use bw_core::analysis::InterArrivalAnalyzer;
use bw_core::{EventSnapshot, RefreshAnalyzer};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
}

/// Offsets (seconds from t0), open durations (minutes; 0 = still open), and
/// a bridge index.
fn log_strategy() -> impl Strategy<Value = Vec<(i64, i64, u8)>> {
    prop::collection::vec((0i64..8_000_000, 0i64..30, 0u8..3), 0..160)
}

fn events(log: &[(i64, i64, u8)]) -> Vec<Event> {
    log.iter()
        .enumerate()
        .map(|(i, &(offset, minutes, bridge))| {
            let open = t0() + Duration::seconds(offset);
            let event = Event::new(i.to_string(), format!("bridge-{bridge}"), open);
            if minutes == 0 {
                event
            } else {
                event.closed_at(open + Duration::minutes(minutes))
            }
        })
        .collect()
}

fn build(log: &[(i64, i64, u8)]) -> EventSnapshot {
    EventSnapshot::new(events(log))
}

fn preset_strategy() -> impl Strategy<Value = AnalysisConfig> {
    prop_oneof![
        Just(AnalysisConfig::default()),
        Just(get_preset(PresetName::BatterySaver)),
        Just(get_preset(PresetName::Realtime)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    /// Every recommendation is inside the hard bounds with valid confidence.
    #[test]
    fn recommendation_is_well_formed(
        log in log_strategy(),
        config in preset_strategy(),
        now_offset in 0i64..9_000_000,
    ) {
        let analyzer = RefreshAnalyzer::new(config);
        let rec = analyzer.recommend(&build(&log), t0() + Duration::seconds(now_offset));
        prop_assert!(rec.interval_seconds >= MIN_INTERVAL_SECONDS, "{:?}", rec);
        prop_assert!(rec.interval_seconds <= MAX_INTERVAL_SECONDS, "{:?}", rec);
        prop_assert!((0.0..=1.0).contains(&rec.confidence), "{:?}", rec);
        prop_assert!(rec.is_well_formed(), "{:?}", rec);
    }

    /// Identical snapshots give identical reports.
    #[test]
    fn analysis_is_deterministic(log in log_strategy(), now_offset in 0i64..9_000_000) {
        let analyzer = RefreshAnalyzer::with_defaults();
        let now = t0() + Duration::seconds(now_offset);
        let a = analyzer.analyze(&build(&log), now);
        let b = analyzer.analyze(&build(&log), now);
        prop_assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    /// Input order does not matter.
    #[test]
    fn analysis_ignores_input_order(log in log_strategy()) {
        let mut events = events(&log);
        let forward = EventSnapshot::new(events.clone());
        events.reverse();
        let backward = EventSnapshot::new(events);
        prop_assert_eq!(forward.digest(), backward.digest());

        let analyzer = RefreshAnalyzer::with_defaults();
        let now = t0() + Duration::days(100);
        prop_assert_eq!(analyzer.recommend(&forward, now), analyzer.recommend(&backward, now));
    }

    /// Below the sample floor the answer is always the insufficient default.
    #[test]
    fn sample_floor_forces_insufficient_data(log in prop::collection::vec((0i64..8_000_000, 1i64..30, 0u8..3), 0..50)) {
        let snapshot = build(&log);
        let stats = InterArrivalAnalyzer::default().analyze(&snapshot);
        prop_assume!(stats.sample_count < 50);
        let rec = RefreshAnalyzer::with_defaults().recommend(&snapshot, t0());
        prop_assert_eq!(rec.method, RecommendationMethod::InsufficientData);
        prop_assert_eq!(rec.confidence, 0.0);
    }

    /// Confidence is zero exactly when data is insufficient.
    #[test]
    fn zero_confidence_iff_insufficient(log in log_strategy()) {
        let rec = RefreshAnalyzer::with_defaults().recommend(&build(&log), t0() + Duration::days(95));
        prop_assert_eq!(
            rec.confidence == 0.0,
            rec.method == RecommendationMethod::InsufficientData
        );
    }
}
