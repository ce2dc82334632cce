//! Descriptive insights and qualitative state for "why" displays.

use std::collections::BTreeSet;

use bw_common::{AnalysisState, BridgeDataInsights};
use bw_math::mean;

use crate::analysis::{ChangeDetection, SeasonalAnalysis, TrendAnalysis};
use crate::snapshot::EventSnapshot;

/// Facts about the log: size, open bridges, durations, busy bins.
pub fn build_insights(snapshot: &EventSnapshot, seasonal: &SeasonalAnalysis) -> BridgeDataInsights {
    let open: BTreeSet<&str> = snapshot
        .events()
        .iter()
        .filter(|e| e.is_open())
        .map(|e| e.bridge_id.as_str())
        .collect();
    let durations: Vec<f64> = snapshot
        .events()
        .iter()
        .filter(|e| !e.is_open() && e.duration_minutes > 0.0)
        .map(|e| e.duration_minutes)
        .collect();

    BridgeDataInsights {
        total_events: snapshot.len(),
        currently_open: open.len(),
        average_duration_minutes: mean(&durations),
        peak_hours: seasonal.peak_hours.clone(),
        busy_weekdays: seasonal.busy_weekdays.clone(),
    }
}

/// Qualitative summary of the analyzers.
pub fn build_state(
    changes: &ChangeDetection,
    seasonal: &SeasonalAnalysis,
    trend: &TrendAnalysis,
) -> AnalysisState {
    AnalysisState {
        pattern_stability: changes.stability,
        seasonal_patterns: seasonal.patterns.clone(),
        trend_direction: trend.direction,
    }
}
