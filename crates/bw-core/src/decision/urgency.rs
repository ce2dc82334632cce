//! Urgency adjustment for "right now" conditions.
//!
//! The engine's recommendation describes the historical process. Urgency
//! shortens it when the current moment is busier than average: bridges open
//! right now, a peak hour, a busy weekday, or an unstable process.

use bw_common::{
    BridgeDataInsights, PatternStability, RecommendationMethod, RefreshIntervalRecommendation,
};
use bw_config::AnalysisConfig;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::seasonal::to_local;

/// Current-moment signals feeding the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencySignals {
    pub open_bridges: usize,
    pub is_peak_hour: bool,
    pub is_busy_weekday: bool,
    pub stability: PatternStability,
}

impl UrgencySignals {
    /// Derive signals from insights at wall-clock `now`.
    pub fn from_insights(
        insights: &BridgeDataInsights,
        stability: PatternStability,
        now: DateTime<Utc>,
        utc_offset_minutes: i32,
    ) -> Self {
        let local = to_local(now, utc_offset_minutes);
        Self {
            open_bridges: insights.currently_open,
            is_peak_hour: insights.peak_hours.contains(&(local.hour() as u8)),
            is_busy_weekday: insights
                .busy_weekdays
                .contains(&(local.weekday().number_from_monday() as u8)),
            stability,
        }
    }
}

/// Score plus the contributions that made it up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyScore {
    /// In `[0, 1]`.
    pub score: f64,
    pub open_bridges: f64,
    pub peak_hour: f64,
    pub busy_weekday: f64,
    pub instability: f64,
    /// Multiplier applied to the interval: `1 - max_reduction × score`.
    pub interval_factor: f64,
}

impl UrgencyScore {
    pub fn is_zero(&self) -> bool {
        self.score == 0.0
    }

    /// Names of the contributing signals, for reasoning text.
    pub fn drivers(&self) -> Vec<&'static str> {
        let mut drivers = Vec::new();
        if self.open_bridges > 0.0 {
            drivers.push("bridge open now");
        }
        if self.peak_hour > 0.0 {
            drivers.push("peak hour");
        }
        if self.busy_weekday > 0.0 {
            drivers.push("busy weekday");
        }
        if self.instability > 0.0 {
            drivers.push("unstable pattern");
        }
        drivers
    }
}

/// Compute the urgency score for `signals`.
pub fn score(config: &AnalysisConfig, signals: &UrgencySignals) -> UrgencyScore {
    let c = &config.urgency;
    let open_bridges = (c.per_open_bridge * signals.open_bridges as f64).min(c.open_bridge_cap);
    let peak_hour = if signals.is_peak_hour { c.peak_hour } else { 0.0 };
    let busy_weekday = if signals.is_busy_weekday {
        c.busy_weekday
    } else {
        0.0
    };
    let instability = match signals.stability {
        PatternStability::VeryUnstable => c.very_unstable,
        PatternStability::Unstable => c.unstable,
        _ => 0.0,
    };
    let score = (open_bridges + peak_hour + busy_weekday + instability).clamp(0.0, 1.0);
    UrgencyScore {
        score,
        open_bridges,
        peak_hour,
        busy_weekday,
        instability,
        interval_factor: 1.0 - c.max_reduction * score,
    }
}

/// Apply an urgency score to a recommendation.
///
/// Method and confidence are preserved. `insufficientData` passes through
/// untouched so the default interval stays predictable.
pub fn apply(
    rec: &RefreshIntervalRecommendation,
    urgency: &UrgencyScore,
    config: &AnalysisConfig,
) -> RefreshIntervalRecommendation {
    if rec.method == RecommendationMethod::InsufficientData || urgency.is_zero() {
        return rec.clone();
    }
    let interval = config.clamp_interval(rec.interval_seconds * urgency.interval_factor);
    debug!(
        score = urgency.score,
        base_seconds = rec.interval_seconds,
        adjusted_seconds = interval,
        "urgency applied"
    );
    RefreshIntervalRecommendation {
        interval_seconds: interval,
        reasoning: format!(
            "{}; urgency {:.2} ({}) shortens to {}",
            rec.reasoning,
            urgency.score,
            urgency.drivers().join(", "),
            super::recommendation::format_interval(interval)
        ),
        ..rec.clone()
    }
}
