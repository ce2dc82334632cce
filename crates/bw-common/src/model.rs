//! Recommendation model and analysis summaries.
//!
//! These types form the stable output contract consumed by the app:
//! ```json
//! {
//!   "interval_seconds": 720.0,
//!   "confidence": 0.72,
//!   "method": "changeDetection",
//!   "reasoning": "Detected 6.0x rate increase 1 day ago; ...",
//!   "computed_at": "2025-03-03T08:00:00Z"
//! }
//! ```
//! Enum values serialize as camelCase strings.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shortest interval the engine will ever recommend (5 minutes).
pub const MIN_INTERVAL_SECONDS: f64 = 300.0;
/// Longest interval the engine will ever recommend (24 hours).
pub const MAX_INTERVAL_SECONDS: f64 = 86_400.0;
/// Interval used when there is not enough data to model anything.
pub const DEFAULT_INTERVAL_SECONDS: f64 = 3_600.0;

/// How steady the inter-arrival process looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PatternStability {
    VeryStable,
    Stable,
    Unstable,
    VeryUnstable,
    Unknown,
}

impl PatternStability {
    /// Whether the stability should raise polling urgency.
    pub fn is_unstable(&self) -> bool {
        matches!(self, PatternStability::Unstable | PatternStability::VeryUnstable)
    }
}

impl std::fmt::Display for PatternStability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternStability::VeryStable => write!(f, "veryStable"),
            PatternStability::Stable => write!(f, "stable"),
            PatternStability::Unstable => write!(f, "unstable"),
            PatternStability::VeryUnstable => write!(f, "veryUnstable"),
            PatternStability::Unknown => write!(f, "unknown"),
        }
    }
}

/// Periodicity found in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SeasonalPattern {
    Hourly,
    Daily,
    Monthly,
    None,
}

impl std::fmt::Display for SeasonalPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeasonalPattern::Hourly => write!(f, "hourly"),
            SeasonalPattern::Daily => write!(f, "daily"),
            SeasonalPattern::Monthly => write!(f, "monthly"),
            SeasonalPattern::None => write!(f, "none"),
        }
    }
}

/// Direction of the long-run event rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

/// Which rule produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RecommendationMethod {
    InsufficientData,
    PoissonProcess,
    /// Accepted on input for compatibility; the current decision order never
    /// emits it.
    PatternAnalysis,
    ChangeDetection,
    SeasonalAnalysis,
    TrendAnalysis,
}

impl RecommendationMethod {
    pub const ALL: &'static [RecommendationMethod] = &[
        RecommendationMethod::InsufficientData,
        RecommendationMethod::PoissonProcess,
        RecommendationMethod::PatternAnalysis,
        RecommendationMethod::ChangeDetection,
        RecommendationMethod::SeasonalAnalysis,
        RecommendationMethod::TrendAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationMethod::InsufficientData => "insufficientData",
            RecommendationMethod::PoissonProcess => "poissonProcess",
            RecommendationMethod::PatternAnalysis => "patternAnalysis",
            RecommendationMethod::ChangeDetection => "changeDetection",
            RecommendationMethod::SeasonalAnalysis => "seasonalAnalysis",
            RecommendationMethod::TrendAnalysis => "trendAnalysis",
        }
    }
}

impl std::fmt::Display for RecommendationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The engine's answer: how often to poll, how sure it is, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RefreshIntervalRecommendation {
    /// Always within `[MIN_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS]`.
    pub interval_seconds: f64,
    /// In `[0, 1]`; exactly 0 iff `method` is `insufficientData`.
    pub confidence: f64,
    pub method: RecommendationMethod,
    pub reasoning: String,
    pub computed_at: DateTime<Utc>,
}

impl RefreshIntervalRecommendation {
    /// Recommendation for a log too sparse to model.
    pub fn insufficient_data(
        interval_seconds: f64,
        reasoning: impl Into<String>,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            interval_seconds: interval_seconds.clamp(MIN_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS),
            confidence: 0.0,
            method: RecommendationMethod::InsufficientData,
            reasoning: reasoning.into(),
            computed_at,
        }
    }

    /// Interval rounded to whole minutes, for display.
    pub fn interval_minutes(&self) -> f64 {
        (self.interval_seconds / 60.0).round()
    }

    /// Check the contract invariants.
    pub fn is_well_formed(&self) -> bool {
        let bounded = (MIN_INTERVAL_SECONDS..=MAX_INTERVAL_SECONDS).contains(&self.interval_seconds);
        let confidence_ok = (0.0..=1.0).contains(&self.confidence);
        let zero_iff_insufficient =
            (self.confidence == 0.0) == (self.method == RecommendationMethod::InsufficientData);
        bounded && confidence_ok && zero_iff_insufficient
    }
}

/// Snapshot of the qualitative analysis, for "why" displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisState {
    pub pattern_stability: PatternStability,
    /// Qualifying patterns in precedence order, or `[none]`.
    pub seasonal_patterns: Vec<SeasonalPattern>,
    pub trend_direction: TrendDirection,
}

impl Default for AnalysisState {
    fn default() -> Self {
        Self {
            pattern_stability: PatternStability::Unknown,
            seasonal_patterns: vec![SeasonalPattern::None],
            trend_direction: TrendDirection::Stable,
        }
    }
}

/// Descriptive facts about the event log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BridgeDataInsights {
    pub total_events: usize,
    /// Distinct bridges with an event that has not closed yet.
    pub currently_open: usize,
    pub average_duration_minutes: f64,
    /// Hours of day (0..=23).
    pub peak_hours: BTreeSet<u8>,
    /// ISO weekdays (1 = Monday .. 7 = Sunday).
    pub busy_weekdays: BTreeSet<u8>,
}
