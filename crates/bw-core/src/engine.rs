//! The refresh-interval engine facade.
//!
//! [`RefreshAnalyzer`] runs every analyzer over one [`EventSnapshot`], applies
//! the rule cascade, then adjusts for current conditions. It holds only its
//! configuration, so one instance can be shared across threads.
//!
//! ```ignore
//! let analyzer = RefreshAnalyzer::with_defaults();
//! let snapshot = EventSnapshot::new(events);
//! let rec = analyzer.recommend(&snapshot, Utc::now());
//! println!("poll every {} s ({})", rec.interval_seconds, rec.method);
//! ```

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};

use bw_common::{AnalysisState, BridgeDataInsights, RefreshIntervalRecommendation};
use bw_config::AnalysisConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{
    ChangeDetection, ChangePointDetector, GoodnessOfFit, GoodnessOfFitTester, InterArrivalAnalyzer,
    InterArrivalStats, SeasonalAnalysis, SeasonalPatternAnalyzer, Thresholds, TrendAnalysis,
    TrendAnalyzer,
};
use crate::decision::{self, urgency, DecisionInputs, UrgencyScore, UrgencySignals};
use crate::insights::{build_insights, build_state};
use crate::log_event;
use crate::logging::{event_names, generate_run_id, LogContext, Stage};
use crate::snapshot::{EventSnapshot, MalformedCounts};

/// Analysis was abandoned because its cancellation flag was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("analysis cancelled")]
pub struct Cancelled;

/// Everything one engine run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub schema_version: String,
    pub snapshot_digest: String,
    pub config_fingerprint: String,
    pub event_count: usize,
    pub malformed: MalformedCounts,
    pub inter_arrival: InterArrivalStats,
    pub seasonal: SeasonalAnalysis,
    pub trend: TrendAnalysis,
    pub change_points: ChangeDetection,
    pub goodness_of_fit: GoodnessOfFit,
    pub thresholds: Option<Thresholds>,
    /// Recommendation before urgency adjustment.
    pub base_recommendation: RefreshIntervalRecommendation,
    pub urgency: UrgencyScore,
    /// Final, urgency-adjusted recommendation.
    pub recommendation: RefreshIntervalRecommendation,
    pub state: AnalysisState,
    pub insights: BridgeDataInsights,
}

/// Adaptive refresh-interval engine.
#[derive(Debug, Clone)]
pub struct RefreshAnalyzer {
    config: AnalysisConfig,
    fingerprint: String,
    inter_arrival: InterArrivalAnalyzer,
    seasonal: SeasonalPatternAnalyzer,
    trend: TrendAnalyzer,
    change_points: ChangePointDetector,
    goodness_of_fit: GoodnessOfFitTester,
}

impl Default for RefreshAnalyzer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RefreshAnalyzer {
    /// Build from an already-validated config.
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            fingerprint: config.fingerprint(),
            inter_arrival: InterArrivalAnalyzer::new(config.inter_arrival.clone()),
            seasonal: SeasonalPatternAnalyzer::new(config.seasonal.clone()),
            trend: TrendAnalyzer::new(config.trend.clone()),
            change_points: ChangePointDetector::new(config.change_point.clone()),
            goodness_of_fit: GoodnessOfFitTester::new(config.goodness_of_fit.clone()),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(AnalysisConfig::default())
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// SHA-256 fingerprint of the effective config.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Final recommendation for `snapshot` at wall-clock `now`.
    pub fn recommend(
        &self,
        snapshot: &EventSnapshot,
        now: DateTime<Utc>,
    ) -> RefreshIntervalRecommendation {
        self.analyze(snapshot, now).recommendation
    }

    /// Full analysis report.
    pub fn analyze(&self, snapshot: &EventSnapshot, now: DateTime<Utc>) -> AnalysisReport {
        let ctx = LogContext::new(generate_run_id()).with_snapshot(snapshot.digest());
        self.analyze_logged(snapshot, now, &ctx)
    }

    /// Full analysis report, logging under the caller's run context.
    pub fn analyze_logged(
        &self,
        snapshot: &EventSnapshot,
        now: DateTime<Utc>,
        ctx: &LogContext,
    ) -> AnalysisReport {
        match self.run(snapshot, now, ctx, || Ok::<(), Infallible>(())) {
            Ok(report) => report,
            Err(never) => match never {},
        }
    }

    /// Analysis that checks `cancel` between stages.
    pub fn analyze_cancellable(
        &self,
        snapshot: &EventSnapshot,
        now: DateTime<Utc>,
        cancel: &AtomicBool,
        ctx: &LogContext,
    ) -> Result<AnalysisReport, Cancelled> {
        self.run(snapshot, now, ctx, || {
            if cancel.load(Ordering::Acquire) {
                Err(Cancelled)
            } else {
                Ok(())
            }
        })
    }

    /// Qualitative state without the recommendation.
    pub fn analysis_state(&self, snapshot: &EventSnapshot) -> AnalysisState {
        let stats = self.inter_arrival.analyze(snapshot);
        let changes = self.change_points.detect(&stats);
        let seasonal = self.seasonal.analyze(snapshot);
        let trend = self.trend.analyze(snapshot);
        build_state(&changes, &seasonal, &trend)
    }

    /// Descriptive insights without the recommendation.
    pub fn insights(&self, snapshot: &EventSnapshot) -> BridgeDataInsights {
        build_insights(snapshot, &self.seasonal.analyze(snapshot))
    }

    /// The staged pipeline; `checkpoint` runs between stages.
    fn run<E>(
        &self,
        snapshot: &EventSnapshot,
        now: DateTime<Utc>,
        ctx: &LogContext,
        checkpoint: impl Fn() -> Result<(), E>,
    ) -> Result<AnalysisReport, E> {
        log_event!(
            ctx,
            DEBUG,
            event_names::INGEST_LOADED,
            Stage::Ingest,
            "snapshot ready",
            events = snapshot.len(),
            malformed = snapshot.malformed().total()
        );

        checkpoint()?;
        let stats = self.inter_arrival.analyze(snapshot);
        let seasonal = self.seasonal.analyze(snapshot);
        let trend = self.trend.analyze(snapshot);
        log_event!(
            ctx,
            DEBUG,
            event_names::MODEL_FITTED,
            Stage::Model,
            "models fitted",
            samples = stats.sample_count,
            lambda_hat = stats.lambda_hat,
            seasonal = tracing::field::display(seasonal.dominant),
            trend = tracing::field::display(trend.direction)
        );

        checkpoint()?;
        let changes = self.change_points.detect(&stats);
        let fit = self.goodness_of_fit.test(&stats);
        if let Some(change) = changes.latest() {
            log_event!(
                ctx,
                INFO,
                event_names::DETECT_CHANGE,
                Stage::Detect,
                "change point confirmed",
                index = change.index,
                direction = tracing::field::display(change.direction),
                rate_ratio = change.rate_ratio(),
                recent = change.recent
            );
        }

        checkpoint()?;
        let thresholds = Thresholds::from_deltas(&stats.deltas, &self.config.intervals);
        let inputs = DecisionInputs {
            stats: &stats,
            seasonal: &seasonal,
            trend: &trend,
            changes: &changes,
            fit: &fit,
            thresholds: thresholds.as_ref(),
        };
        let base = decision::decide(&inputs, &self.config, now);
        log_event!(
            ctx,
            INFO,
            event_names::DECIDE_RECOMMENDED,
            Stage::Decide,
            "recommendation ready",
            method = base.method.as_str(),
            interval_seconds = base.interval_seconds,
            confidence = base.confidence
        );

        checkpoint()?;
        let insights = build_insights(snapshot, &seasonal);
        let state = build_state(&changes, &seasonal, &trend);
        let signals = UrgencySignals::from_insights(
            &insights,
            state.pattern_stability,
            now,
            self.config.seasonal.utc_offset_minutes,
        );
        let urgency_score = urgency::score(&self.config, &signals);
        let recommendation = urgency::apply(&base, &urgency_score, &self.config);
        if recommendation.interval_seconds != base.interval_seconds {
            log_event!(
                ctx,
                DEBUG,
                event_names::URGENCY_APPLIED,
                Stage::Urgency,
                "urgency adjusted interval",
                score = urgency_score.score,
                interval_seconds = recommendation.interval_seconds
            );
        }

        Ok(AnalysisReport {
            schema_version: bw_common::SCHEMA_VERSION.to_string(),
            snapshot_digest: snapshot.digest().to_string(),
            config_fingerprint: self.fingerprint.clone(),
            event_count: snapshot.len(),
            malformed: snapshot.malformed(),
            inter_arrival: stats,
            seasonal,
            trend,
            change_points: changes,
            goodness_of_fit: fit,
            thresholds,
            base_recommendation: base,
            urgency: urgency_score,
            recommendation,
            state,
            insights,
        })
    }
}
