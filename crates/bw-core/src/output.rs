//! Rendering of command payloads.
//!
//! JSON is the stable machine contract. Markdown and the one-line summary are
//! for people and may change wording between releases.

use std::fmt::Write as _;

use bw_common::{
    AnalysisState, BridgeDataInsights, OutputFormat, RefreshIntervalRecommendation,
};
use serde::Serialize;

use crate::decision::format_interval;
use crate::engine::AnalysisReport;

/// A payload that can be shown in every [`OutputFormat`].
pub trait Render: Serialize {
    fn markdown(&self) -> String;
    fn summary(&self) -> String;
}

/// Render `value` in `format`. Output always ends with a newline.
pub fn render<T: Render>(value: &T, format: OutputFormat) -> Result<String, serde_json::Error> {
    let mut out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Md => value.markdown(),
        OutputFormat::Summary => value.summary(),
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn join_u8(values: impl IntoIterator<Item = u8>) -> String {
    let parts: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

impl Render for RefreshIntervalRecommendation {
    fn markdown(&self) -> String {
        let mut md = String::from("# Refresh interval\n\n");
        let _ = writeln!(md, "| Field | Value |");
        let _ = writeln!(md, "|---|---|");
        let _ = writeln!(
            md,
            "| Interval | {} ({:.0} s) |",
            format_interval(self.interval_seconds),
            self.interval_seconds
        );
        let _ = writeln!(md, "| Confidence | {:.2} |", self.confidence);
        let _ = writeln!(md, "| Method | `{}` |", self.method);
        let _ = writeln!(md, "| Computed | {} |", self.computed_at.to_rfc3339());
        let _ = writeln!(md, "\n{}", self.reasoning);
        md
    }

    fn summary(&self) -> String {
        format!(
            "poll every {} ({}, confidence {:.2})",
            format_interval(self.interval_seconds),
            self.method,
            self.confidence
        )
    }
}

impl Render for AnalysisState {
    fn markdown(&self) -> String {
        let patterns: Vec<String> = self.seasonal_patterns.iter().map(|p| p.to_string()).collect();
        format!(
            "# Analysis state\n\n- Stability: `{}`\n- Seasonal patterns: {}\n- Trend: `{}`\n",
            self.pattern_stability,
            patterns.join(", "),
            self.trend_direction
        )
    }

    fn summary(&self) -> String {
        let patterns: Vec<String> = self.seasonal_patterns.iter().map(|p| p.to_string()).collect();
        format!(
            "stability {}, patterns [{}], trend {}",
            self.pattern_stability,
            patterns.join(","),
            self.trend_direction
        )
    }
}

impl Render for BridgeDataInsights {
    fn markdown(&self) -> String {
        let mut md = String::from("# Bridge insights\n\n");
        let _ = writeln!(md, "- Events: {}", self.total_events);
        let _ = writeln!(md, "- Currently open: {}", self.currently_open);
        let _ = writeln!(
            md,
            "- Average opening: {:.1} min",
            self.average_duration_minutes
        );
        let _ = writeln!(md, "- Peak hours: {}", join_u8(self.peak_hours.iter().copied()));
        let _ = writeln!(
            md,
            "- Busy weekdays (1 = Mon): {}",
            join_u8(self.busy_weekdays.iter().copied())
        );
        md
    }

    fn summary(&self) -> String {
        format!(
            "{} events, {} open, avg {:.1} min",
            self.total_events, self.currently_open, self.average_duration_minutes
        )
    }
}

impl Render for AnalysisReport {
    fn markdown(&self) -> String {
        let mut md = self.recommendation.markdown();
        md.push('\n');

        let _ = writeln!(md, "## Inputs\n");
        let _ = writeln!(md, "- Events: {}", self.event_count);
        let _ = writeln!(md, "- Malformed (skipped): {}", self.malformed.total());
        let _ = writeln!(md, "- Valid deltas: {}", self.inter_arrival.sample_count);
        let _ = writeln!(
            md,
            "- Mean delta: {} (λ̂ = {:.3e}/s)",
            format_interval(self.inter_arrival.mean_delta),
            self.inter_arrival.lambda_hat
        );
        if let Some(t) = &self.thresholds {
            let _ = writeln!(
                md,
                "- Percentiles: P25 {} / P50 {} / P75 {} / P95 {}",
                format_interval(t.p25),
                format_interval(t.p50),
                format_interval(t.p75),
                format_interval(t.p95)
            );
        }

        let _ = writeln!(md, "\n## Signals\n");
        let _ = writeln!(md, "- Stability: `{}`", self.state.pattern_stability);
        let _ = writeln!(md, "- Seasonal: `{}`", self.seasonal.dominant);
        let _ = writeln!(
            md,
            "- Trend: `{}` (relative slope {:+.3}, r² {:.2})",
            self.trend.direction, self.trend.relative_slope, self.trend.r_squared
        );
        for change in &self.change_points.changes {
            let _ = writeln!(
                md,
                "- Change at delta {}: rate {} ({:.1}x){}",
                change.index,
                change.direction,
                change.rate_ratio(),
                if change.recent { ", recent" } else { "" }
            );
        }
        if self.goodness_of_fit.applicable {
            let _ = writeln!(
                md,
                "- KS recent vs historical: D = {:.3}, p = {:.3}",
                self.goodness_of_fit.statistic, self.goodness_of_fit.p_value
            );
        }
        if !self.urgency.is_zero() {
            let _ = writeln!(
                md,
                "- Urgency: {:.2} ({})",
                self.urgency.score,
                self.urgency.drivers().join(", ")
            );
        }
        md.push('\n');
        md.push_str(&self.insights.markdown().replacen("# ", "## ", 1));
        md
    }

    fn summary(&self) -> String {
        format!(
            "{}; {}",
            self.recommendation.summary(),
            self.state.summary()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bw_common::RecommendationMethod;
    use chrono::{TimeZone, Utc};

    fn rec() -> RefreshIntervalRecommendation {
        RefreshIntervalRecommendation {
            interval_seconds: 900.0,
            confidence: 0.75,
            method: RecommendationMethod::PoissonProcess,
            reasoning: "Steady arrivals".to_string(),
            computed_at: Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_json_uses_contract_field_names() {
        let out = render(&rec(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["interval_seconds"], 900.0);
        assert_eq!(value["method"], "poissonProcess");
        assert!(value["computed_at"].as_str().unwrap().starts_with("2025-03-03T08:00:00"));
    }

    #[test]
    fn test_summary_line() {
        let out = render(&rec(), OutputFormat::Summary).unwrap();
        assert_eq!(out, "poll every 15 min (poissonProcess, confidence 0.75)\n");
    }

    #[test]
    fn test_markdown_contains_reasoning() {
        let out = render(&rec(), OutputFormat::Md).unwrap();
        assert!(out.starts_with("# Refresh interval"));
        assert!(out.contains("Steady arrivals"));
    }

    #[test]
    fn test_empty_insights_markdown() {
        let out = BridgeDataInsights::default().markdown();
        assert!(out.contains("Peak hours: -"));
    }
}
