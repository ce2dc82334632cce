//! Event vocabulary for structured logs.
//!
//! Every line carries the run id, the snapshot digest prefix and the
//! pipeline stage, so one analysis can be followed across the JSONL stream.

use serde::{Deserialize, Serialize};

/// Pipeline stage a log line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Reading, validating, sorting.
    Ingest,
    /// Inter-arrival, seasonal and trend fits.
    Model,
    /// Change points and goodness of fit.
    Detect,
    Decide,
    Urgency,
    /// Rendering and worker hand-off.
    Output,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Ingest,
        Stage::Model,
        Stage::Detect,
        Stage::Decide,
        Stage::Urgency,
        Stage::Output,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Model => "model",
            Stage::Detect => "detect",
            Stage::Decide => "decide",
            Stage::Urgency => "urgency",
            Stage::Output => "output",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dotted event names, used as the tracing target.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const INGEST_LOADED: &str = "ingest.loaded";
    pub const INGEST_MALFORMED: &str = "ingest.malformed";

    pub const MODEL_FITTED: &str = "model.fitted";
    pub const DETECT_CHANGE: &str = "detect.change_confirmed";

    pub const DECIDE_RECOMMENDED: &str = "decide.recommended";
    pub const URGENCY_APPLIED: &str = "urgency.applied";

    pub const WORKER_CANCELLED: &str = "worker.cancelled";
    pub const WORKER_SUPERSEDED: &str = "worker.superseded";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";
}

/// Correlation keys for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    pub run_id: String,
    /// First 12 hex chars of the snapshot digest.
    pub snapshot: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, digest: &str) -> Self {
        self.snapshot = Some(digest.chars().take(12).collect());
        self
    }

    /// Snapshot prefix, or `-` before any events were read.
    pub fn snapshot_or_dash(&self) -> &str {
        self.snapshot.as_deref().unwrap_or("-")
    }
}

/// One JSONL line as written by [`super::JsonlLayer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub ts: String,
    pub level: String,
    /// Tracing target; one of [`event_names`] for pipeline events.
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!(r#"{{"event":"{}","error":"unserializable"}}"#, self.event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in Stage::ALL {
            assert_eq!(
                serde_json::to_string(&stage).unwrap(),
                format!("\"{stage}\"")
            );
        }
    }

    #[test]
    fn test_context_shortens_digest() {
        let ctx = LogContext::new("run-abc");
        assert_eq!(ctx.snapshot_or_dash(), "-");
        let ctx = ctx.with_snapshot("0123456789abcdef0123456789abcdef");
        assert_eq!(ctx.snapshot_or_dash(), "0123456789ab");
    }

    #[test]
    fn test_record_omits_empty_parts() {
        let record = LogRecord {
            ts: "2024-01-01T00:00:00Z".into(),
            level: "info".into(),
            event: event_names::RUN_STARTED.into(),
            run_id: Some("run-1".into()),
            snapshot: None,
            stage: Some(Stage::Ingest.to_string()),
            message: None,
            fields: serde_json::Map::new(),
        };
        let line = record.to_jsonl();
        assert!(line.contains(r#""event":"run.started""#));
        assert!(line.contains(r#""stage":"ingest""#));
        assert!(!line.contains("snapshot"));
        assert!(!line.contains("fields"));
        let back: LogRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back, record);
    }
}
