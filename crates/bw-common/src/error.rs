//! Error types for Bridgewatch.
//!
//! The analysis path itself never fails: sparse or odd data is expressed as an
//! `insufficientData` recommendation or a low confidence. These errors cover
//! the edges around it (configuration, input parsing, I/O, background
//! execution). Each carries
//! a stable numeric code, a category and a remediation hint.
//!
//! ```text
//! ✗ Input Error
//!   Reason: events file is not a JSON array
//!   Fix: Export events as a JSON array of {id, bridge_id, open_time, ...}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::MalformedEvent;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse grouping; the CLI maps it to an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Config,
    /// Event input errors.
    Input,
    /// Analysis execution errors (cancellation, worker failures).
    Analysis,
    /// Filesystem and JSON encoding.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => f.write_str("config"),
            ErrorCategory::Input => f.write_str("input"),
            ErrorCategory::Analysis => f.write_str("analysis"),
            ErrorCategory::Io => f.write_str("io"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid analysis config: {0}")]
    InvalidConfig(String),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("invalid event input: {0}")]
    Input(String),

    #[error(transparent)]
    MalformedEvent(#[from] MalformedEvent),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("analysis superseded by a newer request")]
    Superseded,

    #[error("analysis worker failed: {0}")]
    Worker(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable numeric code: 1x config, 2x input, 3x analysis, 6x I/O.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::UnknownPreset(_) => 12,
            Error::Input(_) => 20,
            Error::MalformedEvent(_) => 21,
            Error::Cancelled => 30,
            Error::Superseded => 31,
            Error::Worker(_) => 32,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) | Error::UnknownPreset(_) => {
                ErrorCategory::Config
            }
            Error::Input(_) | Error::MalformedEvent(_) => ErrorCategory::Input,
            Error::Cancelled | Error::Superseded | Error::Worker(_) => ErrorCategory::Analysis,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether a retry, possibly with fixed input, can succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) | Error::UnknownPreset(_) => true,
            Error::Input(_) | Error::MalformedEvent(_) => true,
            // Cancellation was requested; nothing to recover.
            Error::Cancelled | Error::Superseded => false,
            Error::Worker(_) => true,
            Error::Io(_) | Error::Json(_) => true,
        }
    }

    /// What the user should do next.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) => {
                "Run 'bw-core config validate' to check the analysis config, or remove it to use defaults."
            }
            Error::UnknownPreset(_) => "List available presets with 'bw-core config presets'.",
            Error::Input(_) => {
                "Export events as a JSON array of {id, bridge_id, open_time, close_time, duration_minutes}."
            }
            Error::MalformedEvent(_) => {
                "Malformed events are skipped during analysis; fix the source record to include it."
            }
            Error::Cancelled | Error::Superseded => {
                "No action needed; a newer analysis request replaced this one."
            }
            Error::Worker(_) => "Retry the analysis. If persistent, run it in the foreground with -vv.",
            Error::Io(_) => "Check that the file exists and is readable, then retry.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
        }
    }

    /// Title line of [`Error::format_human`].
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig(_) => "Invalid Analysis Configuration",
            Error::UnknownPreset(_) => "Unknown Preset",
            Error::Input(_) => "Input Error",
            Error::MalformedEvent(_) => "Malformed Event",
            Error::Cancelled => "Analysis Cancelled",
            Error::Superseded => "Analysis Superseded",
            Error::Worker(_) => "Analysis Worker Failure",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }

    /// Format the error for a terminal.
    pub fn format_human(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline(),
            self,
            self.remediation()
        )
    }

    /// Structured form for machine consumers.
    pub fn to_structured(&self) -> StructuredError {
        StructuredError {
            code: self.code(),
            category: self.category(),
            message: self.to_string(),
            recoverable: self.is_recoverable(),
            remediation: self.remediation().to_string(),
        }
    }
}

/// Serializable view of an [`Error`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub recoverable: bool,
    pub remediation: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MalformedEventReason;

    #[test]
    fn test_codes_match_categories() {
        let cases: Vec<(Error, ErrorCategory)> = vec![
            (Error::Config("x".into()), ErrorCategory::Config),
            (Error::UnknownPreset("x".into()), ErrorCategory::Config),
            (Error::Input("x".into()), ErrorCategory::Input),
            (Error::Cancelled, ErrorCategory::Analysis),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                ErrorCategory::Io,
            ),
        ];
        for (err, category) in cases {
            assert_eq!(err.category(), category);
            let range = match category {
                ErrorCategory::Config => 10..20,
                ErrorCategory::Input => 20..30,
                ErrorCategory::Analysis => 30..40,
                ErrorCategory::Io => 60..70,
            };
            assert!(range.contains(&err.code()), "{err}: {}", err.code());
        }
    }

    #[test]
    fn test_malformed_event_converts() {
        let err: Error = MalformedEvent {
            id: "e9".into(),
            reason: MalformedEventReason::MissingOpenTime,
        }
        .into();
        assert_eq!(err.code(), 21);
        assert!(err.to_string().contains("e9"));
    }

    #[test]
    fn test_format_human() {
        let err = Error::Input("not an array".into());
        let text = err.format_human();
        assert!(text.starts_with("✗ Input Error"));
        assert!(text.contains("Reason: invalid event input: not an array"));
        assert!(text.contains("Fix: "));
    }

    #[test]
    fn test_structured_serializes() {
        let err = Error::Superseded;
        let json = serde_json::to_value(err.to_structured()).unwrap();
        assert_eq!(json["code"], 31);
        assert_eq!(json["category"], "analysis");
        assert_eq!(json["recoverable"], false);
    }
}
