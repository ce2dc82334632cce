//! Output format selection.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How a command renders its payload on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty JSON, the app-facing contract.
    #[default]
    Json,
    /// Markdown report.
    #[value(alias = "markdown")]
    Md,
    /// Single line, e.g. `poll every 15.0 min (poissonProcess, confidence 0.90)`.
    Summary,
}

impl OutputFormat {
    /// JSON output also means JSON errors on stderr.
    pub fn is_machine(self) -> bool {
        self == OutputFormat::Json
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Md => "md",
            OutputFormat::Summary => "summary",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
