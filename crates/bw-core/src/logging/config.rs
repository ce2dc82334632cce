//! Where log settings come from.
//!
//! Precedence, lowest first: built-in defaults, `RUST_LOG`, `BW_LOG`,
//! `BW_LOG_FORMAT`, then the CLI (`-v`/`-q`/`--log-format`).

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

/// Shape of the lines written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `tracing_subscriber::fmt` console lines.
    #[default]
    #[value(alias = "pretty")]
    Human,
    /// One JSON object per line, for the app's log shipper.
    #[value(alias = "json")]
    Jsonl,
}

/// Stdout carries the payload, so only warnings reach stderr by default.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::WARN;

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LevelFilter,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: DEFAULT_LEVEL,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Settings for a CLI run: environment first, then the flags.
    pub fn for_cli(verbose: u8, quiet: bool, format: Option<LogFormat>) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok()).with_flags(verbose, quiet, format)
    }

    /// Environment-only settings with an injectable lookup.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = LogConfig::default();

        if let Some(level) = env("RUST_LOG").as_deref().and_then(most_verbose_directive) {
            config.level = level;
        }
        if let Some(level) = env("BW_LOG").and_then(|v| v.trim().parse::<LevelFilter>().ok()) {
            config.level = level;
        }
        if let Some(format) = env("BW_LOG_FORMAT").and_then(|v| LogFormat::from_str(v.trim(), true).ok())
        {
            config.format = format;
        }
        if let Some(v) = env("BW_LOG_TIMESTAMPS") {
            config.timestamps = !matches!(v.trim(), "0" | "false" | "no");
        }
        config
    }

    /// Apply `-v` counts, `-q`, and `--log-format`.
    pub fn with_flags(mut self, verbose: u8, quiet: bool, format: Option<LogFormat>) -> Self {
        self.level = if quiet {
            LevelFilter::ERROR
        } else {
            raise(self.level, verbose)
        };
        if let Some(format) = format {
            self.format = format;
        }
        self
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}

/// One level more verbose per step, saturating at TRACE.
pub fn raise(level: LevelFilter, steps: u8) -> LevelFilter {
    const LADDER: [LevelFilter; 6] = [
        LevelFilter::OFF,
        LevelFilter::ERROR,
        LevelFilter::WARN,
        LevelFilter::INFO,
        LevelFilter::DEBUG,
        LevelFilter::TRACE,
    ];
    let at = LADDER.iter().position(|l| *l == level).unwrap_or(2);
    LADDER[(at + usize::from(steps)).min(LADDER.len() - 1)]
}

/// Most verbose level named by any `RUST_LOG` directive, e.g.
/// `warn,bw_core=debug` gives DEBUG.
fn most_verbose_directive(directives: &str) -> Option<LevelFilter> {
    directives
        .split(',')
        .filter_map(|d| d.rsplit('=').next())
        .filter_map(|l| l.trim().parse::<LevelFilter>().ok())
        .max()
}
