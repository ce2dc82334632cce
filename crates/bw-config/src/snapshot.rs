//! Configuration snapshots for diagnostics and cache keys.
//!
//! A snapshot records which config an analysis ran with, so a recommendation
//! can be traced back to its tuning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analysis::AnalysisConfig;
use crate::resolve::{ConfigPaths, ConfigSource};

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    pub schema_version: String,

    /// Preset the config was derived from, if any.
    #[serde(default)]
    pub preset: Option<String>,

    /// Path the config was loaded from.
    #[serde(default)]
    pub config_path: Option<String>,

    pub config_source: String,

    /// SHA-256 of the effective config values.
    pub config_hash: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub strategy: String,
    pub minimum_samples: usize,
    pub min_interval_seconds: f64,
    pub max_interval_seconds: f64,
    pub default_interval_seconds: f64,
    pub utc_offset_minutes: i32,
    pub urgency_max_reduction: f64,
}

impl ConfigSnapshot {
    /// Create a snapshot of an effective config.
    pub fn new(config: &AnalysisConfig, paths: &ConfigPaths, preset: Option<&str>) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            preset: preset.map(str::to_string),
            config_path: paths.analysis.as_ref().map(|p| p.display().to_string()),
            config_source: paths.source.to_string(),
            config_hash: hash_config(config),
            summary: ConfigSummary::from_config(config),
        }
    }

    /// Snapshot of the built-in defaults.
    pub fn defaults_only() -> Self {
        Self::new(
            &AnalysisConfig::default(),
            &ConfigPaths {
                analysis: None,
                source: ConfigSource::BuiltinDefault,
            },
            None,
        )
    }

    /// Whether two snapshots describe identical effective values.
    pub fn same_config(&self, other: &ConfigSnapshot) -> bool {
        self.config_hash == other.config_hash
    }
}

impl ConfigSummary {
    fn from_config(config: &AnalysisConfig) -> Self {
        ConfigSummary {
            strategy: config.strategy.to_string(),
            minimum_samples: config.inter_arrival.minimum_samples,
            min_interval_seconds: config.intervals.min_seconds,
            max_interval_seconds: config.intervals.max_seconds,
            default_interval_seconds: config.intervals.default_seconds,
            utc_offset_minutes: config.seasonal.utc_offset_minutes,
            urgency_max_reduction: config.urgency.max_reduction,
        }
    }
}

/// SHA-256 hex digest of a string.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash of the effective config values.
///
/// The description is excluded so relabeling a config does not invalidate
/// cached recommendations.
pub fn hash_config(config: &AnalysisConfig) -> String {
    let mut canonical = config.clone();
    canonical.description = None;
    // Struct fields serialize in declaration order, so this is stable.
    match serde_json::to_string(&canonical) {
        Ok(json) => hash_content(&json),
        Err(_) => hash_content(&format!("{canonical:?}")),
    }
}
