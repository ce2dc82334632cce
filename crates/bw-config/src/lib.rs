//! Bridgewatch analysis configuration loading and validation.
//!
//! This crate provides:
//! - The typed [`AnalysisConfig`] (every tunable constant of the engine)
//! - Built-in presets for common polling budgets
//! - Config resolution (CLI → env → XDG → /etc → defaults)
//! - Semantic validation
//! - Config snapshots and fingerprints for caching and diagnostics

pub mod analysis;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use analysis::{
    AnalysisConfig, ChangePointConfig, ConfidenceConfig, GoodnessOfFitConfig, InterArrivalConfig,
    IntervalBounds, PollingStrategy, SeasonalConfig, TrendConfig, UrgencyConfig,
};
pub use preset::{get_preset, PresetName};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

