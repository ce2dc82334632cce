//! Configuration loading for bw-core.
//!
//! This module handles:
//! - Resolution order (explicit `--config` > `--preset` > env > XDG > /etc > defaults)
//! - Parse and semantic validation via `bw-config`
//! - Provenance for `config show` and diagnostics

pub use bw_config::preset::{get_preset, list_presets, PresetError, PresetName};
pub use bw_config::validate::ValidationError;
pub use bw_config::{AnalysisConfig, ConfigPaths, ConfigSnapshot, ConfigSource};

use std::path::{Path, PathBuf};

use bw_config::resolve::resolve_config;
use bw_config::validate::validate_config;
use thiserror::Error;
use tracing::{debug, info};

use crate::logging::event_names;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid config {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error("Semantic validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl From<ConfigError> for bw_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Preset(PresetError::UnknownPreset(name)) => {
                bw_common::Error::UnknownPreset(name)
            }
            ConfigError::NotFound { .. } => bw_common::Error::Config(err.to_string()),
            other => bw_common::Error::InvalidConfig(other.to_string()),
        }
    }
}

/// Configuration resolution options.
#[derive(Debug, Default, Clone)]
pub struct ConfigOptions {
    /// Explicit config file; must exist.
    pub config_path: Option<PathBuf>,
    /// Preset name, used when no explicit file is given.
    pub preset: Option<String>,
}

/// Effective configuration with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: AnalysisConfig,
    pub paths: ConfigPaths,
    pub preset: Option<PresetName>,
}

impl ResolvedConfig {
    pub fn defaults() -> Self {
        Self {
            config: AnalysisConfig::default(),
            paths: ConfigPaths::default(),
            preset: None,
        }
    }

    /// Snapshot for `config show` and run diagnostics.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(
            &self.config,
            &self.paths,
            self.preset.as_ref().map(PresetName::as_str),
        )
    }
}

/// Load configuration with the standard resolution order.
///
/// An explicit `config_path` that does not exist is an error rather than a
/// silent fall-through to defaults. When both a file and a preset are given,
/// the file wins.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    if let Some(path) = &options.config_path {
        if !path.exists() {
            return Err(ConfigError::NotFound { path: path.clone() });
        }
        let config = load_file(path)?;
        info!(
            target: event_names::CONFIG_LOADED,
            path = %path.display(),
            source = "CLI argument",
            "loaded analysis config"
        );
        return Ok(ResolvedConfig {
            config,
            paths: ConfigPaths {
                analysis: Some(path.clone()),
                source: ConfigSource::CliArgument,
            },
            preset: None,
        });
    }

    if let Some(name) = &options.preset {
        let preset: PresetName = name.parse()?;
        let config = get_preset(preset);
        validate_config(&config)?;
        debug!(target: event_names::CONFIG_LOADED, preset = preset.as_str(), "using preset");
        return Ok(ResolvedConfig {
            config,
            paths: ConfigPaths::default(),
            preset: Some(preset),
        });
    }

    let paths = resolve_config(None);
    match &paths.analysis {
        Some(path) => {
            let config = load_file(path)?;
            info!(
                target: event_names::CONFIG_LOADED,
                path = %path.display(),
                source = %paths.source,
                "loaded analysis config"
            );
            Ok(ResolvedConfig {
                config,
                paths,
                preset: None,
            })
        }
        None => {
            debug!(target: event_names::CONFIG_DEFAULT_USED, "no config file found; using defaults");
            Ok(ResolvedConfig::defaults())
        }
    }
}

/// Parse and validate a config file.
pub fn load_file(path: &Path) -> Result<AnalysisConfig, ConfigError> {
    AnalysisConfig::load(path).map_err(|source| ConfigError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}
