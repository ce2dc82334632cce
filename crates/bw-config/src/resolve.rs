//! Where `analysis.json` is looked up.
//!
//! First existing file wins: `--config`, `BRIDGEWATCH_CONFIG`,
//! `BRIDGEWATCH_CONFIG_DIR/analysis.json`, `$XDG_CONFIG_HOME/bridgewatch/`,
//! `/etc/bridgewatch/`. Nothing found means built-in defaults.

use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "BRIDGEWATCH_CONFIG";
pub const ENV_CONFIG_DIR: &str = "BRIDGEWATCH_CONFIG_DIR";
pub const ANALYSIS_FILENAME: &str = "analysis.json";

const APP_DIR: &str = "bridgewatch";

/// Result of a lookup.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// `None` when no candidate existed.
    pub analysis: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Which candidate supplied the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    CliArgument,
    /// `BRIDGEWATCH_CONFIG` or `BRIDGEWATCH_CONFIG_DIR`.
    Environment,
    XdgConfig,
    SystemConfig,
    #[default]
    BuiltinDefault,
}

impl ConfigSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigSource::CliArgument => "CLI argument",
            ConfigSource::Environment => "environment variable",
            ConfigSource::XdgConfig => "XDG config",
            ConfigSource::SystemConfig => "system config",
            ConfigSource::BuiltinDefault => "builtin default",
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look up the config file against the real environment and directories.
pub fn resolve_config(cli_path: Option<&Path>) -> ConfigPaths {
    resolve_with(
        cli_path,
        |key| std::env::var(key).ok(),
        xdg_config_dir(),
        system_config_dir(),
    )
}

/// Same lookup with the environment and directories injected.
pub fn resolve_with(
    cli_path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
    xdg_dir: Option<PathBuf>,
    system_dir: PathBuf,
) -> ConfigPaths {
    let candidates = [
        (cli_path.map(Path::to_path_buf), ConfigSource::CliArgument),
        (env(ENV_CONFIG_PATH).map(PathBuf::from), ConfigSource::Environment),
        (
            env(ENV_CONFIG_DIR).map(|dir| PathBuf::from(dir).join(ANALYSIS_FILENAME)),
            ConfigSource::Environment,
        ),
        (xdg_dir.map(|dir| dir.join(ANALYSIS_FILENAME)), ConfigSource::XdgConfig),
        (Some(system_dir.join(ANALYSIS_FILENAME)), ConfigSource::SystemConfig),
    ];

    candidates
        .into_iter()
        .find_map(|(path, source)| {
            path.filter(|p| p.is_file()).map(|p| ConfigPaths {
                analysis: Some(p),
                source,
            })
        })
        .unwrap_or_default()
}

/// `~/.config/bridgewatch` on Linux, per `dirs`.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}

pub fn system_config_dir() -> PathBuf {
    Path::new("/etc").join(APP_DIR)
}
