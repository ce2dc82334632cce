//! Configuration presets for common polling budgets.
//!
//! - Balanced: the default tuning
//! - Battery saver: poll late, react to urgency gently
//! - Realtime: poll early, react to urgency strongly

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::analysis::{AnalysisConfig, PollingStrategy};

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetName {
    /// Moderate candidate, default urgency weights
    Balanced,
    /// Conservative candidate, damped urgency
    BatterySaver,
    /// Aggressive candidate, amplified urgency
    Realtime,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] = &[
        PresetName::Balanced,
        PresetName::BatterySaver,
        PresetName::Realtime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Balanced => "balanced",
            PresetName::BatterySaver => "battery_saver",
            PresetName::Realtime => "realtime",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "balanced" | "default" => Some(PresetName::Balanced),
            "battery_saver" | "battery" | "saver" | "low_power" => Some(PresetName::BatterySaver),
            "realtime" | "live" | "commute" => Some(PresetName::Realtime),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Balanced => "Median inter-arrival polling with default urgency weights",
            PresetName::BatterySaver => {
                "P75 polling, gentler peak shortening, urgency reduces intervals at most 25%"
            }
            PresetName::Realtime => {
                "P25 polling, sharper peak shortening, urgency reduces intervals up to 70%"
            }
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone, Error)]
pub enum PresetError {
    #[error("Unknown preset '{0}'. Available: {available}", available = available_names())]
    UnknownPreset(String),
}

fn available_names() -> String {
    PresetName::ALL
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Get the config for a preset.
pub fn get_preset(name: PresetName) -> AnalysisConfig {
    match name {
        PresetName::Balanced => balanced_preset(),
        PresetName::BatterySaver => battery_saver_preset(),
        PresetName::Realtime => realtime_preset(),
    }
}

/// List presets with their descriptions.
pub fn list_presets() -> Vec<(PresetName, &'static str)> {
    PresetName::ALL
        .iter()
        .map(|p| (*p, p.description()))
        .collect()
}

fn balanced_preset() -> AnalysisConfig {
    AnalysisConfig {
        description: Some("Balanced preset".to_string()),
        ..AnalysisConfig::default()
    }
}

fn battery_saver_preset() -> AnalysisConfig {
    let mut config = AnalysisConfig {
        description: Some("Battery saver preset: fewer polls".to_string()),
        strategy: PollingStrategy::Conservative,
        ..AnalysisConfig::default()
    };
    config.intervals.min_seconds = 600.0;
    config.seasonal.peak_interval_factor = 0.75;
    config.urgency.max_reduction = 0.25;
    config.urgency.peak_hour = 0.2;
    config.urgency.busy_weekday = 0.1;
    config
}

fn realtime_preset() -> AnalysisConfig {
    let mut config = AnalysisConfig {
        description: Some("Realtime preset: fresher data during commutes".to_string()),
        strategy: PollingStrategy::Aggressive,
        ..AnalysisConfig::default()
    };
    config.intervals.max_seconds = 21_600.0;
    config.seasonal.peak_interval_factor = 0.4;
    config.urgency.max_reduction = 0.7;
    config.urgency.per_open_bridge = 0.3;
    config.urgency.open_bridge_cap = 0.6;
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_config;

    #[test]
    fn test_all_presets_validate() {
        for name in PresetName::ALL {
            let config = get_preset(*name);
            validate_config(&config)
                .unwrap_or_else(|e| panic!("preset {name} failed validation: {e}"));
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(PresetName::parse("battery-saver"), Some(PresetName::BatterySaver));
        assert_eq!(PresetName::parse("LIVE"), Some(PresetName::Realtime));
        assert_eq!(PresetName::parse("default"), Some(PresetName::Balanced));
        assert_eq!(PresetName::parse("turbo"), None);
    }

    #[test]
    fn test_unknown_preset_lists_available() {
        let err = "turbo".parse::<PresetName>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("turbo"));
        assert!(msg.contains("balanced, battery_saver, realtime"));
    }

    #[test]
    fn test_presets_differ_in_strategy() {
        assert_eq!(get_preset(PresetName::Balanced).strategy, PollingStrategy::Moderate);
        assert_eq!(
            get_preset(PresetName::BatterySaver).strategy,
            PollingStrategy::Conservative
        );
        assert_eq!(get_preset(PresetName::Realtime).strategy, PollingStrategy::Aggressive);
    }

    #[test]
    fn test_serde_name_matches_as_str() {
        for name in PresetName::ALL {
            let json = serde_json::to_string(name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
    }
}
