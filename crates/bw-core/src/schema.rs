//! JSON Schema generation for the input and output contracts.
//!
//! ```bash
//! bw-core schema --list
//! bw-core schema RefreshIntervalRecommendation
//! bw-core schema --all
//! ```

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

pub use bw_common::{
    AnalysisState, BridgeDataInsights, Event, EventRecord, PatternStability, RecommendationMethod,
    RefreshIntervalRecommendation, SeasonalPattern, TrendDirection,
};
pub use bw_config::AnalysisConfig;

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        ("EventRecord", "Bridge-opening event as accepted on input"),
        ("Event", "Validated bridge-opening event"),
        (
            "RefreshIntervalRecommendation",
            "Polling interval, confidence, method and reasoning",
        ),
        ("RecommendationMethod", "Rule that produced a recommendation"),
        ("AnalysisState", "Stability, seasonal patterns and trend"),
        ("PatternStability", "How steady the inter-arrival process is"),
        ("SeasonalPattern", "Periodicity found in the log"),
        ("TrendDirection", "Direction of the long-run event rate"),
        ("BridgeDataInsights", "Descriptive facts about the log"),
        ("AnalysisConfig", "Analysis configuration file"),
    ]
}

/// Schema for a type by name, or `None` if unknown.
pub fn generate_schema(type_name: &str) -> Option<Value> {
    let schema = match type_name {
        "EventRecord" => schema_for!(EventRecord),
        "Event" => schema_for!(Event),
        "RefreshIntervalRecommendation" => schema_for!(RefreshIntervalRecommendation),
        "RecommendationMethod" => schema_for!(RecommendationMethod),
        "AnalysisState" => schema_for!(AnalysisState),
        "PatternStability" => schema_for!(PatternStability),
        "SeasonalPattern" => schema_for!(SeasonalPattern),
        "TrendDirection" => schema_for!(TrendDirection),
        "BridgeDataInsights" => schema_for!(BridgeDataInsights),
        "AnalysisConfig" => schema_for!(AnalysisConfig),
        _ => return None,
    };
    serde_json::to_value(schema).ok()
}

/// All schemas keyed by type name.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    available_schemas()
        .into_iter()
        .filter_map(|(name, _)| generate_schema(name).map(|s| (name.to_string(), s)))
        .collect()
}
