//! Bridgewatch common types and errors.
//!
//! This crate provides foundational types shared across the workspace:
//! - Bridge-opening event records and their validation
//! - The refresh-interval recommendation model (stable output contract)
//! - Common error types
//! - Output format selection

pub mod error;
pub mod event;
pub mod model;
pub mod output;

pub use error::{Error, Result};
pub use event::{Event, EventRecord, MalformedEvent, MalformedEventReason};
pub use model::{
    AnalysisState, BridgeDataInsights, PatternStability, RecommendationMethod,
    RefreshIntervalRecommendation, SeasonalPattern, TrendDirection, DEFAULT_INTERVAL_SECONDS,
    MAX_INTERVAL_SECONDS, MIN_INTERVAL_SECONDS,
};
pub use output::OutputFormat;

/// Version of the recommendation output contract.
pub const SCHEMA_VERSION: &str = "1.0.0";
