//! Bridgewatch Core Library
//!
//! Adaptive refresh-interval engine for drawbridge-opening events:
//! - Event snapshots (validated, sorted, digested)
//! - Statistical analyzers (inter-arrival, seasonal, trend, change points, KS)
//! - Decision rules and urgency adjustment
//! - Caller-owned recommendation cache and background worker
//! - Configuration loading, logging, and output rendering for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod decision;
pub mod engine;
pub mod exit_codes;
pub mod insights;
pub mod logging;
pub mod output;
pub mod schema;
pub mod snapshot;
pub mod synthetic;
pub mod worker;

pub use cache::RecommendationCache;
pub use engine::{AnalysisReport, Cancelled, RefreshAnalyzer};
pub use snapshot::{EventSnapshot, MalformedCounts};
pub use worker::{AnalysisHandle, AnalysisWorker, WorkerError};
