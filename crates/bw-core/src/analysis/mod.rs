//! Statistical analyzers over an [`EventSnapshot`](crate::snapshot::EventSnapshot).
//!
//! Each analyzer owns its config section and produces a plain serializable
//! result; the decision layer reads those results and never recomputes them.

pub mod change_point;
pub mod goodness_of_fit;
pub mod inter_arrival;
pub mod seasonal;
pub mod thresholds;
pub mod trend;

pub use change_point::{ChangeDetection, ChangeDirection, ChangePoint, ChangePointDetector};
pub use goodness_of_fit::{GoodnessOfFit, GoodnessOfFitTester};
pub use inter_arrival::{InterArrivalAnalyzer, InterArrivalStats};
pub use seasonal::{GroupingStats, SeasonalAnalysis, SeasonalPatternAnalyzer};
pub use thresholds::Thresholds;
pub use trend::{TrendAnalysis, TrendAnalyzer};
