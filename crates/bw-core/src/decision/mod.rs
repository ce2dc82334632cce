//! Decision layer: rule cascade and urgency adjustment.

pub mod recommendation;
pub mod urgency;

pub use recommendation::{decide, format_interval, DecisionInputs};
pub use urgency::{UrgencyScore, UrgencySignals};
