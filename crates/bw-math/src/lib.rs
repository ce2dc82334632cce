//! Bridgewatch math utilities.

pub mod math;

pub use math::descriptive::*;
pub use math::exponential;
pub use math::ks;
pub use math::quantile::*;
pub use math::regression::{ols, LinearFit};
