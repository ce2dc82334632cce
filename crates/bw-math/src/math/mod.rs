//! Core math modules.

pub mod descriptive;
pub mod exponential;
pub mod ks;
pub mod quantile;
pub mod regression;
