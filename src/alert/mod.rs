//! Alerting.
//!
//! Submodules:
//! - `thresholds`: score-to-level cutoffs and informational floors
//! - `generator`: per-site alert records

pub mod generator;
pub mod thresholds;
