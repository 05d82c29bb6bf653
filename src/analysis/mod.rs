//! Pure scoring stages applied to a snapshot.
//!
//! Nothing in here performs I/O or reads the clock except where a function
//! name ends in a wall-clock wrapper; the `_at` variants take `now`.
//!
//! Submodules:
//! - `reservoir`: synthetic reservoir fill estimate and rainfall trend
//! - `risk`: flood and landslide scoring
//! - `regions`: landslide susceptibility by state
//! - `prediction`: 24-hour score extrapolation

pub mod prediction;
pub mod regions;
pub mod reservoir;
pub mod risk;
