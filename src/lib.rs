//! Environmental hazard monitoring for dam sites.
//!
//! Pulls rainfall, soil moisture, river discharge, satellite precipitation
//! and seismic data for every registered site, and turns them into flood
//! and landslide scores, 24-hour projections and alerts.
//!
//! Pipeline, leaves first:
//! `ingest` -> `cache` -> `snapshot` -> `analysis` -> `alert`, with `batch`
//! running it across the registry and `engine` as the caller-facing entry.

pub mod alert;
pub mod analysis;
pub mod batch;
pub mod cache;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod sites;
pub mod snapshot;
pub mod verify;
