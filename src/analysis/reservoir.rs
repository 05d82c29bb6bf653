//! Synthetic reservoir fill estimate.
//!
//! There is no live reservoir telemetry for these dams, so the fill level
//! is estimated from a monsoon-driven seasonal baseline adjusted by live
//! rainfall, discharge and soil signals. The same inputs always produce
//! the same estimate.

use crate::ingest::round_to;
use crate::model::{Site, Trend};
use crate::snapshot::SourceReadings;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Typical fill (%) by calendar month, January first. Reservoirs fill with
/// the June to October monsoon and draw down through the dry season.
pub const SEASONAL_BASELINE: [f64; 12] = [38.0, 35.0, 33.0, 30.0, 28.0, 32.0, 45.0, 58.0, 70.0, 75.0, 65.0, 50.0];

pub const MIN_LEVEL_PCT: f64 = 10.0;
pub const MAX_LEVEL_PCT: f64 = 98.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservoirEstimate {
    /// Estimated fill, percent of capacity, 0.1 resolution.
    pub level_pct: f64,
    /// Direction of rainfall over the history window.
    pub trend: Trend,
    pub cumulative_precip_mm: f64,
}

/// The live signals the estimate is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservoirInputs<'a> {
    /// Calendar month, 0 = January.
    pub month0: u32,
    pub capacity: f64,
    /// Daily rainfall over the history window, oldest first.
    pub rainfall_series: &'a [f64],
    pub latest_discharge: f64,
    pub max_discharge: f64,
    pub avg_discharge: f64,
    pub surface_moisture: f64,
}

/// Estimate for `site` from its snapshot readings, using the month of `now`.
pub fn estimate_at(site: &Site, readings: &SourceReadings, now: DateTime<Utc>) -> ReservoirEstimate {
    estimate_from(&ReservoirInputs {
        month0: now.month0(),
        capacity: site.capacity,
        rainfall_series: readings.historical_series(),
        latest_discharge: readings.discharge_latest(),
        max_discharge: readings.discharge_max(),
        avg_discharge: readings.discharge_avg(),
        surface_moisture: readings.surface_moisture(),
    })
}

pub fn estimate(site: &Site, readings: &SourceReadings) -> ReservoirEstimate {
    estimate_at(site, readings, Utc::now())
}

pub fn estimate_from(inputs: &ReservoirInputs<'_>) -> ReservoirEstimate {
    let cumulative: f64 = inputs.rainfall_series.iter().sum();

    let seasonal = SEASONAL_BASELINE[(inputs.month0 % 12) as usize];
    let capacity_variation = (inputs.capacity / 100.0).min(1.0) * 15.0 - 7.0;
    let rain_adjust = (cumulative / 10.0).min(15.0);
    let discharge_adjust = (inputs.latest_discharge / inputs.max_discharge.max(1.0)).min(1.0) * 12.0;
    let soil_adjust = (inputs.surface_moisture / 0.4).min(1.0) * 8.0;
    let base_flow_adjust = (inputs.avg_discharge / 100.0).min(1.0) * 5.0;

    let raw = seasonal + capacity_variation + rain_adjust + discharge_adjust + soil_adjust + base_flow_adjust;
    // f64::max/min drop NaN, so a non-finite input still lands inside the range
    let level = raw.max(MIN_LEVEL_PCT).min(MAX_LEVEL_PCT);

    ReservoirEstimate {
        level_pct: round_to(level, 1),
        trend: rainfall_trend(inputs.rainfall_series),
        cumulative_precip_mm: round_to(cumulative, 1),
    }
}

/// Compare the last three days of the window against the first three.
/// Fewer than six days is always `Stable`.
pub fn rainfall_trend(series: &[f64]) -> Trend {
    if series.len() < 6 {
        return Trend::Stable;
    }
    let earlier: f64 = series[..3].iter().sum();
    let recent: f64 = series[series.len() - 3..].iter().sum();

    if recent > earlier * 1.3 {
        Trend::Increasing
    } else if recent < earlier * 0.7 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}
