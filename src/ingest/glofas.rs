//! GloFAS river discharge via the Open-Meteo flood API.
//!
//! API Documentation: https://open-meteo.com/en/docs/flood-api
//!
//! Discharge is modelled on a ~5 km river grid. Points that are not on the
//! network come back with an all-null series, which is reported as
//! `SourceError::NoData` rather than as zero flow.

use super::{SourceClients, mean, parse_json, round_to};
use crate::model::SourceError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct FloodResponse {
    daily: Option<FloodDaily>,
}

#[derive(Debug, Deserialize)]
struct FloodDaily {
    #[serde(default)]
    time: Vec<String>,
    river_discharge: Option<Vec<Option<f64>>>,
}

/// Daily river discharge (m³/s) with summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiverDischarge {
    /// Dates of the retained (non-null) samples.
    pub dates: Vec<String>,
    pub daily_m3s: Vec<f64>,
    pub max: f64,
    pub avg: f64,
    /// Last sample of the series.
    pub latest: f64,
}

pub fn build_discharge_url(base: &str, latitude: f64, longitude: f64) -> String {
    format!(
        "{}?latitude={}&longitude={}&daily=river_discharge&forecast_days=7",
        base, latitude, longitude
    )
}

pub fn parse_discharge_response(body: &str) -> Result<RiverDischarge, SourceError> {
    let response: FloodResponse = parse_json(body)?;
    let daily = response.daily.ok_or(SourceError::MissingField("daily"))?;
    let series = daily
        .river_discharge
        .ok_or(SourceError::MissingField("daily.river_discharge"))?;

    let mut dates = Vec::with_capacity(series.len());
    let mut values = Vec::with_capacity(series.len());
    for (i, sample) in series.iter().enumerate() {
        if let Some(v) = sample.filter(|v| v.is_finite()) {
            dates.push(daily.time.get(i).cloned().unwrap_or_default());
            values.push(v);
        }
    }

    let (Some(&latest), Some(avg)) = (values.last(), mean(&values)) else {
        return Err(SourceError::NoData("river_discharge series is empty".to_string()));
    };
    let max = values.iter().copied().fold(f64::MIN, f64::max);

    Ok(RiverDischarge {
        dates,
        max: round_to(max, 2),
        avg: round_to(avg, 2),
        latest: round_to(latest, 2),
        daily_m3s: values,
    })
}

impl SourceClients {
    pub async fn fetch_discharge(&self, latitude: f64, longitude: f64) -> Result<RiverDischarge, SourceError> {
        let url = build_discharge_url(&self.endpoints.glofas, latitude, longitude);
        let body = self.get_body(&url, self.timeout()).await?;
        parse_discharge_response(&body)
    }
}
