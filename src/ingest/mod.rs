//! Upstream source clients.
//!
//! One submodule per upstream API. Each exposes a pure URL builder, a pure
//! `parse_*_response(&str)` normalizer, and an async fetch on
//! [`SourceClients`]. Fetches make a single attempt bounded by a fixed
//! timeout and return `Result<_, SourceError>`; nothing panics or escapes.
//!
//! Submodules:
//! - `open_meteo`:  rainfall forecast, historical rainfall, soil moisture
//! - `glofas`:      river discharge
//! - `nasa_power`:  satellite precipitation
//! - `usgs_quakes`: seismic events

pub mod glofas;
pub mod nasa_power;
pub mod open_meteo;
pub mod usgs_quakes;

use crate::config::{Config, Endpoints, HttpConfig, SourceParams};
use crate::model::SourceError;
use std::time::Duration;

/// The six upstream clients sharing one HTTP connection pool.
#[derive(Clone)]
pub struct SourceClients {
    http: reqwest::Client,
    pub(crate) endpoints: Endpoints,
    pub(crate) params: SourceParams,
    timeouts: HttpConfig,
}

impl SourceClients {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hazmon_service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Request(e.to_string()))?;

        Ok(Self {
            http,
            endpoints: config.endpoints.clone(),
            params: config.sources.clone(),
            timeouts: config.http.clone(),
        })
    }

    /// GET `url` and return the body of a 2xx response.
    pub(crate) async fn get_body(&self, url: &str, timeout: Duration) -> Result<String, SourceError> {
        let secs = timeout.as_secs();
        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(e, secs))?;

        if !response.status().is_success() {
            return Err(SourceError::Http(response.status().as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::from_reqwest(e, secs))
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeouts.timeout()
    }

    pub(crate) fn satellite_timeout(&self) -> Duration {
        self.timeouts.satellite_timeout()
    }
}

// ---------------------------------------------------------------------------
// Shared numeric helpers
// ---------------------------------------------------------------------------

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Mean of the finite values in `values`, or `None` if there are none.
pub fn mean(values: &[f64]) -> Option<f64> {
    let valid: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if valid.is_empty() {
        None
    } else {
        Some(valid.iter().sum::<f64>() / valid.len() as f64)
    }
}

/// Great-circle distance between two points in km.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const R: f64 = 6371.0; // Earth radius in km

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    R * c
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))
}
