//! Open-Meteo clients: rainfall forecast, recent rainfall history, and
//! land-surface-model soil moisture.
//!
//! API Documentation: https://open-meteo.com/en/docs
//!
//! All three share the `/forecast` endpoint; history is requested with an
//! explicit `start_date`/`end_date` window ending yesterday.

use super::{SourceClients, mean, parse_json, round_to};
use crate::model::SourceError;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Open-Meteo Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    #[serde(default)]
    time: Vec<String>,
    precipitation_sum: Option<Vec<Option<f64>>>,
    #[serde(default)]
    precipitation_probability_max: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct SoilResponse {
    hourly: Option<SoilHourly>,
}

#[derive(Debug, Deserialize)]
struct SoilHourly {
    #[serde(default, deserialize_with = "null_band")]
    soil_moisture_0_to_1cm: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_band")]
    soil_moisture_1_to_3cm: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_band")]
    soil_moisture_3_to_9cm: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_band")]
    soil_moisture_9_to_27cm: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_band")]
    soil_moisture_27_to_81cm: Vec<Option<f64>>,
}

/// A band sent as `null` reads as an empty series.
fn null_band<'de, D>(deserializer: D) -> Result<Vec<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Option<f64>>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Normalized payloads
// ============================================================================

/// Daily precipitation forecast for the coming week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRainfall {
    pub dates: Vec<String>,
    /// mm/day, nulls replaced by 0.
    pub daily_precipitation_mm: Vec<f64>,
    /// Wettest forecast day, mm.
    pub max_daily_mm: f64,
    /// Highest daily precipitation probability, percent.
    pub max_probability_pct: Option<f64>,
}

/// Observed daily precipitation over the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRainfall {
    pub start_date: String,
    pub end_date: String,
    pub dates: Vec<String>,
    /// mm/day, oldest first, nulls replaced by 0.
    pub daily_precipitation_mm: Vec<f64>,
    pub total_mm: f64,
}

/// Volumetric soil moisture (m³/m³) per depth band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilLayers {
    /// 0–3 cm
    pub surface: f64,
    /// 3–27 cm
    pub mid: f64,
    /// 27–81 cm
    pub deep: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilMoisture {
    /// Latest valid sample per band.
    pub current: SoilLayers,
    /// Mean of the most recent 24 valid hourly samples per band.
    pub avg_24h: SoilLayers,
}

// ============================================================================
// URL construction
// ============================================================================

pub fn build_forecast_url(base: &str, latitude: f64, longitude: f64, timezone: &str) -> String {
    format!(
        "{}/forecast?latitude={}&longitude={}\
         &daily=precipitation_sum,rain_sum,precipitation_probability_max,temperature_2m_max,temperature_2m_min,windspeed_10m_max\
         &hourly=precipitation,precipitation_probability,relative_humidity_2m\
         &forecast_days=7&timezone={}",
        base, latitude, longitude, timezone
    )
}

/// History window: `days` full days ending yesterday.
pub fn history_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let end = today - Duration::days(1);
    let start = today - Duration::days(days as i64);
    (start, end)
}

pub fn build_historical_url(
    base: &str,
    latitude: f64,
    longitude: f64,
    start: NaiveDate,
    end: NaiveDate,
    timezone: &str,
) -> String {
    format!(
        "{}/forecast?latitude={}&longitude={}&daily=precipitation_sum,rain_sum\
         &start_date={}&end_date={}&timezone={}",
        base,
        latitude,
        longitude,
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
        timezone
    )
}

pub fn build_soil_url(base: &str, latitude: f64, longitude: f64, timezone: &str) -> String {
    format!(
        "{}/forecast?latitude={}&longitude={}\
         &hourly=soil_moisture_0_to_1cm,soil_moisture_1_to_3cm,soil_moisture_3_to_9cm,soil_moisture_9_to_27cm,soil_moisture_27_to_81cm\
         &past_days=2&forecast_days=1&timezone={}",
        base, latitude, longitude, timezone
    )
}

// ============================================================================
// Parsing
// ============================================================================

fn zero_filled(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(0.0)).collect()
}

pub fn parse_forecast_response(body: &str) -> Result<ForecastRainfall, SourceError> {
    let response: DailyResponse = parse_json(body)?;
    let daily = response.daily.ok_or(SourceError::MissingField("daily"))?;
    let precipitation = daily
        .precipitation_sum
        .ok_or(SourceError::MissingField("daily.precipitation_sum"))?;

    let daily_precipitation_mm = zero_filled(&precipitation);
    let max_daily_mm = daily_precipitation_mm.iter().copied().fold(0.0, f64::max);
    let max_probability_pct = daily
        .precipitation_probability_max
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .reduce(f64::max);

    Ok(ForecastRainfall {
        dates: daily.time,
        daily_precipitation_mm,
        max_daily_mm,
        max_probability_pct,
    })
}

pub fn parse_historical_response(
    body: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HistoricalRainfall, SourceError> {
    let response: DailyResponse = parse_json(body)?;
    let daily = response.daily.ok_or(SourceError::MissingField("daily"))?;
    let precipitation = daily
        .precipitation_sum
        .ok_or(SourceError::MissingField("daily.precipitation_sum"))?;

    let daily_precipitation_mm = zero_filled(&precipitation);
    let total_mm = daily_precipitation_mm.iter().sum();

    Ok(HistoricalRainfall {
        start_date: start.format("%Y-%m-%d").to_string(),
        end_date: end.format("%Y-%m-%d").to_string(),
        dates: daily.time,
        daily_precipitation_mm,
        total_mm,
    })
}

/// Last non-null, finite sample in an hourly series. Forecast hours at the
/// tail of the series are usually null.
fn latest_valid(series: &[Option<f64>]) -> Option<f64> {
    series.iter().rev().flatten().copied().find(|v| v.is_finite())
}

fn recent_valid_mean(series: &[Option<f64>], samples: usize) -> Option<f64> {
    let recent: Vec<f64> = series
        .iter()
        .rev()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .take(samples)
        .collect();
    mean(&recent)
}

/// Combine two bands. A band with no valid sample is absent, not zero; a
/// genuine 0.0 reading still takes part in the mean.
fn combine_bands(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

pub fn parse_soil_response(body: &str) -> Result<SoilMoisture, SourceError> {
    let response: SoilResponse = parse_json(body)?;
    let h = response.hourly.ok_or(SourceError::MissingField("hourly"))?;

    let bands: [&[Option<f64>]; 5] = [
        &h.soil_moisture_0_to_1cm,
        &h.soil_moisture_1_to_3cm,
        &h.soil_moisture_3_to_9cm,
        &h.soil_moisture_9_to_27cm,
        &h.soil_moisture_27_to_81cm,
    ];
    if bands.iter().all(|band| latest_valid(band).is_none()) {
        return Err(SourceError::NoData(
            "no valid soil moisture samples in any depth band".to_string(),
        ));
    }

    Ok(SoilMoisture {
        current: layers_from(&bands, latest_valid),
        avg_24h: layers_from(&bands, recent_24h_mean),
    })
}

fn recent_24h_mean(series: &[Option<f64>]) -> Option<f64> {
    recent_valid_mean(series, 24)
}

fn layers_from(bands: &[&[Option<f64>]; 5], pick: fn(&[Option<f64>]) -> Option<f64>) -> SoilLayers {
    SoilLayers {
        surface: round_to(combine_bands(pick(bands[0]), pick(bands[1])).unwrap_or(0.0), 4),
        mid: round_to(combine_bands(pick(bands[2]), pick(bands[3])).unwrap_or(0.0), 4),
        deep: round_to(pick(bands[4]).unwrap_or(0.0), 4),
    }
}

// ============================================================================
// Fetchers
// ============================================================================

impl SourceClients {
    pub async fn fetch_forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastRainfall, SourceError> {
        let url = build_forecast_url(&self.endpoints.open_meteo, latitude, longitude, &self.params.timezone);
        let body = self.get_body(&url, self.timeout()).await?;
        parse_forecast_response(&body)
    }

    pub async fn fetch_historical(&self, latitude: f64, longitude: f64) -> Result<HistoricalRainfall, SourceError> {
        let (start, end) = history_window(Utc::now().date_naive(), self.params.historical_days);
        let url = build_historical_url(
            &self.endpoints.open_meteo,
            latitude,
            longitude,
            start,
            end,
            &self.params.timezone,
        );
        let body = self.get_body(&url, self.timeout()).await?;
        parse_historical_response(&body, start, end)
    }

    pub async fn fetch_soil(&self, latitude: f64, longitude: f64) -> Result<SoilMoisture, SourceError> {
        let url = build_soil_url(&self.endpoints.open_meteo, latitude, longitude, &self.params.timezone);
        let body = self.get_body(&url, self.timeout()).await?;
        parse_soil_response(&body)
    }
}

// ============================================================================
// Tests
// ============================================================================
