//! NASA POWER satellite-derived precipitation (PRECTOTCORR, mm/day).
//!
//! API Documentation: https://power.larc.nasa.gov/docs/services/api/temporal/daily/
//!
//! POWER lags real time by a couple of days, so the window ends two days
//! before today. Days the product has not filled yet carry the fill value
//! -999.

use super::{SourceClients, parse_json, round_to};
use crate::model::SourceError;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// POWER's missing-value sentinel.
const FILL_VALUE: f64 = -999.0;

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: Option<PowerProperties>,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: Option<PowerParameters>,
}

#[derive(Debug, Deserialize)]
struct PowerParameters {
    #[serde(rename = "PRECTOTCORR", default)]
    prectotcorr: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPrecipitation {
    /// ISO date (YYYY-MM-DD).
    pub date: String,
    pub precipitation_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatellitePrecipitation {
    /// Oldest first.
    pub daily: Vec<DailyPrecipitation>,
    pub total_mm: f64,
    pub avg_mm: f64,
    pub days: usize,
}

/// `(start, end)` of a `days`-long window lagging two days behind `today`.
pub fn satellite_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let end = today - Duration::days(2);
    let start = today - Duration::days(days as i64 + 2);
    (start, end)
}

pub fn build_satellite_url(base: &str, latitude: f64, longitude: f64, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}?parameters=PRECTOTCORR&start={}&end={}&latitude={}&longitude={}&community=RE&format=JSON",
        base,
        start.format("%Y%m%d"),
        end.format("%Y%m%d"),
        latitude,
        longitude
    )
}

/// `20240701` -> `2024-07-01`. Keys that are not eight ASCII digits are
/// passed through unchanged.
fn iso_date(key: &str) -> String {
    if key.len() == 8 && key.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &key[0..4], &key[4..6], &key[6..8])
    } else {
        key.to_string()
    }
}

pub fn parse_satellite_response(body: &str) -> Result<SatellitePrecipitation, SourceError> {
    let response: PowerResponse = parse_json(body)?;
    let series = response
        .properties
        .and_then(|p| p.parameter)
        .map(|p| p.prectotcorr)
        .unwrap_or_default();

    // BTreeMap iteration keeps YYYYMMDD keys in date order
    let daily: Vec<DailyPrecipitation> = series
        .iter()
        .filter_map(|(key, value)| {
            let value = value.unwrap_or(FILL_VALUE);
            let value = if value == FILL_VALUE { 0.0 } else { value };
            (value >= 0.0).then(|| DailyPrecipitation {
                date: iso_date(key),
                precipitation_mm: value,
            })
        })
        .collect();

    let total: f64 = daily.iter().map(|d| d.precipitation_mm).sum();
    let avg = if daily.is_empty() { 0.0 } else { total / daily.len() as f64 };

    Ok(SatellitePrecipitation {
        days: daily.len(),
        total_mm: round_to(total, 2),
        avg_mm: round_to(avg, 2),
        daily,
    })
}

impl SourceClients {
    pub async fn fetch_satellite(&self, latitude: f64, longitude: f64) -> Result<SatellitePrecipitation, SourceError> {
        let (start, end) = satellite_window(Utc::now().date_naive(), self.params.satellite_days);
        let url = build_satellite_url(&self.endpoints.nasa_power, latitude, longitude, start, end);
        let body = self.get_body(&url, self.satellite_timeout()).await?;
        parse_satellite_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_lags_two_days() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 20).unwrap();
        let (start, end) = satellite_window(today, 14);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 7, 4).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 7, 18).unwrap());

        let url = build_satellite_url("https://power.example/point", 9.84, 76.97, start, end);
        assert!(url.contains("parameters=PRECTOTCORR&start=20240704&end=20240718"));
        assert!(url.ends_with("community=RE&format=JSON"));
    }

    #[test]
    fn test_parse_satellite_replaces_fill_value_and_sorts() {
        let body = r#"{
            "type": "Feature",
            "properties": {"parameter": {"PRECTOTCORR": {
                "20240703": 12.5,
                "20240701": 4.25,
                "20240702": -999,
                "20240704": 0.0
            }}}
        }"#;
        let sat = parse_satellite_response(body).expect("valid POWER payload");
        assert_eq!(sat.days, 4);
        assert_eq!(sat.daily[0].date, "2024-07-01");
        assert_eq!(sat.daily[1].precipitation_mm, 0.0);
        assert_eq!(sat.total_mm, 16.75);
        assert_eq!(sat.avg_mm, 4.19);
    }

    #[test]
    fn test_negative_values_other_than_fill_are_dropped() {
        let body = r#"{"properties": {"parameter": {"PRECTOTCORR": {
            "20240701": -1.5,
            "20240702": 3.0
        }}}}"#;
        let sat = parse_satellite_response(body).unwrap();
        assert_eq!(sat.days, 1);
        assert_eq!(sat.total_mm, 3.0);
    }

    #[test]
    fn test_empty_parameter_map_is_zero_summary() {
        let sat = parse_satellite_response(r#"{"properties": {}}"#).unwrap();
        assert_eq!(sat.days, 0);
        assert_eq!(sat.total_mm, 0.0);
        assert_eq!(sat.avg_mm, 0.0);
    }

    #[test]
    fn test_power_error_page_is_parse_error() {
        assert!(matches!(
            parse_satellite_response("Service Unavailable"),
            Err(SourceError::Parse(_))
        ));
    }
}
