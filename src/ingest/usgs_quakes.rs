//! USGS FDSN earthquake catalogue search.
//!
//! API Documentation: https://earthquake.usgs.gov/fdsnws/event/1/
//!
//! Radius search around the site over the lookback window. Event times are
//! epoch milliseconds; coordinates are `[lon, lat, depth_km]`.

use super::{SourceClients, haversine_km, parse_json, round_to};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::SourceError;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: String,
    properties: FeatureProperties,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    mag: Option<f64>,
    #[serde(default)]
    place: Option<String>,
    time: i64,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

/// One catalogued event, with its distance from the queried site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Earthquake {
    pub id: String,
    pub magnitude: f64,
    pub depth_km: f64,
    pub place: String,
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Great-circle distance from the site, 0.1 km resolution.
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicActivity {
    /// Newest first.
    pub events: Vec<Earthquake>,
    pub count: usize,
    /// 0.0 when there are no events.
    pub max_magnitude: f64,
}

pub fn build_seismic_url(
    base: &str,
    latitude: f64,
    longitude: f64,
    start: NaiveDate,
    end: NaiveDate,
    radius_km: f64,
    min_magnitude: f64,
) -> String {
    format!(
        "{}?format=geojson&starttime={}&endtime={}&latitude={}&longitude={}\
         &maxradiuskm={}&minmagnitude={}&orderby=time",
        base,
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
        latitude,
        longitude,
        radius_km,
        min_magnitude
    )
}

fn parse_feature(raw: serde_json::Value, latitude: f64, longitude: f64) -> Result<Earthquake, SourceError> {
    let feature: Feature = serde_json::from_value(raw).map_err(|e| SourceError::Parse(e.to_string()))?;
    let coords = &feature.geometry.coordinates;
    if coords.len() < 2 {
        return Err(SourceError::MissingField("geometry.coordinates"));
    }
    let (ev_lon, ev_lat) = (coords[0], coords[1]);
    let depth_km = coords.get(2).copied().unwrap_or(0.0);
    let time = DateTime::<Utc>::from_timestamp_millis(feature.properties.time)
        .ok_or_else(|| SourceError::Parse(format!("invalid event time {}", feature.properties.time)))?;

    Ok(Earthquake {
        id: feature.id,
        magnitude: feature.properties.mag.unwrap_or(0.0),
        depth_km,
        place: feature.properties.place.unwrap_or_default(),
        time,
        latitude: ev_lat,
        longitude: ev_lon,
        distance_km: round_to(haversine_km(latitude, longitude, ev_lat, ev_lon), 1),
    })
}

/// Normalize a GeoJSON response for a search centred on (`latitude`, `longitude`).
pub fn parse_seismic_response(body: &str, latitude: f64, longitude: f64) -> Result<SeismicActivity, SourceError> {
    let collection: FeatureCollection = parse_json(body)?;
    let features = collection.features.ok_or(SourceError::MissingField("features"))?;

    // A malformed feature is skipped; the rest of the catalogue still counts
    let mut events: Vec<Earthquake> = features
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| match parse_feature(raw, latitude, longitude) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(source = "USGS", index, "skipping malformed feature: {}", e);
                None
            }
        })
        .collect();
    events.sort_by(|a, b| b.time.cmp(&a.time));

    let max_magnitude = events.iter().map(|e| e.magnitude).fold(0.0, f64::max);

    Ok(SeismicActivity {
        count: events.len(),
        max_magnitude,
        events,
    })
}

impl SourceClients {
    pub async fn fetch_seismic(&self, latitude: f64, longitude: f64) -> Result<SeismicActivity, SourceError> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(self.params.seismic_lookback_days as i64);
        let url = build_seismic_url(
            &self.endpoints.usgs,
            latitude,
            longitude,
            start,
            end,
            self.params.seismic_radius_km,
            self.params.seismic_min_magnitude,
        );
        let body = self.get_body(&url, self.timeout()).await?;
        parse_seismic_response(&body, latitude, longitude)
    }
}
