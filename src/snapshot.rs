//! Per-site environmental snapshot and the aggregator that builds it.
//!
//! A snapshot is assembled fresh for every scoring cycle and never stored.
//! Each of the six source fields is independently `Ok` or carries the
//! `SourceError` that degraded it; the accessors below collapse a degraded
//! field to its neutral value (zero) so scoring never inspects errors.

use crate::analysis::reservoir::{self, ReservoirEstimate};
use crate::cache::TtlCache;
use crate::config::Config;
use crate::ingest::SourceClients;
use crate::ingest::glofas::RiverDischarge;
use crate::ingest::nasa_power::SatellitePrecipitation;
use crate::ingest::open_meteo::{ForecastRainfall, HistoricalRainfall, SoilMoisture};
use crate::ingest::usgs_quakes::SeismicActivity;
use crate::logging::{DataSource, log_source_failure};
use crate::model::{Site, SourceError};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;

pub type SourceField<T> = Result<T, SourceError>;

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// The six upstream readings for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReadings {
    pub forecast: SourceField<ForecastRainfall>,
    pub historical: SourceField<HistoricalRainfall>,
    pub soil: SourceField<SoilMoisture>,
    pub discharge: SourceField<RiverDischarge>,
    pub satellite: SourceField<SatellitePrecipitation>,
    pub seismic: SourceField<SeismicActivity>,
}

impl SourceReadings {
    /// Every field degraded with the same error. Mostly useful in tests.
    pub fn all_failed(err: SourceError) -> Self {
        Self {
            forecast: Err(err.clone()),
            historical: Err(err.clone()),
            soil: Err(err.clone()),
            discharge: Err(err.clone()),
            satellite: Err(err.clone()),
            seismic: Err(err),
        }
    }

    pub fn forecast_max_mm(&self) -> f64 {
        self.forecast.as_ref().map_or(0.0, |f| f.max_daily_mm)
    }

    pub fn historical_total_mm(&self) -> f64 {
        self.historical.as_ref().map_or(0.0, |h| h.total_mm)
    }

    /// Daily history, oldest first. Empty when the source failed.
    pub fn historical_series(&self) -> &[f64] {
        self.historical
            .as_ref()
            .map_or(&[][..], |h| h.daily_precipitation_mm.as_slice())
    }

    pub fn surface_moisture(&self) -> f64 {
        self.soil.as_ref().map_or(0.0, |s| s.current.surface)
    }

    pub fn deep_moisture(&self) -> f64 {
        self.soil.as_ref().map_or(0.0, |s| s.current.deep)
    }

    pub fn discharge_latest(&self) -> f64 {
        self.discharge.as_ref().map_or(0.0, |d| d.latest)
    }

    pub fn discharge_max(&self) -> f64 {
        self.discharge.as_ref().map_or(0.0, |d| d.max)
    }

    pub fn discharge_avg(&self) -> f64 {
        self.discharge.as_ref().map_or(0.0, |d| d.avg)
    }

    pub fn satellite_avg_mm(&self) -> f64 {
        self.satellite.as_ref().map_or(0.0, |s| s.avg_mm)
    }

    pub fn quake_count(&self) -> usize {
        self.seismic.as_ref().map_or(0, |s| s.count)
    }

    pub fn max_magnitude(&self) -> f64 {
        self.seismic.as_ref().map_or(0.0, |s| s.max_magnitude)
    }

    /// The error that degraded `source`, if it did.
    pub fn error_for(&self, source: DataSource) -> Option<&SourceError> {
        match source {
            DataSource::Forecast => self.forecast.as_ref().err(),
            DataSource::Historical => self.historical.as_ref().err(),
            DataSource::Soil => self.soil.as_ref().err(),
            DataSource::Discharge => self.discharge.as_ref().err(),
            DataSource::Satellite => self.satellite.as_ref().err(),
            DataSource::Seismic => self.seismic.as_ref().err(),
            DataSource::Batch | DataSource::System => None,
        }
    }

    pub fn is_available(&self, source: DataSource) -> bool {
        DataSource::UPSTREAM.contains(&source) && self.error_for(source).is_none()
    }

    pub fn available_sources(&self) -> Vec<DataSource> {
        DataSource::UPSTREAM
            .into_iter()
            .filter(|s| self.is_available(*s))
            .collect()
    }

    pub fn failed_sources(&self) -> Vec<(DataSource, &SourceError)> {
        DataSource::UPSTREAM
            .into_iter()
            .filter_map(|s| self.error_for(s).map(|e| (s, e)))
            .collect()
    }
}

/// Everything known about one site at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentalSnapshot {
    pub site: Site,
    pub readings: SourceReadings,
    /// Always present; falls back to the seasonal baseline when the
    /// contributing sources failed.
    pub reservoir: ReservoirEstimate,
    pub fetched_at: DateTime<Utc>,
}

impl EnvironmentalSnapshot {
    /// Assemble a snapshot from readings already in hand, estimating the
    /// reservoir level as of `now`.
    pub fn from_readings_at(site: &Site, readings: SourceReadings, now: DateTime<Utc>) -> Self {
        let reservoir = reservoir::estimate_at(site, &readings, now);
        Self {
            site: site.clone(),
            readings,
            reservoir,
            fetched_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared source cache
// ---------------------------------------------------------------------------

/// One TTL cache per upstream source, all with the same TTL.
///
/// Built once at startup and shared by reference between the aggregator,
/// every batch run, and every cycle of the daemon loop.
pub struct SourceCache {
    pub forecast: TtlCache<ForecastRainfall>,
    pub historical: TtlCache<HistoricalRainfall>,
    pub soil: TtlCache<SoilMoisture>,
    pub discharge: TtlCache<RiverDischarge>,
    pub satellite: TtlCache<SatellitePrecipitation>,
    pub seismic: TtlCache<SeismicActivity>,
}

impl SourceCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            forecast: TtlCache::new(ttl),
            historical: TtlCache::new(ttl),
            soil: TtlCache::new(ttl),
            discharge: TtlCache::new(ttl),
            satellite: TtlCache::new(ttl),
            seismic: TtlCache::new(ttl),
        }
    }

    pub fn with_ttl_secs(secs: u64) -> Self {
        Self::new(std::time::Duration::from_secs(secs))
    }

    /// Entries held across all six caches, expired ones included.
    pub fn len(&self) -> usize {
        self.forecast.len()
            + self.historical.len()
            + self.soil.len()
            + self.discharge.len()
            + self.satellite.len()
            + self.seismic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.forecast.clear();
        self.historical.clear();
        self.soil.clear();
        self.discharge.clear();
        self.satellite.clear();
        self.seismic.clear();
    }
}

/// Cache key for a source request at a point.
pub fn cache_key(source: DataSource, latitude: f64, longitude: f64) -> String {
    format!("{}:{:.4}:{:.4}", source, latitude, longitude)
}

/// Serve from `cache` when fresh, otherwise run `fetch` and store a
/// successful result. Failures are never cached.
async fn through_cache<T, F, Fut>(cache: &TtlCache<T>, key: String, fetch: F) -> SourceField<T>
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = SourceField<T>>,
{
    if let Some(hit) = cache.get(&key) {
        tracing::trace!(key = %key, "cache hit");
        return Ok(hit);
    }
    let value = fetch().await?;
    cache.set(key, value.clone());
    Ok(value)
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Fans the six source fetches out for one site and joins them into a
/// snapshot.
#[derive(Clone)]
pub struct SnapshotAggregator {
    clients: SourceClients,
    cache: Arc<SourceCache>,
}

impl SnapshotAggregator {
    pub fn new(clients: SourceClients, cache: Arc<SourceCache>) -> Self {
        Self { clients, cache }
    }

    /// Clients and a fresh cache from `config`.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let clients = SourceClients::new(config)?;
        let cache = Arc::new(SourceCache::with_ttl_secs(config.cache.ttl_secs));
        Ok(Self::new(clients, cache))
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Fetch all six readings concurrently. Never fails: a source that
    /// errors or times out is logged and left degraded in its field.
    pub async fn fetch_readings(&self, site: &Site) -> SourceReadings {
        let (lat, lon) = (site.latitude, site.longitude);
        let c = &self.clients;
        let cache = &self.cache;

        let (forecast, historical, soil, discharge, satellite, seismic) = tokio::join!(
            through_cache(&cache.forecast, cache_key(DataSource::Forecast, lat, lon), || {
                c.fetch_forecast(lat, lon)
            }),
            through_cache(&cache.historical, cache_key(DataSource::Historical, lat, lon), || {
                c.fetch_historical(lat, lon)
            }),
            through_cache(&cache.soil, cache_key(DataSource::Soil, lat, lon), || {
                c.fetch_soil(lat, lon)
            }),
            through_cache(&cache.discharge, cache_key(DataSource::Discharge, lat, lon), || {
                c.fetch_discharge(lat, lon)
            }),
            through_cache(&cache.satellite, cache_key(DataSource::Satellite, lat, lon), || {
                c.fetch_satellite(lat, lon)
            }),
            through_cache(&cache.seismic, cache_key(DataSource::Seismic, lat, lon), || {
                c.fetch_seismic(lat, lon)
            }),
        );

        let readings = SourceReadings {
            forecast,
            historical,
            soil,
            discharge,
            satellite,
            seismic,
        };
        for (source, err) in readings.failed_sources() {
            log_source_failure(source, &site.id, err);
        }
        readings
    }

    pub async fn build_snapshot(&self, site: &Site) -> EnvironmentalSnapshot {
        let readings = self.fetch_readings(site).await;
        let snapshot = EnvironmentalSnapshot::from_readings_at(site, readings, Utc::now());
        tracing::debug!(
            site = %site.id,
            sources_ok = snapshot.readings.available_sources().len(),
            reservoir_pct = snapshot.reservoir.level_pct,
            "snapshot built"
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::open_meteo::SoilLayers;

    fn soil(surface: f64, deep: f64) -> SoilMoisture {
        let layers = SoilLayers {
            surface,
            mid: 0.0,
            deep,
        };
        SoilMoisture {
            current: layers,
            avg_24h: layers,
        }
    }

    #[test]
    fn test_degraded_fields_read_as_neutral() {
        let readings = SourceReadings::all_failed(SourceError::Timeout(15));
        assert_eq!(readings.forecast_max_mm(), 0.0);
        assert_eq!(readings.historical_total_mm(), 0.0);
        assert!(readings.historical_series().is_empty());
        assert_eq!(readings.surface_moisture(), 0.0);
        assert_eq!(readings.discharge_latest(), 0.0);
        assert_eq!(readings.quake_count(), 0);
        assert_eq!(readings.max_magnitude(), 0.0);
        assert!(readings.available_sources().is_empty());
        assert_eq!(readings.failed_sources().len(), 6);
    }

    #[test]
    fn test_partial_readings_report_availability() {
        let mut readings = SourceReadings::all_failed(SourceError::Http(503));
        readings.soil = Ok(soil(0.41, 0.33));

        assert_eq!(readings.surface_moisture(), 0.41);
        assert_eq!(readings.deep_moisture(), 0.33);
        assert!(readings.is_available(DataSource::Soil));
        assert!(!readings.is_available(DataSource::Seismic));
        assert!(!readings.is_available(DataSource::Batch));
        assert_eq!(readings.available_sources(), vec![DataSource::Soil]);
        assert_eq!(readings.error_for(DataSource::Forecast), Some(&SourceError::Http(503)));
    }

    #[test]
    fn test_cache_key_is_per_source_and_point() {
        let a = cache_key(DataSource::Forecast, 30.378, 78.483);
        let b = cache_key(DataSource::Soil, 30.378, 78.483);
        let c = cache_key(DataSource::Forecast, 30.3781, 78.483);
        assert_eq!(a, "FORECAST:30.3780:78.4830");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_through_cache_stores_success_only() {
        let cache: TtlCache<f64> = TtlCache::with_ttl_secs(600);

        let failed = through_cache(&cache, "k".to_string(), || async { Err(SourceError::Http(500)) }).await;
        assert_eq!(failed, Err(SourceError::Http(500)));
        assert!(cache.is_empty());

        let fetched = through_cache(&cache, "k".to_string(), || async { Ok(42.0) }).await;
        assert_eq!(fetched, Ok(42.0));

        // Served from cache: the fetch closure would fail if called
        let cached = through_cache(&cache, "k".to_string(), || async { Err(SourceError::Http(500)) }).await;
        assert_eq!(cached, Ok(42.0));
    }

    #[test]
    fn test_source_cache_counts_all_sources() {
        let cache = SourceCache::with_ttl_secs(60);
        assert!(cache.is_empty());
        cache.soil.set("SOIL:1:2", soil(0.2, 0.2));
        cache.seismic.set(
            "USGS:1:2",
            SeismicActivity {
                events: vec![],
                count: 0,
                max_magnitude: 0.0,
            },
        );
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
