//! Service configuration.
//!
//! Loaded from a TOML file (`hazmon.toml` unless `HAZMON_CONFIG` points
//! elsewhere). Every field has a default, so a missing file or a missing
//! section falls back to the values the service was tuned with. A `.env`
//! file and the process environment are applied on top.

use crate::model::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "hazmon.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub batch: BatchConfig,
    pub http: HttpConfig,
    pub endpoints: Endpoints,
    pub sources: SourceParams,
    pub sites: SitesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a fetched source payload stays fresh.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 600 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Sites processed concurrently per chunk.
    pub size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { size: 5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// NASA POWER is consistently slower than the others.
    pub satellite_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            satellite_timeout_secs: 20,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn satellite_timeout(&self) -> Duration {
        Duration::from_secs(self.satellite_timeout_secs)
    }
}

/// Base URLs of the upstream APIs. Overridable so tests and staging can
/// point the clients elsewhere.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub open_meteo: String,
    pub glofas: String,
    pub nasa_power: String,
    pub usgs: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            open_meteo: "https://api.open-meteo.com/v1".to_string(),
            glofas: "https://flood-api.open-meteo.com/v1/flood".to_string(),
            nasa_power: "https://power.larc.nasa.gov/api/temporal/daily/point".to_string(),
            usgs: "https://earthquake.usgs.gov/fdsnws/event/1/query".to_string(),
        }
    }
}

impl Endpoints {
    /// Every endpoint pointed at one base URL. Used for local test servers.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            open_meteo: base.to_string(),
            glofas: format!("{}/flood", base),
            nasa_power: format!("{}/power", base),
            usgs: format!("{}/fdsnws", base),
        }
    }
}

/// Request windows and filters for the individual sources.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceParams {
    pub historical_days: u32,
    pub satellite_days: u32,
    pub seismic_radius_km: f64,
    pub seismic_lookback_days: u32,
    pub seismic_min_magnitude: f64,
    pub timezone: String,
}

impl Default for SourceParams {
    fn default() -> Self {
        Self {
            historical_days: 7,
            satellite_days: 14,
            seismic_radius_km: 300.0,
            seismic_lookback_days: 30,
            seismic_min_magnitude: 2.5,
            timezone: "Asia/Kolkata".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SitesConfig {
    pub registry_path: String,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            registry_path: "sites.toml".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Load `.env`, then the config file, then environment overrides.
    ///
    /// A missing config file is not an error; defaults are used.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path = config_path(|key| std::env::var(key).ok());
        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Legacy variable, expressed in minutes
        if let Some(minutes) = lookup("CACHE_DURATION") {
            let parsed: u64 = parse_env("CACHE_DURATION", &minutes)?;
            self.cache.ttl_secs = parsed.checked_mul(60).ok_or_else(|| {
                ConfigError::Invalid(format!("CACHE_DURATION has invalid value '{}'", minutes))
            })?;
        }
        if let Some(secs) = lookup("HAZMON_CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_env("HAZMON_CACHE_TTL_SECS", &secs)?;
        }
        if let Some(size) = lookup("HAZMON_BATCH_SIZE") {
            self.batch.size = parse_env("HAZMON_BATCH_SIZE", &size)?;
        }
        if let Some(path) = lookup("HAZMON_SITES") {
            self.sites.registry_path = path;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.size == 0 {
            return Err(ConfigError::Invalid("batch.size must be at least 1".to_string()));
        }
        if self.http.timeout_secs == 0 || self.http.satellite_timeout_secs == 0 {
            return Err(ConfigError::Invalid("http timeouts must be non-zero".to_string()));
        }
        if self.sources.historical_days < 6 {
            // The reservoir trend compares two 3-day windows
            return Err(ConfigError::Invalid(
                "sources.historical_days must be at least 6".to_string(),
            ));
        }
        Ok(())
    }
}

/// Config file location: `HAZMON_CONFIG` if set, else `hazmon.toml`.
pub fn config_path<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("HAZMON_CONFIG").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} has invalid value '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_match_service_tuning() {
        let config = Config::default();
        assert_eq!(config.cache.ttl_secs, 600);
        assert_eq!(config.batch.size, 5);
        assert_eq!(config.http.timeout_secs, 15);
        assert_eq!(config.http.satellite_timeout_secs, 20);
        assert_eq!(config.sources.historical_days, 7);
        assert_eq!(config.sources.seismic_radius_km, 300.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults_for_missing_sections() {
        let config = Config::from_toml_str(
            r#"
            [cache]
            ttl_secs = 120

            [endpoints]
            usgs = "http://localhost:9000/query"
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.batch.size, 5);
        assert_eq!(config.endpoints.usgs, "http://localhost:9000/query");
        assert!(config.endpoints.open_meteo.starts_with("https://api.open-meteo.com"));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let result = Config::from_toml_str("[cache\nttl_secs = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[batch]\nsize = 3").expect("write config");
        let config = Config::from_file(file.path()).expect("config file should load");
        assert_eq!(config.batch.size, 3);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Config::from_file("/definitely/not/here/hazmon.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_env_overrides_apply_in_order() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CACHE_DURATION", "30"),
            ("HAZMON_BATCH_SIZE", "8"),
            ("HAZMON_SITES", "/etc/hazmon/sites.toml"),
        ]);
        let mut config = Config::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .expect("overrides should apply");

        assert_eq!(config.cache.ttl_secs, 1800, "CACHE_DURATION is in minutes");
        assert_eq!(config.batch.size, 8);
        assert_eq!(config.sites.registry_path, "/etc/hazmon/sites.toml");
    }

    #[test]
    fn test_explicit_ttl_wins_over_legacy_minutes() {
        let env: HashMap<&str, &str> =
            HashMap::from([("CACHE_DURATION", "30"), ("HAZMON_CACHE_TTL_SECS", "90")]);
        let mut config = Config::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.cache.ttl_secs, 90);
    }

    #[test]
    fn test_non_numeric_override_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|k| {
            (k == "HAZMON_BATCH_SIZE").then(|| "five".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_huge_legacy_cache_duration_is_rejected() {
        let mut config = Config::default();
        let huge = u64::MAX.to_string();
        let result = config.apply_env_overrides(|k| (k == "CACHE_DURATION").then(|| huge.clone()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        assert_eq!(config.cache.ttl_secs, 600, "ttl left untouched");
    }

    #[test]
    fn test_config_path_honours_env() {
        assert_eq!(config_path(|_| None), "hazmon.toml");
        let custom = config_path(|k| (k == "HAZMON_CONFIG").then(|| "/etc/hazmon.toml".to_string()));
        assert_eq!(custom, "/etc/hazmon.toml");
    }

    #[test]
    fn test_zero_batch_size_fails_validation() {
        let mut config = Config::default();
        config.batch.size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoints_all_at_shares_one_base() {
        let endpoints = Endpoints::all_at("http://127.0.0.1:9/");
        assert_eq!(endpoints.open_meteo, "http://127.0.0.1:9");
        assert_eq!(endpoints.glofas, "http://127.0.0.1:9/flood");
        assert!(endpoints.usgs.starts_with("http://127.0.0.1:9/"));
    }
}
