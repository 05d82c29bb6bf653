//! Structured logging for the hazard monitoring service
//!
//! Events go through `tracing`; this module owns subscriber setup plus the
//! source/site context and failure classification that every upstream
//! failure is logged with.

use crate::model::SourceError;
use std::fmt;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

/// Every upstream source, plus the internal components that log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    Forecast,
    Historical,
    Soil,
    Discharge,
    Satellite,
    Seismic,
    Batch,
    System,
}

impl DataSource {
    /// The six upstream sources, in snapshot field order.
    pub const UPSTREAM: [DataSource; 6] = [
        DataSource::Forecast,
        DataSource::Historical,
        DataSource::Soil,
        DataSource::Discharge,
        DataSource::Satellite,
        DataSource::Seismic,
    ];

    /// Human-readable provenance label.
    pub fn provider(&self) -> &'static str {
        match self {
            DataSource::Forecast => "Open-Meteo Forecast API",
            DataSource::Historical => "Open-Meteo Historical",
            DataSource::Soil => "Open-Meteo Land-Surface Model",
            DataSource::Discharge => "Open-Meteo GloFAS Flood API",
            DataSource::Satellite => "NASA POWER PRECTOTCORR",
            DataSource::Seismic => "USGS Earthquake Hazards Program",
            DataSource::Batch | DataSource::System => "internal",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Forecast => write!(f, "FORECAST"),
            DataSource::Historical => write!(f, "HISTORY"),
            DataSource::Soil => write!(f, "SOIL"),
            DataSource::Discharge => write!(f, "GLOFAS"),
            DataSource::Satellite => write!(f, "NASA"),
            DataSource::Seismic => write!(f, "USGS"),
            DataSource::Batch => write!(f, "BATCH"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the source legitimately has nothing for this point
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `min_level` when set. Calling this twice is harmless;
/// the second install is ignored.
pub fn init_logging(min_level: LogLevel, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hazmon_service={},hazmon={}", min_level, min_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify an upstream failure by its kind.
pub fn classify_source_failure(source: DataSource, err: &SourceError) -> FailureType {
    match err {
        // GloFAS returns an empty series for points off the river network
        SourceError::NoData(_) if source == DataSource::Discharge => FailureType::Expected,
        SourceError::NoData(_) | SourceError::MissingField(_) => FailureType::Unknown,
        SourceError::Request(_) | SourceError::Timeout(_) | SourceError::Http(_) => FailureType::Unexpected,
        // Parse errors suggest API changes
        SourceError::Parse(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a source failure with automatic classification.
pub fn log_source_failure(source: DataSource, site_id: &str, err: &SourceError) {
    let error_msg = err.to_string();
    let failure_type = classify_source_failure(source, err);

    match failure_type {
        FailureType::Expected => tracing::debug!(
            source = %source, site = site_id, failure = %failure_type, "fetch failed: {}", error_msg
        ),
        FailureType::Unexpected => tracing::error!(
            source = %source, site = site_id, failure = %failure_type, "fetch failed: {}", error_msg
        ),
        FailureType::Unknown => tracing::warn!(
            source = %source, site = site_id, failure = %failure_type, "fetch failed: {}", error_msg
        ),
    }
}

/// Log a per-site pipeline failure inside a batch run.
pub fn log_site_failure(site_id: &str, reason: &str) {
    tracing::error!(source = %DataSource::Batch, site = site_id, "site dropped from batch: {}", reason);
}

// ---------------------------------------------------------------------------
// Batch Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a batch run.
pub fn log_batch_summary(total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Batch complete: {}/{} successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        tracing::info!(source = %DataSource::Batch, "{}", message);
    } else if successful == 0 {
        tracing::error!(source = %DataSource::Batch, "{}", message);
    } else {
        tracing::warn!(source = %DataSource::Batch, "{}", message);
    }
}
