//! Site, HazardKind, RiskLevel, Trend, Severity, SourceError, ConfigError
//! core data structures and error handling
//!
//! This module defines the shared domain model imported by all other modules.
//! It holds types and small conversions only; nothing here performs I/O.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Site
// ---------------------------------------------------------------------------

/// A monitored location (a dam) supplied by the external site registry.
///
/// The core never mutates a `Site`; it only reads coordinates for source
/// requests, `state` for region susceptibility, and `capacity` for the
/// reservoir estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    /// Administrative region (Indian state) the site sits in.
    pub state: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Gross storage capacity in TMC.
    pub capacity: f64,
    #[serde(default)]
    pub river: String,
}

// ---------------------------------------------------------------------------
// Classification enums
// ---------------------------------------------------------------------------

/// The two hazards scored for every site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HazardKind {
    Flood,
    Landslide,
}

impl HazardKind {
    /// Short token used in alert identifiers.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            HazardKind::Flood => "flood",
            HazardKind::Landslide => "ls",
        }
    }
}

impl fmt::Display for HazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HazardKind::Flood => write!(f, "FLOOD"),
            HazardKind::Landslide => write!(f, "LANDSLIDE"),
        }
    }
}

/// Discretized hazard severity, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Direction of recent rainfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Stable => write!(f, "stable"),
            Trend::Decreasing => write!(f, "decreasing"),
        }
    }
}

/// Alert severity tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Medium,
    High,
}

impl Severity {
    /// Short token used in alert identifiers.
    pub fn id_tier(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "med",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Severity::High),
            "MEDIUM" => Ok(Severity::Medium),
            "INFO" => Ok(Severity::Info),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or normalizing one upstream source.
///
/// A `SourceError` never escapes the snapshot: the affected field carries it
/// and contributes a neutral value to scoring.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// Transport-level failure (DNS, connection refused, TLS, ...).
    #[error("Request failed: {0}")]
    Request(String),
    /// The request exceeded the client's fixed timeout.
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    /// Non-2xx HTTP response.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The payload parsed but lacked the array the client depends on.
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    /// The payload was well formed but carried no usable values.
    #[error("No data available: {0}")]
    NoData(String),
}

impl SourceError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(timeout_secs)
        } else if let Some(status) = err.status() {
            SourceError::Http(status.as_u16())
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Request(err.to_string())
        }
    }
}

/// Errors raised while loading configuration or the site registry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error("invalid TOML: {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
