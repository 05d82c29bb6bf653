//! Alert records derived from a site's two hazard scores.
//!
//! Each hazard yields at most one alert per pass, so a site never gets both
//! a HIGH and a MEDIUM alert for the same hazard. Alerts are rebuilt every
//! scoring cycle and are not persisted; ids are unique within one pass.

use crate::alert::thresholds::alert_severity;
use crate::analysis::risk::RiskScore;
use crate::model::{HazardKind, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// `{hazard}-{tier}-{slug(site name)}`
    pub id: String,
    pub hazard: HazardKind,
    pub severity: Severity,
    /// Name of the site the alert concerns.
    pub site: String,
    pub score: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Lower-case ASCII alphanumerics of `name`, everything else dropped.
pub fn slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn alert_id(hazard: HazardKind, severity: Severity, site_name: &str) -> String {
    format!("{}-{}-{}", hazard.id_prefix(), severity.id_tier(), slug(site_name))
}

fn message(risk: &RiskScore, severity: Severity, site_name: &str) -> String {
    let place = match risk.hazard {
        HazardKind::Flood => "at",
        HazardKind::Landslide => "near",
    };
    match severity {
        Severity::High => format!(
            "HIGH {} RISK {} {}. {}",
            risk.hazard,
            place,
            site_name,
            risk.factors.join("; ")
        ),
        Severity::Medium => format!(
            "MODERATE {} RISK {} {}. {}",
            risk.hazard,
            place,
            site_name,
            risk.factors.join("; ")
        ),
        Severity::Info => {
            let top = risk.factors.iter().take(2).cloned().collect::<Vec<_>>().join("; ");
            match risk.hazard {
                HazardKind::Flood => format!("Flood conditions normal at {}. {}", site_name, top),
                HazardKind::Landslide => {
                    format!("Landslide conditions monitored near {}. {}", site_name, top)
                }
            }
        }
    }
}

fn alert_for(risk: &RiskScore, site_name: &str, now: DateTime<Utc>) -> Option<Alert> {
    let severity = alert_severity(risk.hazard, risk.level, risk.score)?;
    Some(Alert {
        id: alert_id(risk.hazard, severity, site_name),
        hazard: risk.hazard,
        severity,
        site: site_name.to_string(),
        score: risk.score,
        message: message(risk, severity, site_name),
        timestamp: now,
    })
}

/// Alerts for one site, flood first.
pub fn generate_alerts_at(
    flood: &RiskScore,
    landslide: &RiskScore,
    site_name: &str,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    [flood, landslide]
        .into_iter()
        .filter_map(|risk| alert_for(risk, site_name, now))
        .collect()
}

pub fn generate_alerts(flood: &RiskScore, landslide: &RiskScore, site_name: &str) -> Vec<Alert> {
    generate_alerts_at(flood, landslide, site_name, Utc::now())
}
