//! Score thresholds.
//!
//! Score-to-level cutoffs shared by both hazards, plus the per-hazard
//! informational floor below which a LOW score raises nothing at all.

use crate::model::{HazardKind, RiskLevel, Severity};

/// Scores at or above this are HIGH.
pub const HIGH_THRESHOLD: u8 = 70;
/// Scores at or above this (and below HIGH) are MEDIUM.
pub const MEDIUM_THRESHOLD: u8 = 40;

pub fn level_for_score(score: u8) -> RiskLevel {
    if score >= HIGH_THRESHOLD {
        RiskLevel::High
    } else if score >= MEDIUM_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Lowest LOW-level score that still produces an INFO alert.
pub fn info_floor(hazard: HazardKind) -> u8 {
    match hazard {
        HazardKind::Flood => 8,
        HazardKind::Landslide => 10,
    }
}

/// The alert severity warranted by a score, if any.
///
/// Returns `None` for LOW scores under the hazard's informational floor.
pub fn alert_severity(hazard: HazardKind, level: RiskLevel, score: u8) -> Option<Severity> {
    match level {
        RiskLevel::High => Some(Severity::High),
        RiskLevel::Medium => Some(Severity::Medium),
        RiskLevel::Low if score >= info_floor(hazard) => Some(Severity::Info),
        RiskLevel::Low => None,
    }
}
