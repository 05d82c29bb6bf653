//! Weighted multi-factor flood and landslide scoring.
//!
//! Each hazard sums points from five independent factors, each factor
//! contributing from its highest satisfied tier only. The total is clamped
//! to 100 and mapped to a level. Every satisfied tier appends one
//! human-readable factor line, in evaluation order.
//!
//! These are pure functions of their inputs. The timestamp is the only
//! field that differs between two runs on identical inputs.

use crate::alert::thresholds::level_for_score;
use crate::model::{HazardKind, RiskLevel, Trend};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub hazard: HazardKind,
    /// 0..=100
    pub score: u8,
    pub level: RiskLevel,
    pub factors: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

impl RiskScore {
    fn from_points(hazard: HazardKind, points: u32, factors: Vec<String>, now: DateTime<Utc>) -> Self {
        let score = points.min(100) as u8;
        Self {
            hazard,
            score,
            level: level_for_score(score),
            factors,
            computed_at: now,
        }
    }

    /// True when score, level and factors match, ignoring the timestamp.
    pub fn same_result(&self, other: &RiskScore) -> bool {
        self.hazard == other.hazard
            && self.score == other.score
            && self.level == other.level
            && self.factors == other.factors
    }
}

/// Points for the first tier whose lower bound `value` strictly exceeds.
/// `tiers` runs from the highest bound down.
fn tier_points<'a>(value: f64, tiers: &[(f64, u32, &'a str)]) -> Option<(u32, &'a str)> {
    tiers
        .iter()
        .find(|(bound, _, _)| value > *bound)
        .map(|(_, points, label)| (*points, *label))
}

// ---------------------------------------------------------------------------
// Flood
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FloodInputs {
    /// Estimated reservoir fill, percent.
    pub reservoir_level: f64,
    /// Wettest forecast day, mm.
    pub forecast_rainfall_max: f64,
    /// Observed 7-day accumulation, mm.
    pub historical_rainfall_sum: f64,
    /// Latest river discharge, m³/s.
    pub river_discharge_latest: f64,
    pub rainfall_trend: Trend,
}

const RESERVOIR_TIERS: &[(f64, u32, &str)] = &[
    (85.0, 25, "Critical reservoir level"),
    (75.0, 18, "High reservoir level"),
    (60.0, 12, "Elevated reservoir level"),
    (45.0, 6, "Moderate reservoir level"),
];

const FORECAST_TIERS: &[(f64, u32, &str)] = &[
    (100.0, 25, "Extreme rainfall forecast"),
    (60.0, 20, "Very heavy rainfall forecast"),
    (35.0, 14, "Heavy rainfall forecast"),
    (15.0, 7, "Moderate rainfall forecast"),
];

const CUMULATIVE_TIERS: &[(f64, u32, &str)] = &[
    (200.0, 20, "Extreme cumulative rain"),
    (120.0, 15, "Very high cumulative rain"),
    (60.0, 10, "High cumulative rain"),
    (25.0, 5, "Moderate cumulative rain"),
];

const DISCHARGE_TIERS: &[(f64, u32, &str)] = &[
    (5000.0, 20, "Very high river discharge"),
    (2000.0, 15, "High river discharge"),
    (500.0, 10, "Elevated river discharge"),
    (100.0, 5, "Moderate river discharge"),
];

pub fn flood_risk_at(inputs: &FloodInputs, now: DateTime<Utc>) -> RiskScore {
    let mut points = 0;
    let mut factors = Vec::new();

    let rl = inputs.reservoir_level;
    if let Some((p, label)) = tier_points(rl, RESERVOIR_TIERS) {
        points += p;
        factors.push(format!("{} ({:.1}%)", label, rl));
    }

    let fr = inputs.forecast_rainfall_max;
    if let Some((p, label)) = tier_points(fr, FORECAST_TIERS) {
        points += p;
        factors.push(format!("{} ({:.1} mm)", label, fr));
    }

    let hr = inputs.historical_rainfall_sum;
    if let Some((p, label)) = tier_points(hr, CUMULATIVE_TIERS) {
        points += p;
        factors.push(format!("{} ({:.1} mm / 7d)", label, hr));
    }

    let rd = inputs.river_discharge_latest;
    if let Some((p, label)) = tier_points(rd, DISCHARGE_TIERS) {
        points += p;
        factors.push(format!("{} ({:.0} m³/s)", label, rd));
    }

    match inputs.rainfall_trend {
        Trend::Increasing => {
            points += 10;
            factors.push("Rainfall trend: increasing".to_string());
        }
        Trend::Stable => {
            points += 3;
            factors.push("Rainfall trend: stable".to_string());
        }
        Trend::Decreasing => {}
    }

    RiskScore::from_points(HazardKind::Flood, points, factors, now)
}

pub fn flood_risk(inputs: &FloodInputs) -> RiskScore {
    flood_risk_at(inputs, Utc::now())
}

// ---------------------------------------------------------------------------
// Landslide
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct LandslideInputs {
    /// Surface volumetric soil moisture, m³/m³.
    pub surface_soil_moisture: f64,
    /// Rainfall accumulation, mm.
    pub rainfall_accumulation: f64,
    pub max_earthquake_magnitude: f64,
    pub earthquake_count: usize,
    /// Region name, quoted in the factor line.
    pub region: String,
    pub region_susceptibility: RiskLevel,
    /// Deep (27–81 cm) volumetric soil moisture, m³/m³.
    pub deep_soil_moisture: f64,
}

const SOIL_TIERS: &[(f64, u32, &str)] = &[
    (0.45, 25, "Saturated soil"),
    (0.35, 18, "Very wet soil"),
    (0.25, 12, "Wet soil"),
    (0.15, 5, "Moderate soil moisture"),
];

const ACCUMULATION_TIERS: &[(f64, u32, &str)] = &[
    (200.0, 25, "Extreme rain accumulation"),
    (120.0, 18, "Very high rain accumulation"),
    (60.0, 12, "High rain accumulation"),
    (25.0, 5, "Moderate rain accumulation"),
];

const MAGNITUDE_TIERS: &[(f64, u32, &str)] = &[
    (5.5, 25, "Strong earthquake"),
    (4.5, 18, "Moderate-strong quake"),
    (3.5, 12, "Moderate quake"),
];

const DEEP_SOIL_TIERS: &[(f64, u32, &str)] = &[
    (0.40, 10, "Deep soil saturated"),
    (0.30, 6, "Deep soil wet"),
    (0.20, 3, "Deep soil moderately moist"),
];

pub fn landslide_risk_at(inputs: &LandslideInputs, now: DateTime<Utc>) -> RiskScore {
    let mut points = 0;
    let mut factors = Vec::new();

    let sm = inputs.surface_soil_moisture;
    if let Some((p, label)) = tier_points(sm, SOIL_TIERS) {
        points += p;
        factors.push(format!("{} ({:.1}% vol.)", label, sm * 100.0));
    }

    let ra = inputs.rainfall_accumulation;
    if let Some((p, label)) = tier_points(ra, ACCUMULATION_TIERS) {
        points += p;
        factors.push(format!("{} ({:.1} mm)", label, ra));
    }

    let (em, ec) = (inputs.max_earthquake_magnitude, inputs.earthquake_count);
    let seismic = tier_points(em, MAGNITUDE_TIERS)
        .or_else(|| (ec > 0).then_some((5, "Minor seismic activity")));
    if let Some((p, label)) = seismic {
        points += p;
        factors.push(format!("{} (M{:.1}, {} events)", label, em, ec));
    }

    match inputs.region_susceptibility {
        RiskLevel::High => {
            points += 15;
            factors.push(format!("High landslide-prone zone ({})", inputs.region));
        }
        RiskLevel::Medium => {
            points += 8;
            factors.push(format!("Moderate landslide-prone zone ({})", inputs.region));
        }
        RiskLevel::Low => {}
    }

    let dsm = inputs.deep_soil_moisture;
    if let Some((p, label)) = tier_points(dsm, DEEP_SOIL_TIERS) {
        points += p;
        factors.push(format!("{} ({:.1}% vol.)", label, dsm * 100.0));
    }

    RiskScore::from_points(HazardKind::Landslide, points, factors, now)
}

pub fn landslide_risk(inputs: &LandslideInputs) -> RiskScore {
    landslide_risk_at(inputs, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap()
    }

    fn calm_flood() -> FloodInputs {
        FloodInputs {
            reservoir_level: 0.0,
            forecast_rainfall_max: 0.0,
            historical_rainfall_sum: 0.0,
            river_discharge_latest: 0.0,
            rainfall_trend: Trend::Decreasing,
        }
    }

    fn calm_landslide() -> LandslideInputs {
        LandslideInputs {
            surface_soil_moisture: 0.0,
            rainfall_accumulation: 0.0,
            max_earthquake_magnitude: 0.0,
            earthquake_count: 0,
            region: "Gujarat".to_string(),
            region_susceptibility: RiskLevel::Low,
            deep_soil_moisture: 0.0,
        }
    }

    #[test]
    fn test_worst_case_flood_clamps_to_100() {
        let score = flood_risk_at(
            &FloodInputs {
                reservoir_level: 90.0,
                forecast_rainfall_max: 120.0,
                historical_rainfall_sum: 250.0,
                river_discharge_latest: 6000.0,
                rainfall_trend: Trend::Increasing,
            },
            fixed_now(),
        );
        assert_eq!(score.score, 100);
        assert_eq!(score.level, RiskLevel::High);
        assert_eq!(
            score.factors,
            vec![
                "Critical reservoir level (90.0%)",
                "Extreme rainfall forecast (120.0 mm)",
                "Extreme cumulative rain (250.0 mm / 7d)",
                "Very high river discharge (6000 m³/s)",
                "Rainfall trend: increasing",
            ]
        );
    }

    #[test]
    fn test_flood_tiers_are_strict_greater_than() {
        let mut inputs = calm_flood();
        inputs.reservoir_level = 85.0;
        inputs.river_discharge_latest = 100.0;
        let score = flood_risk_at(&inputs, fixed_now());
        assert_eq!(score.score, 18);
        assert_eq!(score.factors, vec!["High reservoir level (85.0%)"]);
    }

    #[test]
    fn test_stable_trend_adds_three() {
        let mut inputs = calm_flood();
        inputs.rainfall_trend = Trend::Stable;
        let score = flood_risk_at(&inputs, fixed_now());
        assert_eq!(score.score, 3);
        assert_eq!(score.level, RiskLevel::Low);
    }

    #[test]
    fn test_calm_inputs_score_zero() {
        assert_eq!(flood_risk_at(&calm_flood(), fixed_now()).score, 0);
        let ls = landslide_risk_at(&calm_landslide(), fixed_now());
        assert_eq!(ls.score, 0);
        assert!(ls.factors.is_empty());
    }

    #[test]
    fn test_worst_case_landslide_clamps_to_100() {
        let score = landslide_risk_at(
            &LandslideInputs {
                surface_soil_moisture: 0.50,
                rainfall_accumulation: 250.0,
                max_earthquake_magnitude: 6.0,
                earthquake_count: 2,
                region: "Uttarakhand".to_string(),
                region_susceptibility: RiskLevel::High,
                deep_soil_moisture: 0.45,
            },
            fixed_now(),
        );
        assert_eq!(score.score, 100);
        assert_eq!(score.level, RiskLevel::High);
        assert_eq!(score.factors[0], "Saturated soil (50.0% vol.)");
        assert_eq!(score.factors[2], "Strong earthquake (M6.0, 2 events)");
        assert_eq!(score.factors[3], "High landslide-prone zone (Uttarakhand)");
        assert_eq!(score.factors[4], "Deep soil saturated (45.0% vol.)");
    }

    #[test]
    fn test_minor_seismic_activity_needs_an_event() {
        let mut inputs = calm_landslide();
        inputs.max_earthquake_magnitude = 2.8;
        assert_eq!(landslide_risk_at(&inputs, fixed_now()).score, 0);

        inputs.earthquake_count = 3;
        let score = landslide_risk_at(&inputs, fixed_now());
        assert_eq!(score.score, 5);
        assert_eq!(score.factors, vec!["Minor seismic activity (M2.8, 3 events)"]);
    }

    #[test]
    fn test_medium_zone_adds_eight() {
        let mut inputs = calm_landslide();
        inputs.region = "Assam".to_string();
        inputs.region_susceptibility = RiskLevel::Medium;
        let score = landslide_risk_at(&inputs, fixed_now());
        assert_eq!(score.score, 8);
        assert_eq!(score.factors, vec!["Moderate landslide-prone zone (Assam)"]);
    }

    #[test]
    fn test_level_thresholds_through_scoring() {
        // 25 + 20 + 20 + 5 = 70
        let mut inputs = calm_flood();
        inputs.reservoir_level = 86.0;
        inputs.forecast_rainfall_max = 61.0;
        inputs.historical_rainfall_sum = 201.0;
        inputs.river_discharge_latest = 101.0;
        assert_eq!(flood_risk_at(&inputs, fixed_now()).level, RiskLevel::High);

        // 18 + 25 + 18 + 8 = 69
        let mut ls = calm_landslide();
        ls.surface_soil_moisture = 0.4;
        ls.rainfall_accumulation = 201.0;
        ls.max_earthquake_magnitude = 5.0;
        ls.earthquake_count = 1;
        ls.region_susceptibility = RiskLevel::Medium;
        let score = landslide_risk_at(&ls, fixed_now());
        assert_eq!(score.score, 69);
        assert_eq!(score.level, RiskLevel::Medium);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let inputs = FloodInputs {
            reservoir_level: 72.4,
            forecast_rainfall_max: 38.0,
            historical_rainfall_sum: 64.2,
            river_discharge_latest: 812.0,
            rainfall_trend: Trend::Stable,
        };
        let a = flood_risk(&inputs);
        let b = flood_risk(&inputs);
        assert!(a.same_result(&b));
    }
}
