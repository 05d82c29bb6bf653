//! Hazard engine: the entry points callers use.
//!
//! The pure stages (`compute_risk`, `predict`, `generate_alerts`) are free
//! functions. Anything that touches the network goes through
//! [`HazardEngine`], which owns the snapshot aggregator and its shared
//! cache and runs the batch coordinator over a site list.

use crate::alert::generator::{self, Alert};
use crate::analysis::prediction::{self, Prediction, PredictionFlags};
use crate::analysis::regions;
use crate::analysis::risk::{self, FloodInputs, LandslideInputs, RiskScore};
use crate::batch::{self, BatchOutcome, SiteFailure};
use crate::config::Config;
use crate::model::{RiskLevel, Severity, Site, SourceError, Trend};
use crate::snapshot::{EnvironmentalSnapshot, SnapshotAggregator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;

pub use crate::batch::process_all as process_batch;

/// Both hazard scores for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardScores {
    pub flood: RiskScore,
    pub landslide: RiskScore,
}

pub fn flood_inputs(snapshot: &EnvironmentalSnapshot) -> FloodInputs {
    let r = &snapshot.readings;
    FloodInputs {
        reservoir_level: snapshot.reservoir.level_pct,
        forecast_rainfall_max: r.forecast_max_mm(),
        historical_rainfall_sum: r.historical_total_mm(),
        river_discharge_latest: r.discharge_latest(),
        rainfall_trend: snapshot.reservoir.trend,
    }
}

pub fn landslide_inputs(snapshot: &EnvironmentalSnapshot) -> LandslideInputs {
    let r = &snapshot.readings;
    LandslideInputs {
        surface_soil_moisture: r.surface_moisture(),
        rainfall_accumulation: r.historical_total_mm(),
        max_earthquake_magnitude: r.max_magnitude(),
        earthquake_count: r.quake_count(),
        region: snapshot.site.state.clone(),
        region_susceptibility: regions::susceptibility(&snapshot.site.state),
        deep_soil_moisture: r.deep_moisture(),
    }
}

pub fn compute_risk_at(snapshot: &EnvironmentalSnapshot, now: DateTime<Utc>) -> HazardScores {
    HazardScores {
        flood: risk::flood_risk_at(&flood_inputs(snapshot), now),
        landslide: risk::landslide_risk_at(&landslide_inputs(snapshot), now),
    }
}

pub fn compute_risk(snapshot: &EnvironmentalSnapshot) -> HazardScores {
    compute_risk_at(snapshot, Utc::now())
}

pub fn predict(score: u8, trend: Trend, flags: &PredictionFlags) -> Prediction {
    prediction::predict_24h(score, trend, flags)
}

pub fn generate_alerts(flood: &RiskScore, landslide: &RiskScore, site_name: &str) -> Vec<Alert> {
    generator::generate_alerts(flood, landslide, site_name)
}

// ---------------------------------------------------------------------------
// Per-site assessment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SiteAssessment {
    pub snapshot: EnvironmentalSnapshot,
    pub flood: RiskScore,
    pub landslide: RiskScore,
    pub flood_prediction: Prediction,
    pub landslide_prediction: Prediction,
    pub alerts: Vec<Alert>,
}

impl SiteAssessment {
    /// Score, predict and alert on an already-built snapshot.
    pub fn from_snapshot_at(snapshot: EnvironmentalSnapshot, now: DateTime<Utc>) -> Self {
        let HazardScores { flood, landslide } = compute_risk_at(&snapshot, now);
        let flags = PredictionFlags::from_readings(&snapshot.readings);
        let trend = snapshot.reservoir.trend;
        let alerts = generator::generate_alerts_at(&flood, &landslide, &snapshot.site.name, now);

        Self {
            flood_prediction: predict(flood.score, trend, &flags),
            landslide_prediction: predict(landslide.score, trend, &flags),
            flood,
            landslide,
            alerts,
            snapshot,
        }
    }

    pub fn site(&self) -> &Site {
        &self.snapshot.site
    }

    /// The worse of the two hazard scores.
    pub fn overall_risk(&self) -> u8 {
        self.flood.score.max(self.landslide.score)
    }
}

/// All sites of one assessment run, worst first.
#[derive(Debug)]
pub struct FleetAssessment {
    pub assessments: Vec<SiteAssessment>,
    pub failures: Vec<SiteFailure>,
    pub completed_at: DateTime<Utc>,
}

impl FleetAssessment {
    fn from_outcome(outcome: BatchOutcome<SiteAssessment>) -> Self {
        let mut assessments = outcome.results;
        // Stable sort keeps registry order among equal scores
        assessments.sort_by(|a, b| b.overall_risk().cmp(&a.overall_risk()));
        Self {
            assessments,
            failures: outcome.failures,
            completed_at: Utc::now(),
        }
    }

    pub fn dropped(&self) -> usize {
        self.failures.len()
    }
}

/// Alerts across `assessments`, optionally only one severity, highest
/// score first.
pub fn collect_alerts(assessments: &[SiteAssessment], severity: Option<Severity>) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = assessments
        .iter()
        .flat_map(|a| a.alerts.iter())
        .filter(|alert| severity.is_none_or(|s| alert.severity == s))
        .cloned()
        .collect();
    alerts.sort_by(|a, b| b.score.cmp(&a.score));
    alerts
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl LevelCounts {
    fn add(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskDistribution {
    pub flood: LevelCounts,
    pub landslide: LevelCounts,
}

pub fn risk_distribution(assessments: &[SiteAssessment]) -> RiskDistribution {
    let mut dist = RiskDistribution::default();
    for a in assessments {
        dist.flood.add(a.flood.level);
        dist.landslide.add(a.landslide.level);
    }
    dist
}

impl fmt::Display for RiskDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Flood:     {} HIGH, {} MEDIUM, {} LOW",
            self.flood.high, self.flood.medium, self.flood.low
        )?;
        write!(
            f,
            "Landslide: {} HIGH, {} MEDIUM, {} LOW",
            self.landslide.high, self.landslide.medium, self.landslide.low
        )
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct HazardEngine {
    aggregator: SnapshotAggregator,
    batch_size: usize,
}

impl HazardEngine {
    pub fn new(aggregator: SnapshotAggregator, batch_size: usize) -> Self {
        Self {
            aggregator,
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Ok(Self::new(SnapshotAggregator::from_config(config)?, config.batch.size))
    }

    pub fn aggregator(&self) -> &SnapshotAggregator {
        &self.aggregator
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn compute_snapshot(&self, site: &Site) -> EnvironmentalSnapshot {
        self.aggregator.build_snapshot(site).await
    }

    pub async fn assess_site(&self, site: &Site) -> SiteAssessment {
        let snapshot = self.compute_snapshot(site).await;
        let assessment = SiteAssessment::from_snapshot_at(snapshot, Utc::now());
        tracing::info!(
            site = %site.id,
            flood = assessment.flood.score,
            landslide = assessment.landslide.score,
            alerts = assessment.alerts.len(),
            "site assessed"
        );
        assessment
    }

    /// Run `per_site` over `sites` with this engine's batch size.
    pub async fn process_batch<'a, R, E, F, Fut>(&self, sites: &'a [Site], per_site: F) -> BatchOutcome<R>
    where
        F: Fn(&'a Site) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: fmt::Display,
    {
        batch::process_all(sites, per_site, self.batch_size).await
    }

    pub async fn assess_all(&self, sites: &[Site]) -> FleetAssessment {
        let outcome = self
            .process_batch(sites, |site| async move { Ok::<_, Infallible>(self.assess_site(site).await) })
            .await;
        FleetAssessment::from_outcome(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SourceReadings;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap()
    }

    fn site(id: &str, name: &str, state: &str) -> Site {
        Site {
            id: id.to_string(),
            name: name.to_string(),
            state: state.to_string(),
            latitude: 30.378,
            longitude: 78.483,
            capacity: 86.0,
            river: "Bhagirathi".to_string(),
        }
    }

    fn degraded(site: &Site) -> SiteAssessment {
        let readings = SourceReadings::all_failed(SourceError::Request("connection refused".into()));
        let snapshot = EnvironmentalSnapshot::from_readings_at(site, readings, fixed_now());
        SiteAssessment::from_snapshot_at(snapshot, fixed_now())
    }

    fn with_scores(mut a: SiteAssessment, flood: u8, landslide: u8) -> SiteAssessment {
        a.flood.score = flood;
        a.flood.level = crate::alert::thresholds::level_for_score(flood);
        a.landslide.score = landslide;
        a.landslide.level = crate::alert::thresholds::level_for_score(landslide);
        a.alerts = generator::generate_alerts_at(&a.flood, &a.landslide, &a.site().name, fixed_now());
        a
    }

    #[test]
    fn test_degraded_snapshot_scores_low() {
        let a = degraded(&site("tehri", "Tehri", "Uttarakhand"));
        assert_eq!(a.flood.level, RiskLevel::Low);
        assert_eq!(a.landslide.level, RiskLevel::Low);
        // July baseline 45 + capacity 5.9 = 50.9 -> 6, stable trend -> 3
        assert_eq!(a.flood.score, 9);
        // Himalayan zone only
        assert_eq!(a.landslide.score, 15);
        assert!(a.alerts.iter().all(|alert| alert.severity == Severity::Info));
        assert_eq!(a.flood_prediction.confidence, 60);
    }

    #[test]
    fn test_collect_alerts_filters_and_sorts() {
        let a = with_scores(degraded(&site("a", "Alpha", "Kerala")), 82, 45);
        let b = with_scores(degraded(&site("b", "Bravo", "Kerala")), 91, 12);
        let all = collect_alerts(&[a.clone(), b.clone()], None);
        let scores: Vec<u8> = all.iter().map(|x| x.score).collect();
        assert_eq!(scores, vec![91, 82, 45, 12]);

        let high = collect_alerts(&[a, b], Some(Severity::High));
        assert_eq!(high.len(), 2);
        assert!(high.iter().all(|x| x.severity == Severity::High));
    }

    #[test]
    fn test_risk_distribution_counts_levels() {
        let a = with_scores(degraded(&site("a", "Alpha", "Kerala")), 82, 45);
        let b = with_scores(degraded(&site("b", "Bravo", "Kerala")), 20, 75);
        let dist = risk_distribution(&[a, b]);
        assert_eq!(dist.flood, LevelCounts { high: 1, medium: 0, low: 1 });
        assert_eq!(dist.landslide, LevelCounts { high: 1, medium: 1, low: 0 });
        assert!(dist.to_string().starts_with("Flood:     1 HIGH"));
    }

    #[test]
    fn test_fleet_sorted_by_overall_risk() {
        let low = with_scores(degraded(&site("a", "Alpha", "Kerala")), 10, 12);
        let high = with_scores(degraded(&site("b", "Bravo", "Kerala")), 20, 75);
        let mid = with_scores(degraded(&site("c", "Charlie", "Kerala")), 55, 5);
        let fleet = FleetAssessment::from_outcome(BatchOutcome {
            results: vec![low, high, mid],
            failures: vec![],
        });
        let order: Vec<&str> = fleet.assessments.iter().map(|a| a.site().id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_eq!(fleet.dropped(), 0);
    }
}
