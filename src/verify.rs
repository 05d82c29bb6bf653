//! Live source verification.
//!
//! Fetches every upstream source for every registered site once and reports
//! which sources answer with usable data. Run this after changing endpoints
//! or adding sites, before trusting the scores.

use crate::logging::DataSource;
use crate::model::Site;
use crate::snapshot::{SnapshotAggregator, SourceReadings};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteVerification {
    pub site_id: String,
    pub name: String,
    pub status: VerificationStatus,
    pub sources_working: Vec<String>,
    /// `(source, error message)`
    pub sources_failed: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHealth {
    pub source: String,
    pub provider: String,
    pub working: usize,
    pub failed: usize,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub sites: Vec<SiteVerification>,
    pub sources: Vec<SourceHealth>,
}

impl VerificationReport {
    /// Share of site/source checks that succeeded, in percent.
    pub fn success_rate(&self) -> f64 {
        let working: usize = self.sources.iter().map(|s| s.working).sum();
        let total: usize = self.sources.iter().map(|s| s.working + s.failed).sum();
        if total == 0 {
            0.0
        } else {
            working as f64 / total as f64 * 100.0
        }
    }
}

// ============================================================================
// Checks
// ============================================================================

/// Classify one site's readings.
pub fn verify_readings(site: &Site, readings: &SourceReadings) -> SiteVerification {
    let sources_working: Vec<String> = readings
        .available_sources()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let sources_failed: Vec<(String, String)> = readings
        .failed_sources()
        .into_iter()
        .map(|(s, e)| (s.to_string(), e.to_string()))
        .collect();

    let status = if sources_failed.is_empty() {
        VerificationStatus::Success
    } else if sources_working.is_empty() {
        VerificationStatus::Failed
    } else {
        VerificationStatus::PartialSuccess
    };

    SiteVerification {
        site_id: site.id.clone(),
        name: site.name.clone(),
        status,
        sources_working,
        sources_failed,
    }
}

/// Per-source working/failed counts over all checked sites.
pub fn summarize(sites: &[SiteVerification]) -> Vec<SourceHealth> {
    DataSource::UPSTREAM
        .iter()
        .map(|source| {
            let label = source.to_string();
            let mut health = SourceHealth {
                source: label.clone(),
                provider: source.provider().to_string(),
                working: 0,
                failed: 0,
                last_error: None,
            };
            for site in sites {
                if site.sources_working.contains(&label) {
                    health.working += 1;
                } else if let Some((_, err)) = site.sources_failed.iter().find(|(s, _)| *s == label) {
                    health.failed += 1;
                    health.last_error = Some(err.clone());
                }
            }
            health
        })
        .collect()
}

/// Fetch every source for every site, one site at a time, and report.
pub async fn verify_sources(aggregator: &SnapshotAggregator, sites: &[Site]) -> VerificationReport {
    println!("🔍 Verifying upstream sources for {} sites...", sites.len());

    let mut results = Vec::with_capacity(sites.len());
    for site in sites {
        let readings = aggregator.fetch_readings(site).await;
        let result = verify_readings(site, &readings);

        match result.status {
            VerificationStatus::Success => println!("  {} ... ✓ OK", site.id),
            VerificationStatus::PartialSuccess => {
                let failed: Vec<&str> = result.sources_failed.iter().map(|(s, _)| s.as_str()).collect();
                println!("  {} ... ⚠ Partial (failed: {})", site.id, failed.join(", "));
            }
            VerificationStatus::Failed => {
                let reason = result
                    .sources_failed
                    .first()
                    .map(|(_, e)| e.as_str())
                    .unwrap_or("Unknown");
                println!("  {} ... ✗ FAILED: {}", site.id, reason);
            }
        }
        results.push(result);
    }

    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        sources: summarize(&results),
        sites: results,
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "═".repeat(59);
        writeln!(f, "{}", rule)?;
        writeln!(f, "📊 VERIFICATION SUMMARY")?;
        writeln!(f, "{}", rule)?;
        for s in &self.sources {
            writeln!(
                f,
                "{:<9} {}/{} working  ({} failed)  [{}]",
                s.source,
                s.working,
                s.working + s.failed,
                s.failed,
                s.provider
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Overall Success Rate: {:.1}%", self.success_rate())?;
        write!(f, "{}", rule)
    }
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n{}", report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::usgs_quakes::SeismicActivity;
    use crate::model::SourceError;

    fn site(id: &str) -> Site {
        Site {
            id: id.to_string(),
            name: id.to_uppercase(),
            state: "Odisha".to_string(),
            latitude: 21.5,
            longitude: 83.9,
            capacity: 58.0,
            river: "Mahanadi".to_string(),
        }
    }

    fn quiet_seismic() -> SeismicActivity {
        SeismicActivity {
            events: vec![],
            count: 0,
            max_magnitude: 0.0,
        }
    }

    #[test]
    fn test_all_failed_site() {
        let readings = SourceReadings::all_failed(SourceError::Http(502));
        let result = verify_readings(&site("hirakud"), &readings);
        assert_eq!(result.status, VerificationStatus::Failed);
        assert_eq!(result.sources_failed.len(), 6);
        assert_eq!(result.sources_failed[0], ("FORECAST".to_string(), "HTTP error: 502".to_string()));
    }

    #[test]
    fn test_partial_site_and_summary() {
        let mut partial = SourceReadings::all_failed(SourceError::Timeout(20));
        partial.seismic = Ok(quiet_seismic());
        let a = verify_readings(&site("a"), &partial);
        assert_eq!(a.status, VerificationStatus::PartialSuccess);
        assert_eq!(a.sources_working, vec!["USGS"]);

        let b = verify_readings(&site("b"), &SourceReadings::all_failed(SourceError::Http(500)));
        let summary = summarize(&[a, b]);
        assert_eq!(summary.len(), 6);

        let usgs = summary.iter().find(|s| s.source == "USGS").unwrap();
        assert_eq!((usgs.working, usgs.failed), (1, 1));
        assert_eq!(usgs.last_error.as_deref(), Some("HTTP error: 500"));

        let nasa = summary.iter().find(|s| s.source == "NASA").unwrap();
        assert_eq!((nasa.working, nasa.failed), (0, 2));
    }

    #[test]
    fn test_success_rate_and_display() {
        let mut partial = SourceReadings::all_failed(SourceError::Timeout(20));
        partial.seismic = Ok(quiet_seismic());
        let report = VerificationReport {
            timestamp: "2024-07-01T06:00:00+00:00".to_string(),
            sources: summarize(&[verify_readings(&site("a"), &partial)]),
            sites: vec![],
        };
        let rate = report.success_rate();
        assert!((rate - 100.0 / 6.0).abs() < 1e-9);
        assert!(report.to_string().contains("Overall Success Rate: 16.7%"));

        let empty = VerificationReport {
            timestamp: String::new(),
            sites: vec![],
            sources: vec![],
        };
        assert_eq!(empty.success_rate(), 0.0);
    }
}
