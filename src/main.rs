//! `hazmon`: run hazard assessment cycles over the site registry.
//!
//! Usage: `hazmon [--verify]`
//!
//! Without `HAZMON_INTERVAL_SECS` a single cycle runs and the process exits.
//! With it, cycles repeat on that interval and share one source cache.

use anyhow::{Context, Result};
use hazmon_service::config::{Config, config_path};
use hazmon_service::engine::{self, FleetAssessment, HazardEngine};
use hazmon_service::logging::{LogLevel, init_logging};
use hazmon_service::model::Severity;
use hazmon_service::sites::load_sites;
use hazmon_service::verify;
use std::path::Path;
use std::time::Duration;

fn print_fleet(fleet: &FleetAssessment) {
    println!();
    println!(
        "{:<28} {:<18} {:>6} {:>10} {:>10}",
        "SITE", "STATE", "FLOOD", "LANDSLIDE", "RESERVOIR"
    );
    for a in &fleet.assessments {
        println!(
            "{:<28} {:<18} {:>3} {:<2} {:>7} {:<2} {:>9.1}%",
            a.site().name,
            a.site().state,
            a.flood.score,
            &a.flood.level.to_string()[..1],
            a.landslide.score,
            &a.landslide.level.to_string()[..1],
            a.snapshot.reservoir.level_pct,
        );
    }
    println!();
    println!("{}", engine::risk_distribution(&fleet.assessments));
    if fleet.dropped() > 0 {
        println!("Dropped sites: {}", fleet.dropped());
    }

    let urgent = engine::collect_alerts(&fleet.assessments, Some(Severity::High));
    for alert in urgent {
        println!("🚨 [{}] {}", alert.id, alert.message);
    }
}

async fn run_cycle(engine: &HazardEngine, config: &Config) -> Result<()> {
    // Reloaded every cycle so registry edits are picked up without a restart
    let sites = load_sites(&config.sites.registry_path)
        .with_context(|| format!("loading site registry {}", config.sites.registry_path))?;
    tracing::info!(sites = sites.len(), batch_size = engine.batch_size(), "starting assessment cycle");

    let fleet = engine.assess_all(&sites).await;
    print_fleet(&fleet);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("loading configuration")?;

    let level = std::env::var("HAZMON_LOG_LEVEL")
        .ok()
        .and_then(|v| v.parse::<LogLevel>().ok())
        .unwrap_or(LogLevel::Info);
    let json = std::env::var("HAZMON_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");
    init_logging(level, json);

    let config_file = config_path(|key| std::env::var(key).ok());
    if Path::new(&config_file).exists() {
        tracing::info!(path = %config_file, "configuration loaded");
    } else {
        tracing::info!(path = %config_file, "no config file, using defaults");
    }

    let engine = HazardEngine::from_config(&config).context("building source clients")?;

    if std::env::args().skip(1).any(|a| a == "--verify") {
        let sites = load_sites(&config.sites.registry_path)
            .with_context(|| format!("loading site registry {}", config.sites.registry_path))?;
        let report = verify::verify_sources(engine.aggregator(), &sites).await;
        verify::print_summary(&report);
        return Ok(());
    }

    let interval = std::env::var("HAZMON_INTERVAL_SECS")
        .ok()
        .map(|v| v.trim().parse::<u64>())
        .transpose()
        .context("HAZMON_INTERVAL_SECS must be a whole number of seconds")?;

    match interval {
        None | Some(0) => run_cycle(&engine, &config).await,
        Some(secs) => {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs));
            loop {
                ticker.tick().await;
                if let Err(e) = run_cycle(&engine, &config).await {
                    tracing::error!("assessment cycle failed: {:#}", e);
                }
            }
        }
    }
}
