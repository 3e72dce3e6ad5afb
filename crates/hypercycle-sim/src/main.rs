//! Hypercycle simulation binary
//!
//! Runs one simulation configured from `.env`, `HYPERCYCLE_CONFIG`, and
//! `HYPERCYCLE_*` variables, and writes the JSON report.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hypercycle_sim::{SimConfig, Simulation, SIM_VERSION};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting hypercycle simulation v{}", SIM_VERSION);

    let config = SimConfig::load()?;
    info!("Loaded configuration: {:?}", config);
    info!(
        "Grid {}x{} ({}), {} product types, {} rules per cell",
        config.grid.width,
        config.grid.height,
        config.grid.topology,
        config.rules.product_types,
        config.rules.rules_per_cell
    );
    info!(
        "Behavior: reproduction={}, intelligent={}",
        config.behavior.reproduction, config.behavior.intelligent
    );

    let report_path = config.run.report_path.clone();
    let report = Simulation::from_config(config)?.run()?;

    let json = serde_json::to_string_pretty(&report)?;
    match report_path {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing report to {path}"))?;
            info!("Report written to {}", path);
        }
        None => println!("{json}"),
    }

    info!(
        "Run {} finished: {} rules of {} types after {} steps",
        report.run_id,
        report.final_state.total_rules,
        report.final_state.living_types,
        report.final_state.step
    );
    Ok(())
}
