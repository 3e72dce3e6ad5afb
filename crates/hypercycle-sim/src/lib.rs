//! # Hypercycle Sim
//!
//! Everything around the cell network needed for a full run: grid
//! construction, the initial rule endowment, the urn of products, the
//! random-cell scheduler, and run statistics.
//!
//! ## Example
//!
//! ```no_run
//! use hypercycle_sim::{SimConfig, Simulation};
//!
//! let mut config = SimConfig::default();
//! config.run.ticks = 10_000;
//! let report = Simulation::from_config(config)?.run()?;
//! println!("{} rules left", report.final_state.total_rules);
//! # Ok::<(), hypercycle_common::HypercycleError>(())
//! ```

pub mod config;
pub mod scheduler;
pub mod seeding;
pub mod simulation;
pub mod stats;
pub mod topology;
pub mod urn;

pub use config::SimConfig;
pub use scheduler::{activate_random_cell, Tick};
pub use seeding::{seed_rules, Chemistry};
pub use simulation::Simulation;
pub use stats::{PassCounters, RunReport, Snapshot, StatsCollector, TypeSummary};
pub use topology::GridBuilder;
pub use urn::Urn;

/// Simulator version
pub const SIM_VERSION: &str = env!("CARGO_PKG_VERSION");
