//! Simulation configuration

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use hypercycle_cells::CellBehavior;
use hypercycle_common::{
    HypercycleError, InventoryPruning, ReproductionPolicy, Topology, DEFAULT_PROGRESS_INTERVAL,
    MIN_PRODUCT_TYPES,
};
use serde::{Deserialize, Serialize};

use crate::seeding::Chemistry;

/// Environment variable naming an optional JSON config file
pub const CONFIG_PATH_VAR: &str = "HYPERCYCLE_CONFIG";

/// Full run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimConfig {
    /// Grid shape and passing topology
    pub grid: GridSettings,
    /// Chemistry and initial rule endowment
    pub rules: RuleSettings,
    /// Initial urn contents
    pub urn: UrnSettings,
    /// Per-cell behavior parameters
    pub behavior: BehaviorSettings,
    /// Run length, seed, and reporting
    pub run: RunSettings,
}

impl SimConfig {
    /// Load configuration from `.env`, an optional JSON file, and the
    /// environment, in that order of increasing priority
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut cfg = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(&path)
                .with_context(|| format!("loading config file {path}"))?,
            Err(_) => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Read a JSON config file; missing sections take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> hypercycle_common::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply `HYPERCYCLE_*` overrides looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Grid settings
        override_from(&lookup, "HYPERCYCLE_GRID_WIDTH", &mut self.grid.width)?;
        override_from(&lookup, "HYPERCYCLE_GRID_HEIGHT", &mut self.grid.height)?;
        override_from(&lookup, "HYPERCYCLE_TOPOLOGY", &mut self.grid.topology)?;

        // Rule settings
        override_from(&lookup, "HYPERCYCLE_PRODUCT_TYPES", &mut self.rules.product_types)?;
        override_from(&lookup, "HYPERCYCLE_RULES_PER_CELL", &mut self.rules.rules_per_cell)?;
        override_from(&lookup, "HYPERCYCLE_CHEMISTRY", &mut self.rules.chemistry)?;

        // Urn settings
        override_from(&lookup, "HYPERCYCLE_TOKENS_PER_TYPE", &mut self.urn.tokens_per_type)?;

        // Behavior settings
        override_from(&lookup, "HYPERCYCLE_REPRODUCTION", &mut self.behavior.reproduction)?;
        override_from(&lookup, "HYPERCYCLE_INTELLIGENT", &mut self.behavior.intelligent)?;
        override_from(&lookup, "HYPERCYCLE_PRUNING", &mut self.behavior.pruning)?;

        // Run settings
        override_from(&lookup, "HYPERCYCLE_SEED", &mut self.run.seed)?;
        override_from(&lookup, "HYPERCYCLE_TICKS", &mut self.run.ticks)?;
        override_from(&lookup, "HYPERCYCLE_PROGRESS_INTERVAL", &mut self.run.progress_interval)?;
        override_from(&lookup, "HYPERCYCLE_SAMPLE_INTERVAL", &mut self.run.sample_interval)?;
        override_from(&lookup, "HYPERCYCLE_AUDIT", &mut self.run.audit)?;
        if let Some(path) = lookup("HYPERCYCLE_REPORT_PATH") {
            self.run.report_path = Some(path);
        }
        Ok(())
    }

    /// Reject setups the simulation cannot run
    pub fn validate(&self) -> hypercycle_common::Result<()> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(HypercycleError::Config(format!(
                "grid must have at least one cell, got {}x{}",
                self.grid.width, self.grid.height
            )));
        }
        if self.grid.topology == Topology::Spatial && self.grid.cells() < 2 {
            return Err(HypercycleError::Config(
                "spatial topology needs at least two cells".to_string(),
            ));
        }
        if self.rules.product_types < MIN_PRODUCT_TYPES {
            return Err(HypercycleError::Config(format!(
                "need at least {} product types, got {}",
                MIN_PRODUCT_TYPES, self.rules.product_types
            )));
        }
        if self.run.sample_interval == 0 {
            return Err(HypercycleError::Config(
                "sample interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Behavior shared by every cell
    pub fn cell_behavior(&self) -> CellBehavior {
        CellBehavior {
            reproduction: self.behavior.reproduction,
            intelligent: self.behavior.intelligent,
            topology: self.grid.topology,
            pruning: self.behavior.pruning,
        }
    }
}

fn override_from<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid {key}={raw}: {err}"))?;
    }
    Ok(())
}

/// Grid settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub width: usize,
    pub height: usize,
    pub topology: Topology,
}

impl GridSettings {
    pub fn cells(&self) -> usize {
        self.width * self.height
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            topology: Topology::Spatial,
        }
    }
}

/// Rule endowment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    /// Distinct product types in the chemistry
    pub product_types: u32,
    /// Rules dealt to each cell at setup
    pub rules_per_cell: usize,
    /// How initial rule types are generated
    pub chemistry: Chemistry,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            product_types: 9,
            rules_per_cell: 4,
            chemistry: Chemistry::Solo,
        }
    }
}

/// Urn settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrnSettings {
    /// Tokens of each product type in the urn at setup
    pub tokens_per_type: usize,
}

impl Default for UrnSettings {
    fn default() -> Self {
        Self {
            tokens_per_type: 200,
        }
    }
}

/// Behavior settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BehaviorSettings {
    pub reproduction: ReproductionPolicy,
    /// Selective intelligence: ask the urn for the exact input needed
    pub intelligent: bool,
    pub pruning: InventoryPruning,
}

/// Run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub seed: u64,
    /// Scheduler activations to run
    pub ticks: u64,
    /// Global steps between progress lines (0 disables)
    pub progress_interval: u64,
    /// Ticks between statistics samples
    pub sample_interval: u64,
    /// Check bookkeeping consistency at every sample
    pub audit: bool,
    /// Where to write the JSON report; stdout when unset
    pub report_path: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            seed: 1,
            ticks: 100_000,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            sample_interval: 1_000,
            audit: false,
            report_path: None,
        }
    }
}
