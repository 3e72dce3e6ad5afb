//! A configured run: network, urn, context, and statistics together

use chrono::Utc;
use hypercycle_cells::{CellNet, RunContext};
use hypercycle_common::Result;
use tracing::{info, instrument};

use crate::config::SimConfig;
use crate::scheduler::{activate_random_cell, Tick};
use crate::seeding::seed_rules;
use crate::stats::{RunReport, Snapshot, StatsCollector};
use crate::topology::GridBuilder;
use crate::urn::Urn;

/// One simulation run
pub struct Simulation {
    config: SimConfig,
    net: CellNet,
    urn: Urn,
    ctx: RunContext,
    stats: StatsCollector,
}

impl Simulation {
    /// Build the grid, deal the rules, and fill the urn
    pub fn from_config(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let mut net = CellNet::with_cells(config.grid.cells(), config.cell_behavior());
        GridBuilder::from_settings(&config.grid).build(&mut net, config.grid.topology)?;

        let mut ctx =
            RunContext::seeded(config.run.seed).with_progress_interval(config.run.progress_interval);
        let rules = seed_rules(&mut net, &config.rules, &mut ctx)?;
        let urn = Urn::with_tokens(config.rules.product_types, config.urn.tokens_per_type);

        info!(
            cells = net.len(),
            rules,
            urn_tokens = urn.len(),
            seed = config.run.seed,
            "Simulation ready"
        );

        let stats = StatsCollector::new(config.run.sample_interval);
        Ok(Self {
            config,
            net,
            urn,
            ctx,
            stats,
        })
    }

    /// One scheduler activation
    pub fn tick(&mut self) -> Result<Tick> {
        let tick = activate_random_cell(&mut self.net, &mut self.ctx, &mut self.urn)?;
        if self.stats.record(&tick) {
            self.stats.sample(&self.net, &self.urn, &self.ctx);
            if self.config.run.audit {
                self.net.audit()?;
            }
        }
        Ok(tick)
    }

    /// Run the configured number of ticks and report
    #[instrument(skip(self), fields(seed = self.config.run.seed, ticks = self.config.run.ticks))]
    pub fn run(mut self) -> Result<RunReport> {
        let started_at = Utc::now();
        for _ in 0..self.config.run.ticks {
            self.tick()?;
        }
        self.net.audit()?;

        let final_state = self.snapshot();
        info!(
            step = final_state.step,
            rules = final_state.total_rules,
            types = final_state.living_types,
            acceptance = self.stats.counters().acceptance_rate(),
            "Run finished"
        );

        let Self {
            config, net, stats, ..
        } = self;
        Ok(RunReport::new(
            config,
            started_at,
            final_state,
            stats.into_samples(),
            &net,
        ))
    }

    /// The network as it stands now
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::take(
            self.stats.counters().ticks,
            &self.net,
            &self.urn,
            &self.ctx,
            *self.stats.counters(),
        )
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn net(&self) -> &CellNet {
        &self.net
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypercycle_common::Topology;

    fn small_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.grid.width = 4;
        config.grid.height = 4;
        config.rules.product_types = 4;
        config.rules.rules_per_cell = 3;
        config.urn.tokens_per_type = 20;
        config.run.ticks = 500;
        config.run.sample_interval = 100;
        config.run.progress_interval = 0;
        config
    }

    #[test]
    fn test_from_config_seeds_everything() {
        let sim = Simulation::from_config(small_config()).unwrap();
        assert_eq!(sim.net().len(), 16);
        assert_eq!(sim.net().total_rules(), 48);
        assert_eq!(sim.urn().len(), 80);
        assert_eq!(sim.context().step(), 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = small_config();
        config.rules.product_types = 0;
        assert!(Simulation::from_config(config).is_err());
    }

    #[test]
    fn test_run_conserves_rules() {
        let mut config = small_config();
        config.run.audit = true;
        let report = Simulation::from_config(config).unwrap().run().unwrap();

        assert_eq!(report.final_state.total_rules, 48);
        assert_eq!(report.final_state.counters.ticks, 500);
        assert_eq!(report.samples.len(), 5);
        // Pruned stock leaves the system; nothing is ever minted mid-run
        assert!(report.final_state.urn_tokens + report.final_state.stored_tokens <= 80);
    }

    #[test]
    fn test_nonspatial_run() {
        let mut config = small_config();
        config.grid.topology = Topology::Nonspatial;
        let mut sim = Simulation::from_config(config).unwrap();
        for _ in 0..200 {
            sim.tick().unwrap();
        }
        sim.net().audit().unwrap();
        assert_eq!(sim.stats().counters().no_recipient, 0);
    }
}
