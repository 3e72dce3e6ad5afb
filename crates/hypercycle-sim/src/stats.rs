//! Run statistics
//!
//! Per-tick outcomes are folded into [`PassCounters`]; every
//! `sample_interval` ticks the collector takes a [`Snapshot`] of the
//! network. The final [`RunReport`] is what the binary writes out.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hypercycle_cells::{CellNet, Lifespan, ReceiveOutcome, RunContext, StepOutcome};
use hypercycle_common::RuleType;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::SimConfig;
use crate::scheduler::Tick;
use crate::urn::Urn;

/// Running totals of tick outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassCounters {
    /// Scheduler activations
    pub ticks: u64,
    /// No live cell, or the drawn cell had no rules
    pub idle: u64,
    /// Products that reached a recipient
    pub passes: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Initiating cell found no input
    pub no_product: u64,
    /// Input of the wrong type drawn from the urn
    pub mismatched: u64,
    pub no_recipient: u64,
}

impl PassCounters {
    pub fn record(&mut self, tick: &Tick) {
        self.ticks += 1;
        match tick {
            Tick::Idle | Tick::Barren { .. } => self.idle += 1,
            Tick::Stepped { outcome, .. } => match outcome {
                StepOutcome::NoProduct { .. } => self.no_product += 1,
                StepOutcome::Mismatched { .. } => self.mismatched += 1,
                StepOutcome::NoRecipient => self.no_recipient += 1,
                StepOutcome::Passed { receipt, .. } => {
                    self.passes += 1;
                    match receipt {
                        ReceiveOutcome::Accepted { .. } => self.accepted += 1,
                        ReceiveOutcome::Rejected => self.rejected += 1,
                    }
                }
            },
        }
    }

    /// Share of passes the recipient could use
    pub fn acceptance_rate(&self) -> f64 {
        if self.passes == 0 {
            0.0
        } else {
            self.accepted as f64 / self.passes as f64
        }
    }
}

/// State of the network at one point in the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    /// Global protocol step
    pub step: u64,
    pub total_rules: usize,
    /// Rule types with at least one live instance
    pub living_types: usize,
    pub cells_with_rules: usize,
    /// Tokens sitting in the urn
    pub urn_tokens: usize,
    /// Tokens stored in cell inventories
    pub stored_tokens: usize,
    pub counters: PassCounters,
    /// Live instances per rule type, keyed `"input-output"`
    pub type_counts: BTreeMap<String, usize>,
}

impl Snapshot {
    pub fn take<R: RngCore>(
        tick: u64,
        net: &CellNet,
        urn: &Urn,
        ctx: &RunContext<R>,
        counters: PassCounters,
    ) -> Self {
        let registry = net.registry();
        let type_counts = registry
            .living_types()
            .map(|kind| (kind.to_string(), registry.count(kind)))
            .collect::<BTreeMap<_, _>>();
        Self {
            tick,
            step: ctx.step(),
            total_rules: registry.total_rules(),
            living_types: type_counts.len(),
            cells_with_rules: net.cells_with_rules(),
            urn_tokens: urn.len(),
            stored_tokens: net.cells().iter().map(|c| c.inventory().len()).sum(),
            counters,
            type_counts,
        }
    }
}

/// Network-wide history of one rule type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub kind: RuleType,
    pub total: usize,
    pub holders: usize,
    pub first_seen: u64,
    pub extinct_at: Option<u64>,
}

/// Collects counters and periodic snapshots over a run
#[derive(Debug, Clone)]
pub struct StatsCollector {
    sample_interval: u64,
    counters: PassCounters,
    samples: Vec<Snapshot>,
}

impl StatsCollector {
    pub fn new(sample_interval: u64) -> Self {
        Self {
            sample_interval,
            counters: PassCounters::default(),
            samples: Vec::new(),
        }
    }

    /// Fold one tick in; returns whether a sample is now due
    pub fn record(&mut self, tick: &Tick) -> bool {
        self.counters.record(tick);
        self.sample_interval > 0 && self.counters.ticks % self.sample_interval == 0
    }

    pub fn sample<R: RngCore>(
        &mut self,
        net: &CellNet,
        urn: &Urn,
        ctx: &RunContext<R>,
    ) -> &Snapshot {
        let snapshot = Snapshot::take(self.counters.ticks, net, urn, ctx, self.counters);
        debug!(
            tick = snapshot.tick,
            rules = snapshot.total_rules,
            types = snapshot.living_types,
            "Sampled network"
        );
        self.samples.push(snapshot);
        &self.samples[self.samples.len() - 1]
    }

    pub fn counters(&self) -> &PassCounters {
        &self.counters
    }

    pub fn samples(&self) -> &[Snapshot] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Snapshot> {
        self.samples
    }
}

/// Everything a finished run reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: SimConfig,
    pub final_state: Snapshot,
    pub samples: Vec<Snapshot>,
    pub types: Vec<TypeSummary>,
    pub lifespans: Vec<Lifespan>,
}

impl RunReport {
    pub fn new(
        config: SimConfig,
        started_at: DateTime<Utc>,
        final_state: Snapshot,
        samples: Vec<Snapshot>,
        net: &CellNet,
    ) -> Self {
        let registry = net.registry();
        let types = registry
            .populations()
            .map(|(kind, population)| TypeSummary {
                kind: *kind,
                total: population.total,
                holders: population.holders.len(),
                first_seen: population.first_seen,
                extinct_at: population.extinct_at,
            })
            .collect();
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            config,
            final_state,
            samples,
            types,
            lifespans: registry.lifespans().to_vec(),
        }
    }
}
