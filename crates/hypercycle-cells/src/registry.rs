//! Global rule registry
//!
//! Tracks, for every rule type ever seen, how many instances exist across
//! the whole network and which cells hold them. Cells report every change
//! to their aggregates here, so for each type the registry total always
//! equals the sum of the per-cell aggregate counts.
//!
//! The registry also keeps lifespan records: when a cell loses its last
//! instance of a type, the aggregate is retired with the step it was
//! registered at and the step it died at.

use std::collections::BTreeMap;

use hypercycle_common::{ConsistencyError, NodeId, RuleType};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::RuleTypeAggregate;

/// One cell's stake in a rule type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub count: usize,
    pub since: u64,
}

/// Network-wide population of one rule type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Population {
    /// Instances alive across all cells
    pub total: usize,
    /// Cells currently holding the type
    pub holders: BTreeMap<NodeId, Holding>,
    /// Step the type first appeared anywhere
    pub first_seen: u64,
    /// Step of the most recent change to the type's population
    pub last_seen: u64,
    /// Step the last instance anywhere was removed, if it is gone
    pub extinct_at: Option<u64>,
}

impl Population {
    fn new(step: u64) -> Self {
        Self {
            total: 0,
            holders: BTreeMap::new(),
            first_seen: step,
            last_seen: step,
            extinct_at: None,
        }
    }

    pub fn is_extinct(&self) -> bool {
        self.total == 0
    }
}

/// A retired per-cell aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifespan {
    pub kind: RuleType,
    pub owner: NodeId,
    pub registered_at: u64,
    pub retired_at: u64,
}

impl Lifespan {
    pub fn duration(&self) -> u64 {
        self.retired_at.saturating_sub(self.registered_at)
    }
}

/// Rule type -> population metadata
///
/// Lifespan records are append-only: every retirement adds one and nothing
/// trims them, so they grow with run length for the final report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRegistry {
    populations: BTreeMap<RuleType, Population>,
    lifespans: Vec<Lifespan>,
    total: usize,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created aggregate
    pub fn register(
        &mut self,
        aggregate: &RuleTypeAggregate,
        step: u64,
    ) -> Result<(), ConsistencyError> {
        let kind = aggregate.kind();
        let owner = aggregate.owner();
        let population = self
            .populations
            .entry(kind)
            .or_insert_with(|| Population::new(step));

        if population.holders.contains_key(&owner) {
            return Err(ConsistencyError::AlreadyRegistered { node: owner, kind });
        }

        if population.extinct_at.take().is_some() {
            debug!(%kind, step, "Rule type reappeared");
        }
        population.holders.insert(
            owner,
            Holding {
                count: aggregate.count(),
                since: aggregate.registered_at(),
            },
        );
        population.total += aggregate.count();
        population.last_seen = step;
        self.total += aggregate.count();
        Ok(())
    }

    /// One more instance of `kind` on `owner`
    pub fn increment(
        &mut self,
        kind: RuleType,
        owner: NodeId,
        step: u64,
    ) -> Result<(), ConsistencyError> {
        let population = self
            .populations
            .get_mut(&kind)
            .ok_or(ConsistencyError::NotRegistered { node: owner, kind })?;
        let holding = population
            .holders
            .get_mut(&owner)
            .ok_or(ConsistencyError::NotRegistered { node: owner, kind })?;

        holding.count += 1;
        population.total += 1;
        population.last_seen = step;
        self.total += 1;
        Ok(())
    }

    /// One fewer instance of `kind` on `owner`; returns the owner's remainder
    pub fn decrement(
        &mut self,
        kind: RuleType,
        owner: NodeId,
        step: u64,
    ) -> Result<usize, ConsistencyError> {
        let population = self
            .populations
            .get_mut(&kind)
            .ok_or(ConsistencyError::NotRegistered { node: owner, kind })?;
        let holding = population
            .holders
            .get_mut(&owner)
            .filter(|holding| holding.count > 0)
            .ok_or(ConsistencyError::NotRegistered { node: owner, kind })?;

        holding.count -= 1;
        population.total -= 1;
        population.last_seen = step;
        self.total -= 1;
        Ok(holding.count)
    }

    /// Retire `owner`'s aggregate of `kind` once its count is zero
    pub fn retire(
        &mut self,
        kind: RuleType,
        owner: NodeId,
        step: u64,
    ) -> Result<Lifespan, ConsistencyError> {
        let population = self
            .populations
            .get_mut(&kind)
            .ok_or(ConsistencyError::NotRegistered { node: owner, kind })?;

        let holding = match population.holders.get(&owner).copied() {
            Some(holding) if holding.count == 0 => holding,
            Some(holding) => {
                return Err(ConsistencyError::RegistryMismatch {
                    kind,
                    registry: holding.count,
                    cells: 0,
                })
            }
            None => return Err(ConsistencyError::NotRegistered { node: owner, kind }),
        };

        population.holders.remove(&owner);
        population.last_seen = step;
        if population.total == 0 {
            population.extinct_at = Some(step);
            debug!(%kind, step, "Rule type extinct");
        }

        let lifespan = Lifespan {
            kind,
            owner,
            registered_at: holding.since,
            retired_at: step,
        };
        self.lifespans.push(lifespan);
        Ok(lifespan)
    }

    /// Pick the owner and type of one uniformly random rule instance
    ///
    /// Each `(type, owner)` holding is weighted by its instance count, so a
    /// follow-up uniform pick inside the owner's bucket makes the overall
    /// draw uniform over every instance in the network.
    pub fn draw_random_for_extinction<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Option<(NodeId, RuleType)> {
        if self.total == 0 {
            return None;
        }

        let mut target = rng.gen_range(0..self.total);
        for (kind, population) in &self.populations {
            if target >= population.total {
                target -= population.total;
                continue;
            }
            for (owner, holding) in &population.holders {
                if target < holding.count {
                    return Some((*owner, *kind));
                }
                target -= holding.count;
            }
        }
        None
    }

    /// Instances alive across the network
    pub fn total_rules(&self) -> usize {
        self.total
    }

    /// Instances of one type alive across the network
    pub fn count(&self, kind: RuleType) -> usize {
        self.populations.get(&kind).map_or(0, |p| p.total)
    }

    pub fn population(&self, kind: RuleType) -> Option<&Population> {
        self.populations.get(&kind)
    }

    pub fn populations(&self) -> impl Iterator<Item = (&RuleType, &Population)> {
        self.populations.iter()
    }

    /// Types with at least one live instance
    pub fn living_types(&self) -> impl Iterator<Item = RuleType> + '_ {
        self.populations
            .iter()
            .filter(|(_, p)| !p.is_extinct())
            .map(|(kind, _)| *kind)
    }

    pub fn lifespans(&self) -> &[Lifespan] {
        &self.lifespans
    }
}
