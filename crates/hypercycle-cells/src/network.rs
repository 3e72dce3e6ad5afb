//! The cell network
//!
//! `CellNet` owns every cell and the global rule registry. Cells never
//! hold a handle back to the network; anything that needs more than one
//! cell (passing, reproduction, extinction) is a `CellNet` method taking
//! the cell's id and the run context.

use hypercycle_common::{
    ArgumentError, ConsistencyError, IdCounter, NodeId, Result, RuleId, RuleType,
};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use tracing::debug;

use crate::cell::Cell;
use crate::context::RunContext;
use crate::registry::RuleRegistry;
use crate::rule::Rule;
use crate::CellBehavior;

/// Outcome of one global extinction draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extinction {
    pub owner: NodeId,
    pub rule: Rule,
}

/// All cells plus the global registry
#[derive(Debug, Default)]
pub struct CellNet {
    cells: Vec<Cell>,
    registry: RuleRegistry,
    rule_ids: IdCounter,
}

impl CellNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `count` cells sharing one behavior
    pub fn with_cells(count: usize, behavior: CellBehavior) -> Self {
        let mut net = Self::new();
        for _ in 0..count {
            net.add_cell(behavior);
        }
        net
    }

    pub fn add_cell(&mut self, behavior: CellBehavior) -> NodeId {
        let id = NodeId(self.cells.len());
        self.cells.push(Cell::new(id, behavior));
        id
    }

    pub fn cell(&self, id: NodeId) -> Result<&Cell> {
        self.cells
            .get(id.index())
            .ok_or_else(|| ArgumentError::UnknownNode(id).into())
    }

    pub fn cell_mut(&mut self, id: NodeId) -> Result<&mut Cell> {
        self.cells
            .get_mut(id.index())
            .ok_or_else(|| ArgumentError::UnknownNode(id).into())
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    // ============ Topology ============

    pub fn set_location(&mut self, id: NodeId, x: usize, y: usize) -> Result<()> {
        self.cell_mut(id)?.set_location(x, y);
        Ok(())
    }

    /// Wire an undirected contact between two cells
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        self.cell(b)?;
        self.cell_mut(a)?.add_neighbor(b)?;
        self.cell_mut(b)?.add_neighbor(a)?;
        Ok(())
    }

    /// Uniform draw over live cells other than `excluding`
    pub fn get_random_cell<R: Rng + ?Sized>(
        &self,
        excluding: NodeId,
        rng: &mut R,
    ) -> Option<NodeId> {
        let candidates: Vec<NodeId> = self
            .cells
            .iter()
            .filter(|cell| cell.is_alive() && cell.id() != excluding)
            .map(Cell::id)
            .collect();
        candidates.choose(rng).copied()
    }

    // ============ Rule bookkeeping ============

    /// A rule instance with a fresh identity
    pub fn mint_rule(&mut self, kind: RuleType) -> Rule {
        Rule::new(RuleId(self.rule_ids.next_value()), kind)
    }

    /// Hand a freshly minted rule of `kind` to a cell
    pub fn seed_rule<R: RngCore>(
        &mut self,
        id: NodeId,
        kind: RuleType,
        ctx: &RunContext<R>,
    ) -> Result<Rule> {
        self.cell(id)?;
        let rule = self.mint_rule(kind);
        self.cells[id.index()].add_rule(rule, &mut self.registry, ctx.step())?;
        Ok(rule)
    }

    /// Route a removal through the owning cell
    pub fn remove_rule<R: RngCore>(
        &mut self,
        owner: NodeId,
        rule: &Rule,
        ctx: &RunContext<R>,
    ) -> Result<Rule> {
        self.cell(owner)?;
        self.cells[owner.index()].remove_rule(rule, &mut self.registry, ctx.step())
    }

    /// Copy the cell's active rule onto itself, then remove one random
    /// rule instance from the whole network.
    ///
    /// The pair leaves the network's rule total unchanged.
    pub fn reproduce_active_rule<R: RngCore>(
        &mut self,
        id: NodeId,
        ctx: &mut RunContext<R>,
    ) -> Result<Extinction> {
        let active = self
            .cell(id)?
            .active_rule()
            .ok_or(ArgumentError::NoActiveRule { node: id })?;

        let copy = self.mint_rule(active.kind());
        self.cells[id.index()].add_rule(copy, &mut self.registry, ctx.step())?;
        ctx.mark_rule_added();
        debug!(cell = %id, rule = %copy, "Reproduced rule");

        self.remove_random_rule(ctx)?
            .ok_or_else(|| {
                ConsistencyError::NotRegistered {
                    node: id,
                    kind: active.kind(),
                }
                .into()
            })
    }

    /// Remove one uniformly random rule instance from the whole network
    pub fn remove_random_rule<R: RngCore>(
        &mut self,
        ctx: &mut RunContext<R>,
    ) -> Result<Option<Extinction>> {
        let Some((owner, kind)) = self.registry.draw_random_for_extinction(ctx.rng()) else {
            return Ok(None);
        };
        let cell = self.cell(owner)?;
        let rule = cell
            .get_random_rule_of_kind(kind, ctx.rng())
            .ok_or(ConsistencyError::MissingAggregate { node: owner, kind })?;

        self.cells[owner.index()].remove_rule(&rule, &mut self.registry, ctx.step())?;
        debug!(cell = %owner, rule = %rule, "Removed rule");
        Ok(Some(Extinction { owner, rule }))
    }

    // ============ Read-only accessors ============

    /// Rule instances across the network, counted cell by cell
    pub fn total_rules(&self) -> usize {
        self.cells.iter().map(Cell::count_rules).sum()
    }

    /// Cells still holding at least one rule
    pub fn cells_with_rules(&self) -> usize {
        self.cells.iter().filter(|c| c.count_rules() > 0).count()
    }

    /// Instances of `kind` summed over the cells' aggregates
    pub fn count_of(&self, kind: RuleType) -> usize {
        self.cells
            .iter()
            .filter_map(|c| c.aggregate(kind))
            .map(|a| a.count())
            .sum()
    }

    /// Check every cell and the registry against each other
    pub fn audit(&self) -> std::result::Result<(), ConsistencyError> {
        for cell in &self.cells {
            cell.audit()?;
            for aggregate in cell.aggregates() {
                let held = self
                    .registry
                    .population(aggregate.kind())
                    .and_then(|p| p.holders.get(&cell.id()))
                    .ok_or(ConsistencyError::NotRegistered {
                        node: cell.id(),
                        kind: aggregate.kind(),
                    })?;
                if held.count != aggregate.count() {
                    return Err(ConsistencyError::RegistryMismatch {
                        kind: aggregate.kind(),
                        registry: held.count,
                        cells: aggregate.count(),
                    });
                }
            }
        }

        for (kind, population) in self.registry.populations() {
            let cells = self.count_of(*kind);
            if population.total != cells {
                return Err(ConsistencyError::RegistryMismatch {
                    kind: *kind,
                    registry: population.total,
                    cells,
                });
            }
        }

        let cells = self.total_rules();
        if self.registry.total_rules() != cells {
            return Err(ConsistencyError::NetworkTotalMismatch {
                registry: self.registry.total_rules(),
                cells,
            });
        }
        Ok(())
    }
}
