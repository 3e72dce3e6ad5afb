//! Cells: the nodes of the production network
//!
//! A cell owns a rule index, one aggregate per rule type it holds, a token
//! inventory, and its place in the topology. Every rule added or removed
//! goes through [`Cell::add_rule`] / [`Cell::remove_rule`], which keep the
//! index, the aggregates, the cell's rule counter, and the global registry
//! in step with each other.

use std::collections::BTreeMap;

use hypercycle_common::{ArgumentError, ConsistencyError, NodeId, ProductType, Result, RuleType};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::aggregate::RuleTypeAggregate;
use crate::registry::RuleRegistry;
use crate::rule::{Rule, RuleIndex};
use crate::token::{Token, TokenInventory};
use crate::CellBehavior;

/// A node of the network
#[derive(Debug)]
pub struct Cell {
    id: NodeId,
    location: Option<(usize, usize)>,
    neighbors: Vec<NodeId>,
    rules: RuleIndex,
    aggregates: BTreeMap<RuleType, RuleTypeAggregate>,
    inventory: TokenInventory,
    rule_count: usize,
    active_rule: Option<Rule>,
    is_alive: bool,
    behavior: CellBehavior,
}

impl Cell {
    /// A live cell with no rules, no tokens, and no place yet
    pub fn new(id: NodeId, behavior: CellBehavior) -> Self {
        Self {
            id,
            location: None,
            neighbors: Vec::new(),
            rules: RuleIndex::new(),
            aggregates: BTreeMap::new(),
            inventory: TokenInventory::new(),
            rule_count: 0,
            active_rule: None,
            is_alive: true,
            behavior,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn behavior(&self) -> &CellBehavior {
        &self.behavior
    }

    pub fn is_alive(&self) -> bool {
        self.is_alive
    }

    pub fn set_alive(&mut self, alive: bool) {
        self.is_alive = alive;
    }

    // ============ Topology ============

    pub fn set_location(&mut self, x: usize, y: usize) {
        self.location = Some((x, y));
    }

    pub fn location(&self) -> Option<(usize, usize)> {
        self.location
    }

    /// Add a contact; adding an existing neighbour is a no-op.
    pub fn add_neighbor(&mut self, neighbor: NodeId) -> Result<()> {
        if neighbor == self.id {
            return Err(ArgumentError::SelfNeighbour { node: self.id }.into());
        }
        if !self.neighbors.contains(&neighbor) {
            self.neighbors.push(neighbor);
        }
        Ok(())
    }

    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    /// Uniform draw over the neighbour set
    ///
    /// `excluding` is dropped from the candidates when it is a neighbour
    /// (no pass-backs). When it is not a neighbour the draw goes ahead over
    /// the full set. `None` means there was nobody left to pick.
    pub fn pick_neighbor<R: Rng + ?Sized>(
        &self,
        excluding: Option<NodeId>,
        rng: &mut R,
    ) -> Result<Option<NodeId>> {
        match excluding {
            Some(node) if node == self.id => {
                Err(ArgumentError::SelfExclusion { node: self.id }.into())
            }
            Some(node) if self.neighbors.contains(&node) => {
                let candidates: Vec<NodeId> = self
                    .neighbors
                    .iter()
                    .copied()
                    .filter(|n| *n != node)
                    .collect();
                Ok(candidates.choose(rng).copied())
            }
            _ => Ok(self.neighbors.choose(rng).copied()),
        }
    }

    // ============ Rule bookkeeping ============

    /// Take ownership of a rule instance.
    ///
    /// Bumps the matching aggregate, or creates and registers one if this
    /// is the cell's first instance of the type.
    pub fn add_rule(&mut self, rule: Rule, registry: &mut RuleRegistry, step: u64) -> Result<()> {
        if self.rules.contains(&rule) {
            return Err(ArgumentError::DuplicateRule {
                node: self.id,
                rule: rule.id(),
            }
            .into());
        }

        let kind = rule.kind();
        match self.aggregates.get_mut(&kind) {
            Some(aggregate) => {
                registry.increment(kind, self.id, step)?;
                aggregate.add_to_count();
            }
            None => {
                let aggregate = RuleTypeAggregate::new(kind, self.id, step);
                registry.register(&aggregate, step)?;
                self.aggregates.insert(kind, aggregate);
            }
        }

        self.rules.insert(rule);
        self.rule_count += 1;
        Ok(())
    }

    /// Give up a specific rule instance.
    ///
    /// Fails without touching anything if the instance is not owned here.
    /// Losing the last instance of a type drops the aggregate and retires
    /// it in the registry at `step`.
    pub fn remove_rule(
        &mut self,
        rule: &Rule,
        registry: &mut RuleRegistry,
        step: u64,
    ) -> Result<Rule> {
        let kind = rule.kind();
        if !self.rules.contains(rule) {
            return Err(ConsistencyError::RuleNotOwned {
                node: self.id,
                rule: rule.id(),
                kind,
            }
            .into());
        }
        let aggregate = self
            .aggregates
            .get_mut(&kind)
            .ok_or(ConsistencyError::MissingAggregate {
                node: self.id,
                kind,
            })?;

        registry.decrement(kind, self.id, step)?;
        let remaining = aggregate.subtract_from_count();
        self.rules.remove(rule);
        self.rule_count -= 1;

        if self.active_rule.map_or(false, |active| active.id() == rule.id()) {
            self.active_rule = None;
        }

        if remaining == 0 {
            self.aggregates.remove(&kind);
            let lifespan = registry.retire(kind, self.id, step)?;
            debug!(
                cell = %self.id,
                %kind,
                lived = lifespan.duration(),
                "Cell lost its last rule of type"
            );
        }
        Ok(*rule)
    }

    /// Whether some rule consumes `kind`
    pub fn has_rule(&self, kind: ProductType) -> bool {
        self.rules.accepts(kind)
    }

    /// Uniform draw over individual instances (heavier types win more)
    pub fn get_random_rule<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Rule> {
        self.rules.choose(rng)
    }

    /// Uniform draw over instances accepting `input`
    pub fn get_random_rule_of_type<R: Rng + ?Sized>(
        &self,
        input: ProductType,
        rng: &mut R,
    ) -> Option<Rule> {
        self.rules.choose_of_input(input, rng)
    }

    /// Uniform draw within one `(input, output)` bucket
    pub fn get_random_rule_of_kind<R: Rng + ?Sized>(
        &self,
        kind: RuleType,
        rng: &mut R,
    ) -> Option<Rule> {
        self.rules.choose_of_kind(kind, rng)
    }

    pub fn rules(&self) -> &RuleIndex {
        &self.rules
    }

    pub fn aggregates(&self) -> impl Iterator<Item = &RuleTypeAggregate> {
        self.aggregates.values()
    }

    pub fn aggregate(&self, kind: RuleType) -> Option<&RuleTypeAggregate> {
        self.aggregates.get(&kind)
    }

    /// The cell's own rule counter
    pub fn count_rules(&self) -> usize {
        self.rule_count
    }

    // ============ Active rule ============

    /// Mark an owned instance as the rule in use
    pub fn set_active_rule(&mut self, rule: Rule) -> Result<()> {
        if !self.rules.contains(&rule) {
            return Err(ConsistencyError::RuleNotOwned {
                node: self.id,
                rule: rule.id(),
                kind: rule.kind(),
            }
            .into());
        }
        self.active_rule = Some(rule);
        Ok(())
    }

    pub fn active_rule(&self) -> Option<Rule> {
        self.active_rule
    }

    pub fn clear_active_rule(&mut self) -> Option<Rule> {
        self.active_rule.take()
    }

    // ============ Inventory ============

    pub fn store_token(&mut self, token: Token) {
        self.inventory.store(token);
    }

    pub fn take_token(&mut self, kind: ProductType) -> Option<Token> {
        self.inventory.take(kind)
    }

    /// A stored type some rule here can still consume
    pub fn has_matching_token<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<ProductType> {
        self.inventory
            .has_matching_token(&self.rules, self.behavior.pruning, rng)
    }

    pub fn inventory(&self) -> &TokenInventory {
        &self.inventory
    }

    /// Check the cell's own bookkeeping
    ///
    /// Rule counter, indexed instances, and aggregate counts must agree,
    /// and every indexed type must have an aggregate and vice versa.
    pub fn audit(&self) -> std::result::Result<(), ConsistencyError> {
        let indexed = self.rules.len();
        if indexed != self.rule_count {
            return Err(ConsistencyError::RuleCountMismatch {
                node: self.id,
                counted: self.rule_count,
                indexed,
            });
        }

        for (kind, bucket_len) in self.rules.kinds() {
            let aggregate = self
                .aggregates
                .get(&kind)
                .ok_or(ConsistencyError::MissingAggregate {
                    node: self.id,
                    kind,
                })?;
            if aggregate.count() != bucket_len {
                return Err(ConsistencyError::AggregateMismatch {
                    node: self.id,
                    kind,
                    aggregate: aggregate.count(),
                    indexed: bucket_len,
                });
            }
        }

        for aggregate in self.aggregates.values() {
            if self.rules.bucket(aggregate.kind()).is_empty() {
                return Err(ConsistencyError::AggregateMismatch {
                    node: self.id,
                    kind: aggregate.kind(),
                    aggregate: aggregate.count(),
                    indexed: 0,
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell with {} rules", self.rule_count)
    }
}
