//! # Hypercycle Cells
//!
//! Cells, product rules, and the passing protocol of Padgett & Powell's
//! model of autocatalysis and hypercycles in production networks.
//!
//! ## Bookkeeping
//!
//! Three structures describe who owns which rules and must always agree:
//!
//! - each cell's [`RuleIndex`] (input -> output -> rule instances)
//! - each cell's [`RuleTypeAggregate`]s (instance count per rule type)
//! - the network-wide [`RuleRegistry`] (population per rule type)
//!
//! ## Conservation
//!
//! Rules are only created by reproduction, and every reproduction is paired
//! with the removal of one uniformly random rule instance somewhere in the
//! network:
//!
//! ```text
//! total_rules(after tick) == total_rules(before tick)
//! ```
//!
//! ## Reproduction Policy
//!
//! - `source`: the cell whose rule produced a usable output is rewarded
//! - `target`: the cell that used the input is rewarded

pub mod aggregate;
pub mod cell;
pub mod context;
pub mod network;
pub mod pool;
pub mod protocol;
pub mod registry;
pub mod rule;
pub mod token;

use hypercycle_common::{InventoryPruning, ReproductionPolicy, Topology};
use serde::{Deserialize, Serialize};

pub use aggregate::RuleTypeAggregate;
pub use cell::Cell;
pub use context::RunContext;
pub use network::{CellNet, Extinction};
pub use pool::TokenPool;
pub use protocol::{ReceiveOutcome, Reproduction, StepOutcome};
pub use registry::{Holding, Lifespan, Population, RuleRegistry};
pub use rule::{Rule, RuleIndex};
pub use token::{Token, TokenInventory};

/// Cell behavior parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBehavior {
    /// Whose rule is copied when a passed product is used
    pub reproduction: ReproductionPolicy,
    /// Ask the pool for exactly the needed input type
    pub intelligent: bool,
    /// Pass to grid neighbours or to anyone in the network
    pub topology: Topology,
    /// Treatment of stored products no rule can use any more
    pub pruning: InventoryPruning,
}

impl Default for CellBehavior {
    fn default() -> Self {
        Self {
            reproduction: ReproductionPolicy::Source,
            intelligent: false,
            topology: Topology::Spatial,
            pruning: InventoryPruning::ClearStack,
        }
    }
}
