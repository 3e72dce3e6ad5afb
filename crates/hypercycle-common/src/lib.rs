//! # Hypercycle Common
//!
//! Shared identifiers, behavior parameters, and errors for the hypercycle
//! simulation (Padgett & Powell's model of autocatalysis in production
//! networks).
//!
//! ## Core Types
//!
//! - [`ProductType`]: the kind of a token flowing between cells
//! - [`RuleType`]: an `(input, output)` transformation pair
//! - [`NodeId`], [`RuleId`], [`TokenId`]: instance identities
//! - [`ReproductionPolicy`], [`Topology`], [`InventoryPruning`]: per-cell
//!   behavior parameters
//!
//! ## Errors
//!
//! - [`HypercycleError`]: unified error type
//! - [`ArgumentError`]: usage errors raised at the call site
//! - [`ConsistencyError`]: bookkeeping violations, always fatal

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ArgumentError, ConsistencyError, HypercycleError, Result};
pub use types::{
    behavior::{InventoryPruning, ReproductionPolicy, Topology},
    ids::{IdCounter, NodeId, ProductType, RuleId, TokenId},
    rule_type::RuleType,
};

/// Global steps between progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 20_000;

/// Smallest chemistry that can form a cycle
pub const MIN_PRODUCT_TYPES: u32 = 2;
