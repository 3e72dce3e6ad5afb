//! Error types for the hypercycle simulation
//!
//! Provides a unified error type and the two domain-specific families:
//! usage errors raised at the call site and bookkeeping violations. Absence
//! (no token, no compatible rule) is never an error; it is an `Option`.

use thiserror::Error;

use crate::types::{
    ids::{NodeId, RuleId},
    rule_type::RuleType,
};

/// Result type alias using HypercycleError
pub type Result<T> = std::result::Result<T, HypercycleError>;

/// Unified error type for hypercycle operations
#[derive(Debug, Error)]
pub enum HypercycleError {
    // Usage errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),

    // Bookkeeping errors
    #[error("Consistency violation: {0}")]
    Consistency(#[from] ConsistencyError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl HypercycleError {
    /// Consistency violations mean upstream bookkeeping is corrupt and the
    /// run must halt for diagnosis.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HypercycleError::Consistency(_))
    }
}

/// Usage errors: a caller handed an operation something it cannot act on
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("{rule} is already held by {node}")]
    DuplicateRule { node: NodeId, rule: RuleId },

    #[error("{node} cannot exclude itself from its own neighbour draw")]
    SelfExclusion { node: NodeId },

    #[error("{node} cannot be its own neighbour")]
    SelfNeighbour { node: NodeId },

    #[error("{node} has no active rule")]
    NoActiveRule { node: NodeId },

    #[error("Unknown cell: {0}")]
    UnknownNode(NodeId),

    #[error("Unknown {parameter}: {value}")]
    UnknownVariant {
        parameter: &'static str,
        value: String,
    },
}

/// Bookkeeping violations between rule index, aggregates, and registry
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConsistencyError {
    #[error("{rule} ({kind}) does not belong to {node}")]
    RuleNotOwned {
        node: NodeId,
        rule: RuleId,
        kind: RuleType,
    },

    #[error("{node} has no aggregate for {kind}")]
    MissingAggregate { node: NodeId, kind: RuleType },

    #[error("Registry has no population entry for {kind} held by {node}")]
    NotRegistered { node: NodeId, kind: RuleType },

    #[error("{node} already registered {kind}")]
    AlreadyRegistered { node: NodeId, kind: RuleType },

    #[error("{node} counts {counted} rules but indexes {indexed}")]
    RuleCountMismatch {
        node: NodeId,
        counted: usize,
        indexed: usize,
    },

    #[error("{node} aggregate {kind} counts {aggregate} but indexes {indexed}")]
    AggregateMismatch {
        node: NodeId,
        kind: RuleType,
        aggregate: usize,
        indexed: usize,
    },

    #[error("Registry counts {registry} of {kind} but cells hold {cells}")]
    RegistryMismatch {
        kind: RuleType,
        registry: usize,
        cells: usize,
    },

    #[error("Registry counts {registry} rules in total but cells hold {cells}")]
    NetworkTotalMismatch { registry: usize, cells: usize },
}

// Implement From for common external error types
impl From<serde_json::Error> for HypercycleError {
    fn from(err: serde_json::Error) -> Self {
        HypercycleError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for HypercycleError {
    fn from(err: std::io::Error) -> Self {
        HypercycleError::Storage(err.to_string())
    }
}
