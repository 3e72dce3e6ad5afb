//! Per-cell behavior parameters
//!
//! These are the key parameters of the model. They are fixed per cell at
//! construction and never change during a run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ArgumentError;

/// Which cell is rewarded when a passed token is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReproductionPolicy {
    /// The sender's active rule is copied (it produced a usable output)
    #[default]
    Source,
    /// A random compatible rule of the recipient is copied (it used the input)
    Target,
}

impl fmt::Display for ReproductionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReproductionPolicy::Source => write!(f, "source"),
            ReproductionPolicy::Target => write!(f, "target"),
        }
    }
}

impl FromStr for ReproductionPolicy {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" => Ok(ReproductionPolicy::Source),
            "target" => Ok(ReproductionPolicy::Target),
            other => Err(ArgumentError::UnknownVariant {
                parameter: "reproduction policy",
                value: other.to_string(),
            }),
        }
    }
}

/// How a cell picks the recipient of a transformed token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// A random grid neighbour
    #[default]
    Spatial,
    /// A random cell from the whole network
    Nonspatial,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Spatial => write!(f, "spatial"),
            Topology::Nonspatial => write!(f, "nonspatial"),
        }
    }
}

impl FromStr for Topology {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spatial" => Ok(Topology::Spatial),
            "nonspatial" | "non-spatial" | "non_spatial" => Ok(Topology::Nonspatial),
            other => Err(ArgumentError::UnknownVariant {
                parameter: "topology",
                value: other.to_string(),
            }),
        }
    }
}

/// What happens to stored tokens whose type no rule can consume any more
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InventoryPruning {
    /// Empty the stack but keep the type key
    #[default]
    ClearStack,
    /// Remove the type key entirely
    RemoveKey,
}

impl FromStr for InventoryPruning {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear_stack" | "clear" => Ok(InventoryPruning::ClearStack),
            "remove_key" | "remove" => Ok(InventoryPruning::RemoveKey),
            other => Err(ArgumentError::UnknownVariant {
                parameter: "inventory pruning",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy() {
        assert_eq!("Target".parse::<ReproductionPolicy>().unwrap(), ReproductionPolicy::Target);
        assert_eq!(" source ".parse::<ReproductionPolicy>().unwrap(), ReproductionPolicy::Source);
        assert!("both".parse::<ReproductionPolicy>().is_err());
    }

    #[test]
    fn test_parse_topology() {
        assert_eq!("non-spatial".parse::<Topology>().unwrap(), Topology::Nonspatial);
        assert_eq!(Topology::Spatial.to_string(), "spatial");
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&InventoryPruning::RemoveKey).unwrap();
        assert_eq!(json, "\"remove_key\"");
    }
}
