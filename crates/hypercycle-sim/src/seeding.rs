//! Initial rule endowment
//!
//! Deals `rules_per_cell` freshly minted rules to every cell before the
//! first tick. Seeding happens at step 0 and goes through the normal
//! bookkeeping, so the registry starts out consistent with the cells.

use std::fmt;
use std::str::FromStr;

use hypercycle_cells::{CellNet, RunContext};
use hypercycle_common::{ArgumentError, NodeId, Result, RuleType};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RuleSettings;

/// How initial rule types are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Chemistry {
    /// Round-robin over the cycle `k -> k+1 (mod n)`
    #[default]
    Solo,
    /// Uniformly random pairs with `input != output`
    Random,
}

impl fmt::Display for Chemistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chemistry::Solo => write!(f, "solo"),
            Chemistry::Random => write!(f, "random"),
        }
    }
}

impl FromStr for Chemistry {
    type Err = ArgumentError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solo" => Ok(Chemistry::Solo),
            "random" => Ok(Chemistry::Random),
            other => Err(ArgumentError::UnknownVariant {
                parameter: "chemistry",
                value: other.to_string(),
            }),
        }
    }
}

impl Chemistry {
    /// The `nth` rule type dealt in a chemistry of `product_types` types
    pub fn rule_type<R: Rng + ?Sized>(&self, nth: u64, product_types: u32, rng: &mut R) -> RuleType {
        match self {
            Chemistry::Solo => {
                let input = (nth % u64::from(product_types)) as u32;
                RuleType::new(input, (input + 1) % product_types)
            }
            Chemistry::Random => {
                let input = rng.gen_range(0..product_types);
                let mut output = rng.gen_range(0..product_types - 1);
                if output >= input {
                    output += 1;
                }
                RuleType::new(input, output)
            }
        }
    }
}

/// Deal the initial rules to every cell
pub fn seed_rules<R: RngCore>(
    net: &mut CellNet,
    settings: &RuleSettings,
    ctx: &mut RunContext<R>,
) -> Result<usize> {
    let mut dealt = 0u64;
    for index in 0..net.len() {
        for _ in 0..settings.rules_per_cell {
            let kind = settings
                .chemistry
                .rule_type(dealt, settings.product_types, ctx.rng());
            net.seed_rule(NodeId(index), kind, ctx)?;
            dealt += 1;
        }
    }
    debug!(rules = dealt, chemistry = %settings.chemistry, "Seeded rules");
    Ok(dealt as usize)
}
