//! Rule type - the `(input, output)` pair shared by rule instances

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::ProductType;

/// A transformation capability: consume `input`, produce `output`
///
/// Many rule instances may share one rule type. Ordering is by input then
/// output, which is the order every keyed structure in the simulation
/// iterates in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RuleType {
    pub input: ProductType,
    pub output: ProductType,
}

impl RuleType {
    pub fn new(input: impl Into<ProductType>, output: impl Into<ProductType>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Whether this rule can consume a token of `kind`
    #[inline]
    pub fn accepts(&self, kind: ProductType) -> bool {
        self.input == kind
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.input, self.output)
    }
}
