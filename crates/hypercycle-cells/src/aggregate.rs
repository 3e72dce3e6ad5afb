//! Per-cell rule-type aggregates ("net rules")
//!
//! One aggregate exists per `(input, output)` pair a cell currently owns.
//! It is created with the first instance, counts instances while they
//! live, and is dropped when the count returns to zero.

use hypercycle_common::{NodeId, RuleType};
use serde::{Deserialize, Serialize};

/// Instance count of one rule type owned by one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTypeAggregate {
    kind: RuleType,
    owner: NodeId,
    count: usize,
    registered_at: u64,
}

impl RuleTypeAggregate {
    /// A fresh aggregate holding its first instance
    pub fn new(kind: RuleType, owner: NodeId, step: u64) -> Self {
        Self {
            kind,
            owner,
            count: 1,
            registered_at: step,
        }
    }

    pub fn kind(&self) -> RuleType {
        self.kind
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Global step at which the owner first acquired this type
    pub fn registered_at(&self) -> u64 {
        self.registered_at
    }

    pub fn add_to_count(&mut self) -> usize {
        self.count += 1;
        self.count
    }

    /// Returns the remaining count; saturates at zero.
    pub fn subtract_from_count(&mut self) -> usize {
        self.count = self.count.saturating_sub(1);
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_lifecycle() {
        let mut agg = RuleTypeAggregate::new(RuleType::new(1, 2), NodeId(0), 12);
        assert_eq!(agg.count(), 1);
        assert_eq!(agg.registered_at(), 12);

        assert_eq!(agg.add_to_count(), 2);
        assert_eq!(agg.subtract_from_count(), 1);
        assert!(!agg.is_empty());
        assert_eq!(agg.subtract_from_count(), 0);
        assert!(agg.is_empty());
        assert_eq!(agg.subtract_from_count(), 0);
    }
}
