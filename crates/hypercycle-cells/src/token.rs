//! Products (tokens) and the per-cell token inventory

use std::collections::BTreeMap;

use hypercycle_common::{InventoryPruning, ProductType, TokenId};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::rule::{Rule, RuleIndex};

/// A product flowing between cells
///
/// Tokens are moved, never cloned: at any instant exactly one holder (a
/// cell's inventory, the pool, or the tick in flight) owns each one.
#[derive(Debug, PartialEq, Eq)]
pub struct Token {
    id: TokenId,
    kind: ProductType,
}

impl Token {
    pub fn new(id: TokenId, kind: ProductType) -> Self {
        Self { id, kind }
    }

    #[inline]
    pub fn id(&self) -> TokenId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ProductType {
        self.kind
    }

    /// Transform the token in place; returns the type it had before
    pub fn apply_rule(&mut self, rule: &Rule) -> ProductType {
        std::mem::replace(&mut self.kind, rule.output())
    }
}

/// Stacks of stored tokens keyed by type
#[derive(Debug, Default)]
pub struct TokenInventory {
    stacks: BTreeMap<ProductType, Vec<Token>>,
}

impl TokenInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a token onto the stack for its current type
    pub fn store(&mut self, token: Token) {
        self.stacks.entry(token.kind()).or_default().push(token);
    }

    /// Pop a token of `kind`, if one is stored
    pub fn take(&mut self, kind: ProductType) -> Option<Token> {
        self.stacks.get_mut(&kind).and_then(Vec::pop)
    }

    /// One stored type some rule can still consume, chosen uniformly
    ///
    /// Every eligible type has the same chance however many tokens of it are
    /// stacked. Stored types that no rule accepts any more are pruned along
    /// the way according to `pruning`.
    pub fn has_matching_token<R: Rng + ?Sized>(
        &mut self,
        rules: &RuleIndex,
        pruning: InventoryPruning,
        rng: &mut R,
    ) -> Option<ProductType> {
        match pruning {
            InventoryPruning::ClearStack => {
                for (kind, stack) in self.stacks.iter_mut() {
                    if !rules.accepts(*kind) {
                        stack.clear();
                    }
                }
            }
            InventoryPruning::RemoveKey => {
                self.stacks.retain(|kind, _| rules.accepts(*kind));
            }
        }

        let eligible: Vec<ProductType> = self
            .stacks
            .iter()
            .filter(|(_, stack)| !stack.is_empty())
            .map(|(kind, _)| *kind)
            .collect();
        eligible.choose(rng).copied()
    }

    /// Tokens stored of one type
    pub fn count(&self, kind: ProductType) -> usize {
        self.stacks.get(&kind).map_or(0, Vec::len)
    }

    /// Tokens stored in total
    pub fn len(&self) -> usize {
        self.stacks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type keys present, including emptied stacks
    pub fn kinds(&self) -> impl Iterator<Item = ProductType> + '_ {
        self.stacks.keys().copied()
    }
}
