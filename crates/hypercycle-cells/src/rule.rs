//! Product rules and the per-cell rule index
//!
//! A cell may own many instances of the same `(input, output)` pair. The
//! index keeps them in a two-level map (input, then output) whose leaves
//! are insertion-ordered buckets. Empty buckets and empty input levels are
//! removed as soon as they empty, so `accepts(input)` is a key lookup.
//!
//! Random selection is uniform over *instances*, not over rule types: a
//! type with three live copies is three times as likely to be drawn as a
//! type with one.

use std::collections::BTreeMap;

use hypercycle_common::{ProductType, RuleId, RuleType};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// An immutable rule instance with identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    id: RuleId,
    kind: RuleType,
}

impl Rule {
    pub fn new(id: RuleId, kind: RuleType) -> Self {
        Self { id, kind }
    }

    #[inline]
    pub fn id(&self) -> RuleId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> RuleType {
        self.kind
    }

    #[inline]
    pub fn input(&self) -> ProductType {
        self.kind.input
    }

    #[inline]
    pub fn output(&self) -> ProductType {
        self.kind.output
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.id, self.kind)
    }
}

/// Two-level keyed container: input type -> output type -> rule instances
#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    by_input: BTreeMap<ProductType, BTreeMap<ProductType, Vec<Rule>>>,
}

impl RuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule to its bucket, creating levels on demand.
    ///
    /// Returns the bucket length after insertion.
    pub fn insert(&mut self, rule: Rule) -> usize {
        let bucket = self
            .by_input
            .entry(rule.input())
            .or_default()
            .entry(rule.output())
            .or_default();
        bucket.push(rule);
        bucket.len()
    }

    /// Remove one specific instance.
    ///
    /// Returns the bucket length remaining after removal, or `None` if the
    /// instance is not in this index. The output leaf is dropped when it
    /// empties, and the input level with it if that was its last leaf.
    pub fn remove(&mut self, rule: &Rule) -> Option<usize> {
        let outputs = self.by_input.get_mut(&rule.input())?;
        let bucket = outputs.get_mut(&rule.output())?;
        let position = bucket.iter().position(|held| held.id == rule.id)?;
        bucket.remove(position);

        let remaining = bucket.len();
        if remaining == 0 {
            outputs.remove(&rule.output());
            if outputs.is_empty() {
                self.by_input.remove(&rule.input());
            }
        }
        Some(remaining)
    }

    pub fn contains(&self, rule: &Rule) -> bool {
        self.bucket(rule.kind()).iter().any(|held| held.id == rule.id)
    }

    /// Whether any rule consumes `input`
    pub fn accepts(&self, input: ProductType) -> bool {
        self.by_input.contains_key(&input)
    }

    /// All instances of one rule type, in insertion order
    pub fn bucket(&self, kind: RuleType) -> &[Rule] {
        self.by_input
            .get(&kind.input)
            .and_then(|outputs| outputs.get(&kind.output))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of instances, counted from the buckets themselves
    pub fn len(&self) -> usize {
        self.by_input
            .values()
            .flat_map(|outputs| outputs.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_input.is_empty()
    }

    /// Every instance, flattened in key order
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.by_input
            .values()
            .flat_map(|outputs| outputs.values())
            .flatten()
    }

    /// Instances accepting `input`, flattened in key order
    pub fn iter_input(&self, input: ProductType) -> impl Iterator<Item = &Rule> {
        self.by_input
            .get(&input)
            .into_iter()
            .flat_map(|outputs| outputs.values())
            .flatten()
    }

    /// Rule types present with their instance counts
    pub fn kinds(&self) -> impl Iterator<Item = (RuleType, usize)> + '_ {
        self.by_input.iter().flat_map(|(input, outputs)| {
            outputs
                .iter()
                .map(move |(output, bucket)| (RuleType::new(*input, *output), bucket.len()))
        })
    }

    /// Input types with at least one rule
    pub fn inputs(&self) -> impl Iterator<Item = ProductType> + '_ {
        self.by_input.keys().copied()
    }

    /// Uniform draw over every instance
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Rule> {
        pick_nth(self.iter(), self.len(), rng)
    }

    /// Uniform draw over instances accepting `input`
    pub fn choose_of_input<R: Rng + ?Sized>(
        &self,
        input: ProductType,
        rng: &mut R,
    ) -> Option<Rule> {
        let total = self.iter_input(input).count();
        pick_nth(self.iter_input(input), total, rng)
    }

    /// Uniform draw within one bucket
    pub fn choose_of_kind<R: Rng + ?Sized>(&self, kind: RuleType, rng: &mut R) -> Option<Rule> {
        let bucket = self.bucket(kind);
        pick_nth(bucket.iter(), bucket.len(), rng)
    }
}

fn pick_nth<'a, R: Rng + ?Sized>(
    mut rules: impl Iterator<Item = &'a Rule>,
    total: usize,
    rng: &mut R,
) -> Option<Rule> {
    if total == 0 {
        return None;
    }
    rules.nth(rng.gen_range(0..total)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rule(id: u64, input: u32, output: u32) -> Rule {
        Rule::new(RuleId(id), RuleType::new(input, output))
    }

    #[test]
    fn test_insert_creates_levels() {
        let mut index = RuleIndex::new();
        assert_eq!(index.insert(rule(0, 1, 2)), 1);
        assert_eq!(index.insert(rule(1, 1, 2)), 2);
        assert_eq!(index.insert(rule(2, 1, 3)), 1);

        assert!(index.accepts(ProductType(1)));
        assert!(!index.accepts(ProductType(2)));
        assert_eq!(index.len(), 3);
        assert_eq!(index.bucket(RuleType::new(1, 2)).len(), 2);
    }

    #[test]
    fn test_remove_cleans_empty_levels() {
        let mut index = RuleIndex::new();
        let a = rule(0, 1, 2);
        let b = rule(1, 1, 3);
        index.insert(a);
        index.insert(b);

        assert_eq!(index.remove(&a), Some(0));
        assert!(index.bucket(a.kind()).is_empty());
        assert!(index.accepts(ProductType(1)));

        assert_eq!(index.remove(&b), Some(0));
        assert!(!index.accepts(ProductType(1)));
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_absent_instance() {
        let mut index = RuleIndex::new();
        index.insert(rule(0, 1, 2));

        // Same type, different identity
        assert_eq!(index.remove(&rule(5, 1, 2)), None);
        assert_eq!(index.remove(&rule(0, 4, 2)), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_insertion_order_kept() {
        let mut index = RuleIndex::new();
        index.insert(rule(3, 1, 2));
        index.insert(rule(1, 1, 2));
        let ids: Vec<_> = index.iter().map(|r| r.id().0).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_choose_empty() {
        let index = RuleIndex::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(index.choose(&mut rng).is_none());
        assert!(index.choose_of_input(ProductType(1), &mut rng).is_none());
    }

    #[test]
    fn test_choose_of_input_restricted() {
        let mut index = RuleIndex::new();
        index.insert(rule(0, 1, 2));
        index.insert(rule(1, 2, 3));
        index.insert(rule(2, 2, 4));

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let picked = index.choose_of_input(ProductType(2), &mut rng).unwrap();
            assert_eq!(picked.input(), ProductType(2));
        }
    }

    #[test]
    fn test_choose_of_input_weighted_by_instances() {
        let mut index = RuleIndex::new();
        for id in 0..3 {
            index.insert(rule(id, 2, 3));
        }
        index.insert(rule(3, 2, 4));
        index.insert(rule(4, 1, 2));

        let mut rng = StdRng::seed_from_u64(19);
        let trials = 10_000;
        let heavy = (0..trials)
            .filter(|_| {
                index.choose_of_input(ProductType(2), &mut rng).unwrap().kind()
                    == RuleType::new(2, 3)
            })
            .count();
        let share = heavy as f64 / trials as f64;
        assert!((share - 0.75).abs() < 0.02, "2-3 share {share}");
    }

    #[test]
    fn test_kinds_counts() {
        let mut index = RuleIndex::new();
        index.insert(rule(0, 1, 2));
        index.insert(rule(1, 1, 2));
        index.insert(rule(2, 3, 1));
        let kinds: Vec<_> = index.kinds().collect();
        assert_eq!(
            kinds,
            vec![(RuleType::new(1, 2), 2), (RuleType::new(3, 1), 1)]
        );
    }
}
