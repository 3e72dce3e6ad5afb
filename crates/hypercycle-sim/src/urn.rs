//! The urn: the environment's pool of products
//!
//! Products a cell cannot get from its own stock come from here, and
//! products nobody could use go back here.

use std::collections::BTreeMap;

use hypercycle_cells::{Token, TokenPool};
use hypercycle_common::{IdCounter, ProductType, TokenId};
use rand::{Rng, RngCore};
use tracing::trace;

/// Per-type stacks of available tokens
#[derive(Debug, Default)]
pub struct Urn {
    stacks: BTreeMap<ProductType, Vec<Token>>,
    token_ids: IdCounter,
    len: usize,
}

impl Urn {
    pub fn new() -> Self {
        Self::default()
    }

    /// An urn holding `per_type` fresh tokens of each of `product_types` types
    pub fn with_tokens(product_types: u32, per_type: usize) -> Self {
        let mut urn = Self::new();
        for kind in 0..product_types {
            for _ in 0..per_type {
                urn.add_fresh(ProductType(kind));
            }
        }
        urn
    }

    /// Mint a new token of `kind` into the urn
    pub fn add_fresh(&mut self, kind: ProductType) -> TokenId {
        let id = TokenId(self.token_ids.next_value());
        self.push(Token::new(id, kind));
        id
    }

    /// Tokens available of one type
    pub fn count(&self, kind: ProductType) -> usize {
        self.stacks.get(&kind).map_or(0, Vec::len)
    }

    /// Tokens available in total
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Available tokens per type
    pub fn counts(&self) -> impl Iterator<Item = (ProductType, usize)> + '_ {
        self.stacks.iter().map(|(kind, stack)| (*kind, stack.len()))
    }

    fn push(&mut self, token: Token) {
        self.stacks.entry(token.kind()).or_default().push(token);
        self.len += 1;
    }

    fn pop(&mut self, kind: ProductType) -> Option<Token> {
        let token = self.stacks.get_mut(&kind)?.pop()?;
        self.len -= 1;
        Some(token)
    }

    /// Remove one token drawn uniformly from the whole urn
    fn draw_any(&mut self, rng: &mut dyn RngCore) -> Option<Token> {
        if self.len == 0 {
            return None;
        }
        let mut target = rng.gen_range(0..self.len);
        for stack in self.stacks.values_mut() {
            if target < stack.len() {
                self.len -= 1;
                return Some(stack.swap_remove(target));
            }
            target -= stack.len();
        }
        None
    }
}

impl TokenPool for Urn {
    fn request(
        &mut self,
        kind: ProductType,
        intelligent: bool,
        rng: &mut dyn RngCore,
    ) -> Option<Token> {
        let token = if intelligent {
            self.pop(kind)
        } else {
            self.draw_any(rng)
        };
        trace!(%kind, intelligent, got = ?token.as_ref().map(Token::kind), "Urn request");
        token
    }

    fn return_token(&mut self, token: Token) {
        self.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_with_tokens() {
        let urn = Urn::with_tokens(3, 4);
        assert_eq!(urn.len(), 12);
        assert_eq!(urn.count(ProductType(2)), 4);
        assert_eq!(urn.count(ProductType(3)), 0);
    }

    #[test]
    fn test_intelligent_request_exact_type() {
        let mut urn = Urn::with_tokens(3, 1);
        let mut rng = StdRng::seed_from_u64(0);

        let token = urn.request(ProductType(1), true, &mut rng).unwrap();
        assert_eq!(token.kind(), ProductType(1));
        assert!(urn.request(ProductType(1), true, &mut rng).is_none());
        assert_eq!(urn.len(), 2);
    }

    #[test]
    fn test_unintelligent_request_any_type() {
        let mut urn = Urn::with_tokens(4, 25);
        let mut rng = StdRng::seed_from_u64(9);
        let mut other = 0;
        for _ in 0..50 {
            let token = urn.request(ProductType(0), false, &mut rng).unwrap();
            if token.kind() != ProductType(0) {
                other += 1;
            }
            urn.return_token(token);
        }
        assert!(other > 0);
        assert_eq!(urn.len(), 100);
    }

    #[test]
    fn test_empty_urn() {
        let mut urn = Urn::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(urn.request(ProductType(0), false, &mut rng).is_none());
        assert!(urn.is_empty());
    }

    #[test]
    fn test_return_token() {
        let mut urn = Urn::new();
        urn.return_token(Token::new(TokenId(40), ProductType(6)));
        assert_eq!(urn.count(ProductType(6)), 1);
        assert_eq!(urn.len(), 1);
    }
}
