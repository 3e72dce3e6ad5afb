//! Token supply and return pool (the "urn") as seen by the cells

use hypercycle_common::ProductType;
use rand::RngCore;

use crate::token::Token;

/// Source of fresh tokens and sink for unusable ones
pub trait TokenPool {
    /// Ask for a token to feed a rule consuming `kind`.
    ///
    /// With `intelligent` set the pool should only hand out `kind`; without
    /// it the pool may hand out any token it holds. `None` is a normal
    /// outcome: the step simply does not happen.
    fn request(
        &mut self,
        kind: ProductType,
        intelligent: bool,
        rng: &mut dyn RngCore,
    ) -> Option<Token>;

    /// Absorb a token nobody could use
    fn return_token(&mut self, token: Token);
}
