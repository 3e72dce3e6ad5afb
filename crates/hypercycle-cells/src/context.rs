//! Run context: the global step counter and the run's random source
//!
//! Every protocol call takes the context explicitly. Nothing in the crate
//! reaches for an ambient generator, so a run is reproducible from its seed.

use hypercycle_common::DEFAULT_PROGRESS_INTERVAL;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::info;

/// Step counter plus random source threaded through a run
#[derive(Debug, Clone)]
pub struct RunContext<R = StdRng> {
    step: u64,
    last_added_rule: Option<u64>,
    progress_interval: u64,
    rng: R,
}

impl RunContext<StdRng> {
    /// Context over a seeded standard generator
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> RunContext<R> {
    pub fn new(rng: R) -> Self {
        Self {
            step: 0,
            last_added_rule: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            rng,
        }
    }

    /// Steps between progress lines; zero disables them
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Advance the global step counter and return the new step
    pub fn advance(&mut self) -> u64 {
        self.step += 1;
        if self.progress_interval > 0 && self.step % self.progress_interval == 0 {
            info!(step = self.step, "steps");
        }
        self.step
    }

    #[inline]
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Step of the most recent reproduction
    pub fn last_added_rule(&self) -> Option<u64> {
        self.last_added_rule
    }

    pub(crate) fn mark_rule_added(&mut self) {
        self.last_added_rule = Some(self.step);
    }

    #[inline]
    pub fn rng(&mut self) -> &mut R {
        &mut self.rng
    }
}
