//! The passing protocol
//!
//! One tick: the scheduler assigns an active rule to a cell and calls
//! [`CellNet::chain_step`]. The cell finds an input (own stock first, then
//! the pool), transforms it, and hands it to a recipient, which runs
//! [`CellNet::receive_product`]. A recipient that can use the product keeps
//! it and triggers one reproduction (whose, depends on the reproduction
//! policy); one that cannot sends it back to the pool.
//!
//! ```text
//! Idle -> Initiating -> Applying -> Dispatching
//!                                      |
//!                      recipient: Receiving -> Reproducing | Rejecting -> Idle
//! ```

use hypercycle_common::{ArgumentError, NodeId, ProductType, ReproductionPolicy, Result, Topology};
use rand::RngCore;
use tracing::debug;

use crate::context::RunContext;
use crate::network::{CellNet, Extinction};
use crate::pool::TokenPool;
use crate::rule::Rule;
use crate::token::Token;

/// A rule copied and the instance removed to pay for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reproduction {
    /// Cell whose rule was copied
    pub cell: NodeId,
    /// The rule that served as template
    pub template: Rule,
    pub removed: Extinction,
}

/// What the recipient did with a passed product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Stored; a rule somewhere was reproduced
    Accepted { reproduction: Reproduction },
    /// Nothing here consumes it; it went back to the pool
    Rejected,
}

impl ReceiveOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ReceiveOutcome::Accepted { .. })
    }
}

/// What one initiating step amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// No input was available: a dead tick
    NoProduct { wanted: ProductType },
    /// The pool handed out something the rule cannot consume; it went back
    Mismatched {
        wanted: ProductType,
        offered: ProductType,
    },
    /// Nobody to pass to; the product went back to the pool
    NoRecipient,
    /// The product reached a recipient
    Passed {
        recipient: NodeId,
        consumed: ProductType,
        produced: ProductType,
        receipt: ReceiveOutcome,
    },
}

impl CellNet {
    /// Initiate phase for the cell holding the active rule
    pub fn chain_step<R: RngCore>(
        &mut self,
        id: NodeId,
        ctx: &mut RunContext<R>,
        pool: &mut dyn TokenPool,
    ) -> Result<StepOutcome> {
        let cell = self.cell(id)?;
        let active = cell
            .active_rule()
            .ok_or(ArgumentError::NoActiveRule { node: id })?;
        let behavior = *cell.behavior();

        ctx.advance();

        let wanted = active.input();
        let stocked = self.cell_mut(id)?.take_token(wanted);
        let token = match stocked {
            Some(token) => Some(token),
            None => pool.request(wanted, behavior.intelligent, ctx.rng()),
        };

        let Some(mut token) = token else {
            debug!(cell = %id, %wanted, "Didn't get the right product");
            return Ok(StepOutcome::NoProduct { wanted });
        };

        if !active.kind().accepts(token.kind()) {
            let offered = token.kind();
            debug!(cell = %id, %wanted, %offered, "Drew an unusable product");
            pool.return_token(token);
            return Ok(StepOutcome::Mismatched { wanted, offered });
        }

        let consumed = token.apply_rule(&active);
        let produced = token.kind();

        let recipient = match behavior.topology {
            Topology::Spatial => self.cell(id)?.pick_neighbor(None, ctx.rng())?,
            Topology::Nonspatial => self.get_random_cell(id, ctx.rng()),
        };
        let Some(recipient) = recipient.filter(|r| self.cells()[r.index()].is_alive()) else {
            debug!(cell = %id, "No recipient for product");
            pool.return_token(token);
            return Ok(StepOutcome::NoRecipient);
        };

        let receipt = self.receive_product(recipient, id, token, consumed, ctx, pool)?;
        Ok(StepOutcome::Passed {
            recipient,
            consumed,
            produced,
            receipt,
        })
    }

    /// Receive phase: `recipient` is handed `token` by `sender`.
    ///
    /// `consumed` is the type the token had before the sender transformed
    /// it; it is only used for diagnostics.
    pub fn receive_product<R: RngCore>(
        &mut self,
        recipient: NodeId,
        sender: NodeId,
        token: Token,
        consumed: ProductType,
        ctx: &mut RunContext<R>,
        pool: &mut dyn TokenPool,
    ) -> Result<ReceiveOutcome> {
        ctx.advance();

        let cell = self.cell(recipient)?;
        let kind = token.kind();
        if !cell.has_rule(kind) {
            debug!(
                from = %sender,
                to = %recipient,
                product = %kind,
                "Passed product but nothing could be done"
            );
            pool.return_token(token);
            return Ok(ReceiveOutcome::Rejected);
        }

        let policy = cell.behavior().reproduction;
        let reproduction = match policy {
            ReproductionPolicy::Target => {
                let chosen = cell
                    .get_random_rule_of_type(kind, ctx.rng())
                    .ok_or(ArgumentError::NoActiveRule { node: recipient })?;
                self.cell_mut(recipient)?.set_active_rule(chosen)?;
                let removed = self.reproduce_active_rule(recipient, ctx)?;
                self.cell_mut(recipient)?.clear_active_rule();
                Reproduction {
                    cell: recipient,
                    template: chosen,
                    removed,
                }
            }
            ReproductionPolicy::Source => {
                let template = self
                    .cell(sender)?
                    .active_rule()
                    .ok_or(ArgumentError::NoActiveRule { node: sender })?;
                let removed = self.reproduce_active_rule(sender, ctx)?;
                self.cell_mut(sender)?.clear_active_rule();
                Reproduction {
                    cell: sender,
                    template,
                    removed,
                }
            }
        };

        debug!(
            from = %sender,
            to = %recipient,
            %consumed,
            product = %kind,
            "Passed product was used"
        );
        self.cell_mut(recipient)?.store_token(token);
        Ok(ReceiveOutcome::Accepted { reproduction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellBehavior;
    use hypercycle_common::{RuleType, TokenId};

    /// Pool that hands out a fixed queue and records returns
    #[derive(Default)]
    struct QueuePool {
        queue: Vec<Token>,
        returned: Vec<Token>,
    }

    impl TokenPool for QueuePool {
        fn request(
            &mut self,
            kind: ProductType,
            intelligent: bool,
            _rng: &mut dyn RngCore,
        ) -> Option<Token> {
            let position = if intelligent {
                self.queue.iter().position(|t| t.kind() == kind)?
            } else if self.queue.is_empty() {
                return None;
            } else {
                0
            };
            Some(self.queue.remove(position))
        }

        fn return_token(&mut self, token: Token) {
            self.returned.push(token);
        }
    }

    fn behavior(reproduction: ReproductionPolicy) -> CellBehavior {
        CellBehavior {
            reproduction,
            intelligent: true,
            ..CellBehavior::default()
        }
    }

    fn pair(reproduction: ReproductionPolicy) -> (CellNet, RunContext) {
        let mut net = CellNet::with_cells(2, behavior(reproduction));
        net.connect(NodeId(0), NodeId(1)).unwrap();
        (net, RunContext::seeded(8))
    }

    fn activate(net: &mut CellNet, id: NodeId, kind: RuleType, ctx: &RunContext) -> Rule {
        let rule = net.seed_rule(id, kind, ctx).unwrap();
        net.cell_mut(id).unwrap().set_active_rule(rule).unwrap();
        rule
    }

    #[test]
    fn test_chain_step_requires_active_rule() {
        let (mut net, mut ctx) = pair(ReproductionPolicy::Source);
        let mut pool = QueuePool::default();
        assert!(net.chain_step(NodeId(0), &mut ctx, &mut pool).is_err());
        assert_eq!(ctx.step(), 0);
    }

    #[test]
    fn test_dead_tick_without_product() {
        let (mut net, mut ctx) = pair(ReproductionPolicy::Source);
        activate(&mut net, NodeId(0), RuleType::new(1, 2), &ctx);
        let mut pool = QueuePool::default();

        let outcome = net.chain_step(NodeId(0), &mut ctx, &mut pool).unwrap();
        assert_eq!(outcome, StepOutcome::NoProduct { wanted: ProductType(1) });
        assert_eq!(ctx.step(), 1);
        assert_eq!(net.total_rules(), 1);
    }

    #[test]
    fn test_stock_used_before_pool() {
        let (mut net, mut ctx) = pair(ReproductionPolicy::Source);
        activate(&mut net, NodeId(0), RuleType::new(1, 2), &ctx);
        net.cell_mut(NodeId(0))
            .unwrap()
            .store_token(Token::new(TokenId(50), ProductType(1)));
        let mut pool = QueuePool::default();

        let outcome = net.chain_step(NodeId(0), &mut ctx, &mut pool).unwrap();
        assert!(matches!(outcome, StepOutcome::Passed { .. }));
        assert_eq!(net.cell(NodeId(0)).unwrap().inventory().count(ProductType(1)), 0);
        assert_eq!(pool.returned.len(), 1);
        assert_eq!(pool.returned[0].id(), TokenId(50));
        assert_eq!(pool.returned[0].kind(), ProductType(2));
    }

    #[test]
    fn test_unintelligent_mismatch_goes_back() {
        let mut net = CellNet::with_cells(2, CellBehavior::default());
        net.connect(NodeId(0), NodeId(1)).unwrap();
        let mut ctx = RunContext::seeded(8);
        activate(&mut net, NodeId(0), RuleType::new(1, 2), &ctx);
        let mut pool = QueuePool {
            queue: vec![Token::new(TokenId(0), ProductType(7))],
            ..QueuePool::default()
        };

        let outcome = net.chain_step(NodeId(0), &mut ctx, &mut pool).unwrap();
        assert_eq!(
            outcome,
            StepOutcome::Mismatched {
                wanted: ProductType(1),
                offered: ProductType(7)
            }
        );
        assert_eq!(pool.returned[0].kind(), ProductType(7));
    }

    #[test]
    fn test_source_policy_rewards_sender() {
        let (mut net, mut ctx) = pair(ReproductionPolicy::Source);
        let sender_rule = activate(&mut net, NodeId(0), RuleType::new(1, 2), &ctx);
        // Padding so the extinction draw has somewhere else to land
        for _ in 0..5 {
            net.seed_rule(NodeId(1), RuleType::new(2, 3), &ctx).unwrap();
        }
        let mut pool = QueuePool {
            queue: vec![Token::new(TokenId(0), ProductType(1))],
            ..QueuePool::default()
        };
        let total = net.total_rules();

        let outcome = net.chain_step(NodeId(0), &mut ctx, &mut pool).unwrap();
        let StepOutcome::Passed { recipient, receipt, .. } = outcome else {
            panic!("expected a pass, got {outcome:?}");
        };
        assert_eq!(recipient, NodeId(1));
        let ReceiveOutcome::Accepted { reproduction } = receipt else {
            panic!("expected acceptance");
        };
        assert_eq!(reproduction.cell, NodeId(0));
        assert_eq!(reproduction.template, sender_rule);

        // The sender gained a copy of its 1->2 rule unless the extinction
        // draw took one of those back
        let removed = reproduction.removed;
        let sender_lost = usize::from(removed.owner == NodeId(0));
        let recipient_lost = usize::from(removed.owner == NodeId(1));
        let sender_bucket = net.cell(NodeId(0)).unwrap().rules().bucket(sender_rule.kind());
        assert_eq!(sender_bucket.len(), 2 - sender_lost);
        if removed.rule != sender_rule {
            assert!(sender_bucket.contains(&sender_rule));
        }
        // The recipient's rules only change through the extinction draw
        let recipient = net.cell(NodeId(1)).unwrap();
        assert_eq!(
            recipient.rules().bucket(RuleType::new(2, 3)).len(),
            5 - recipient_lost
        );
        assert_eq!(recipient.count_rules(), 5 - recipient_lost);

        assert_eq!(net.total_rules(), total);
        assert!(net.cell(NodeId(0)).unwrap().active_rule().is_none());
        assert_eq!(net.cell(NodeId(1)).unwrap().inventory().count(ProductType(2)), 1);
        assert_eq!(ctx.step(), 2);
        net.audit().unwrap();
    }

    #[test]
    fn test_target_policy_rewards_recipient() {
        let (mut net, mut ctx) = pair(ReproductionPolicy::Target);
        activate(&mut net, NodeId(0), RuleType::new(1, 2), &ctx);
        net.seed_rule(NodeId(1), RuleType::new(2, 3), &ctx).unwrap();
        let mut pool = QueuePool {
            queue: vec![Token::new(TokenId(0), ProductType(1))],
            ..QueuePool::default()
        };

        let outcome = net.chain_step(NodeId(0), &mut ctx, &mut pool).unwrap();
        let StepOutcome::Passed { receipt, .. } = outcome else {
            panic!("expected a pass, got {outcome:?}");
        };
        let ReceiveOutcome::Accepted { reproduction } = receipt else {
            panic!("expected acceptance");
        };
        assert_eq!(reproduction.cell, NodeId(1));
        assert_eq!(reproduction.template.kind(), RuleType::new(2, 3));
        assert!(net.cell(NodeId(1)).unwrap().active_rule().is_none());
        // The sender keeps its active rule under the target policy
        if reproduction.removed.owner != NodeId(0) {
            assert!(net.cell(NodeId(0)).unwrap().active_rule().is_some());
        }
        assert_eq!(net.total_rules(), 2);
        net.audit().unwrap();
    }

    #[test]
    fn test_rejection_returns_product_unchanged() {
        let (mut net, mut ctx) = pair(ReproductionPolicy::Target);
        net.seed_rule(NodeId(1), RuleType::new(2, 3), &ctx).unwrap();
        let mut pool = QueuePool::default();

        let outcome = net
            .receive_product(
                NodeId(1),
                NodeId(0),
                Token::new(TokenId(4), ProductType(5)),
                ProductType(4),
                &mut ctx,
                &mut pool,
            )
            .unwrap();

        assert_eq!(outcome, ReceiveOutcome::Rejected);
        assert_eq!(pool.returned, vec![Token::new(TokenId(4), ProductType(5))]);
        let cell = net.cell(NodeId(1)).unwrap();
        assert!(cell.inventory().is_empty());
        assert_eq!(cell.count_rules(), 1);
        assert_eq!(ctx.step(), 1);
    }

    #[test]
    fn test_no_recipient_returns_product() {
        let mut net = CellNet::with_cells(1, behavior(ReproductionPolicy::Source));
        let mut ctx = RunContext::seeded(8);
        activate(&mut net, NodeId(0), RuleType::new(1, 2), &ctx);
        let mut pool = QueuePool {
            queue: vec![Token::new(TokenId(0), ProductType(1))],
            ..QueuePool::default()
        };

        let outcome = net.chain_step(NodeId(0), &mut ctx, &mut pool).unwrap();
        assert_eq!(outcome, StepOutcome::NoRecipient);
        assert_eq!(pool.returned.len(), 1);
    }
}
