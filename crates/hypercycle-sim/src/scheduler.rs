//! Random-cell scheduler
//!
//! Each tick one live cell is drawn uniformly. If it holds a stored product
//! some rule of its own can still consume, one of those rules is activated
//! (a cell works its stock first); otherwise any of its rules is. Then the
//! cell runs its initiate phase.

use hypercycle_cells::{CellNet, RunContext, StepOutcome, TokenPool};
use hypercycle_common::{NodeId, Result};
use rand::seq::SliceRandom;
use rand::RngCore;
use tracing::trace;

/// What one scheduler activation amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No live cell to activate
    Idle,
    /// The drawn cell owns no rules
    Barren { cell: NodeId },
    /// The drawn cell ran its initiate phase
    Stepped { cell: NodeId, outcome: StepOutcome },
}

/// Draw a cell, assign its active rule, and run one chain step
pub fn activate_random_cell<R: RngCore>(
    net: &mut CellNet,
    ctx: &mut RunContext<R>,
    pool: &mut dyn TokenPool,
) -> Result<Tick> {
    let live: Vec<NodeId> = net
        .cells()
        .iter()
        .filter(|c| c.is_alive())
        .map(|c| c.id())
        .collect();
    let Some(id) = live.choose(ctx.rng()).copied() else {
        return Ok(Tick::Idle);
    };

    let cell = net.cell_mut(id)?;
    let rule = match cell.has_matching_token(ctx.rng()) {
        Some(stocked) => cell.get_random_rule_of_type(stocked, ctx.rng()),
        None => cell.get_random_rule(ctx.rng()),
    };
    let Some(rule) = rule else {
        trace!(cell = %id, "Drew a cell without rules");
        return Ok(Tick::Barren { cell: id });
    };
    cell.set_active_rule(rule)?;

    let outcome = net.chain_step(id, ctx, pool)?;
    Ok(Tick::Stepped { cell: id, outcome })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::urn::Urn;
    use hypercycle_cells::{CellBehavior, Token};
    use hypercycle_common::{ProductType, RuleType, TokenId};

    #[test]
    fn test_idle_without_cells() {
        let mut net = CellNet::new();
        let mut ctx = RunContext::seeded(0);
        let mut urn = Urn::new();
        let tick = activate_random_cell(&mut net, &mut ctx, &mut urn).unwrap();
        assert_eq!(tick, Tick::Idle);
    }

    #[test]
    fn test_barren_cell() {
        let mut net = CellNet::with_cells(1, CellBehavior::default());
        let mut ctx = RunContext::seeded(0);
        let mut urn = Urn::new();
        let tick = activate_random_cell(&mut net, &mut ctx, &mut urn).unwrap();
        assert_eq!(tick, Tick::Barren { cell: NodeId(0) });
        assert_eq!(ctx.step(), 0);
    }

    #[test]
    fn test_stock_steers_rule_choice() {
        let mut net = CellNet::with_cells(2, CellBehavior::default());
        net.connect(NodeId(0), NodeId(1)).unwrap();
        net.cell_mut(NodeId(1)).unwrap().set_alive(false);
        let mut ctx = RunContext::seeded(3);
        for _ in 0..20 {
            net.seed_rule(NodeId(0), RuleType::new(1, 2), &ctx).unwrap();
        }
        net.seed_rule(NodeId(0), RuleType::new(5, 6), &ctx).unwrap();
        net.cell_mut(NodeId(0))
            .unwrap()
            .store_token(Token::new(TokenId(0), ProductType(5)));
        let mut urn = Urn::new();

        let tick = activate_random_cell(&mut net, &mut ctx, &mut urn).unwrap();
        let Tick::Stepped { cell, outcome } = tick else {
            panic!("expected a step, got {tick:?}");
        };
        assert_eq!(cell, NodeId(0));
        // The stored 5 was consumed by the 5->6 rule; the only neighbour is
        // dead so it went to the urn as a 6
        assert_eq!(outcome, StepOutcome::NoRecipient);
        assert_eq!(urn.count(ProductType(6)), 1);
    }
}
