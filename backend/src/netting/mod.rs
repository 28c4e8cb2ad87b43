//! Debt Netting Pipeline
//!
//! Pure, synchronous computation that turns a snapshot of active debts into
//! a minimal settlement plan:
//!
//! ```text
//! debts ──▶ DebtGraph ──▶ reduce_cycles ──▶ net_balances ──▶ instructions
//! ```
//!
//! Everything here is side-effect free and single-threaded over an immutable
//! snapshot; independent settlement groups can be planned in parallel.
//!
//! # Critical Invariants
//!
//! 1. **Conservation**: per-party balances are unchanged by every cycle
//!    subtraction, sum to zero after netting, and are reproduced exactly by
//!    the generated instructions. Each checkpoint is verified; a violation is
//!    a logic bug and aborts the run loudly.
//! 2. **Determinism**: the same debt snapshot (in any order) produces the
//!    same plan.
//! 3. All money values are i64 (drops)
//!
//! # Example
//!
//! ```rust
//! use settlement_engine_core_rs::{Debt, netting::plan_settlement};
//!
//! // alice owes bob 100, bob owes carol 30, carol owes alice 100
//! let plan = plan_settlement(&[
//!     Debt::new("alice", "bob", 100),
//!     Debt::new("bob", "carol", 30),
//!     Debt::new("carol", "alice", 100),
//! ])
//! .unwrap();
//!
//! // The 30-cycle nets away; one transfer settles the group
//! assert_eq!(plan.instructions.len(), 1);
//! assert_eq!(plan.instructions[0].from, "carol");
//! assert_eq!(plan.instructions[0].to, "bob");
//! assert_eq!(plan.instructions[0].amount, 70);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::debt::{Debt, PartyId};
use crate::models::proposal::SettlementInstruction;

pub mod cycles;
pub mod graph;
pub mod instructions;
pub mod nets;
pub mod reduce;

// Re-export public API
pub use cycles::find_cycle;
pub use graph::DebtGraph;
pub use instructions::{generate_instructions, replay_instructions, verify_instructions};
pub use nets::{net_balances, verify_balances_unchanged, verify_zero_sum, NetBalance};
pub use reduce::{reduce_cycles, ReductionStats};

/// Malformed debt input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidDebtError {
    #[error("self-loop debt: {party} cannot owe itself")]
    SelfLoop { party: PartyId },

    #[error("negative debt amount {amount} from {debtor} to {creditor}")]
    NegativeAmount {
        debtor: PartyId,
        creditor: PartyId,
        amount: i64,
    },
}

/// Errors from the netting pipeline
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NettingError {
    #[error("invalid debt: {0}")]
    InvalidDebt(#[from] InvalidDebtError),

    /// All balances already net to zero; there is nothing to transfer
    #[error("all balances are already settled")]
    NothingToSettle,

    /// Internal invariant failure. Never a user error: it must not occur
    /// under a correct implementation and aborts the settlement run.
    #[error("conservation violated during {context}: {detail}")]
    ConservationViolation {
        context: &'static str,
        detail: String,
    },
}

/// Output of one netting run over a debt snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Minimal transfer instructions, in generation order
    pub instructions: Vec<SettlementInstruction>,

    /// Net position per party after reduction
    pub net_balances: NetBalance,

    /// Cycles eliminated during reduction
    pub cycles_eliminated: usize,

    /// Total edge weight removed by cycle netting
    pub value_netted: i64,
}

/// Run the full pipeline: build, reduce, net, generate, verify.
///
/// A plan with zero instructions is a valid result (every obligation was
/// circular); refusing to settle an empty plan is the coordinator's call.
pub fn plan_settlement(debts: &[Debt]) -> Result<SettlementPlan, NettingError> {
    let mut graph = DebtGraph::build(debts)?;
    let stats = reduce_cycles(&mut graph)?;

    let balances = net_balances(&graph);
    verify_zero_sum(&balances, "net balance calculation")?;

    let instructions = generate_instructions(&balances);
    verify_instructions(&balances, &instructions)?;

    debug!(
        parties = balances.len(),
        cycles = stats.cycles_eliminated,
        instructions = instructions.len(),
        "settlement plan computed"
    );

    Ok(SettlementPlan {
        instructions,
        net_balances: balances,
        cycles_eliminated: stats.cycles_eliminated,
        value_netted: stats.value_netted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle_plans_to_nothing() {
        let plan = plan_settlement(&[
            Debt::new("alice", "bob", 100),
            Debt::new("bob", "carol", 100),
            Debt::new("carol", "alice", 100),
        ])
        .unwrap();

        assert!(plan.instructions.is_empty());
        assert_eq!(plan.cycles_eliminated, 1);
        assert!(plan.net_balances.values().all(|&net| net == 0));
    }

    #[test]
    fn test_invalid_debt_propagates() {
        let err = plan_settlement(&[Debt::new("alice", "alice", 10)]).unwrap_err();
        assert!(matches!(err, NettingError::InvalidDebt(_)));
    }

    #[test]
    fn test_plan_is_deterministic_across_input_order() {
        let debts = vec![
            Debt::new("alice", "bob", 100),
            Debt::new("bob", "carol", 30),
            Debt::new("carol", "alice", 100),
            Debt::new("dan", "alice", 25),
        ];
        let mut reversed = debts.clone();
        reversed.reverse();

        assert_eq!(
            plan_settlement(&debts).unwrap(),
            plan_settlement(&reversed).unwrap()
        );
    }
}
