//! Net Balance Calculator
//!
//! Reduces the acyclic residual graph to one signed balance per participant:
//! positive = net creditor (is owed), negative = net debtor (owes).
//!
//! All arithmetic is exact i64, never floating point, so the conservation
//! invariant (balances sum to zero) can be checked for equality.

use std::collections::BTreeMap;

use crate::models::debt::PartyId;
use crate::netting::{DebtGraph, NettingError};

/// Signed net position per party, sorted by `PartyId`.
pub type NetBalance = BTreeMap<PartyId, i64>;

/// Fold every edge into per-party balances.
///
/// # Example
///
/// ```rust
/// use settlement_engine_core_rs::{Debt, netting::{net_balances, DebtGraph}};
///
/// let graph = DebtGraph::build(&[
///     Debt::new("alice", "bob", 70),
///     Debt::new("carol", "alice", 70),
/// ])
/// .unwrap();
///
/// let balances = net_balances(&graph);
/// assert_eq!(balances["alice"], 0);
/// assert_eq!(balances["bob"], 70);
/// assert_eq!(balances["carol"], -70);
/// ```
pub fn net_balances(graph: &DebtGraph) -> NetBalance {
    let mut balances = NetBalance::new();

    for (debtor, creditor, amount) in graph.edges() {
        *balances.entry(creditor.clone()).or_insert(0) += amount;
        *balances.entry(debtor.clone()).or_insert(0) -= amount;
    }

    balances
}

/// Verify the zero-sum conservation post-condition.
///
/// A nonzero sum means a netting step corrupted balances. That is a logic
/// bug, so the whole computation aborts rather than silently correcting.
pub fn verify_zero_sum(balances: &NetBalance, context: &'static str) -> Result<(), NettingError> {
    let sum: i64 = balances.values().sum();
    if sum != 0 {
        return Err(NettingError::ConservationViolation {
            context,
            detail: format!("balances sum to {sum}, expected 0"),
        });
    }
    Ok(())
}

/// Verify that two balance vectors agree on every party (absent = zero).
///
/// Used after each cycle subtraction: a cycle's net effect on every vertex is
/// exactly zero, so the balance vector must be unchanged.
pub fn verify_balances_unchanged(
    before: &NetBalance,
    after: &NetBalance,
    context: &'static str,
) -> Result<(), NettingError> {
    let parties = before.keys().chain(after.keys());

    for party in parties {
        let expected = before.get(party).copied().unwrap_or(0);
        let actual = after.get(party).copied().unwrap_or(0);
        if expected != actual {
            return Err(NettingError::ConservationViolation {
                context,
                detail: format!("party {party} moved from {expected} to {actual}"),
            });
        }
    }

    Ok(())
}
