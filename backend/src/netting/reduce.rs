//! Cycle Reducer
//!
//! Repeatedly eliminates cycles from the debt graph, netting out circular
//! obligations: find a cycle, subtract the cycle minimum from every edge on
//! it, drop zeroed edges, repeat until acyclic.
//!
//! Termination: every iteration subtracts the cycle minimum, which zeroes at
//! least one edge, so total edge weight strictly decreases and is bounded
//! below by zero. Worst case O(E²) iterations, acceptable for group sizes in
//! the tens to low hundreds.
//!
//! # Critical Invariants
//!
//! A cycle subtraction is net-zero per vertex: each cycle member loses the
//! minimum as debtor on one edge and gains it as creditor on the next. The
//! per-party balance vector is re-checked after every iteration; a mismatch
//! aborts with `ConservationViolation`.

use tracing::debug;

use crate::netting::{
    find_cycle, net_balances, verify_balances_unchanged, DebtGraph, NettingError,
};

/// Statistics from one reduction pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionStats {
    /// Number of cycles eliminated
    pub cycles_eliminated: usize,

    /// Total edge weight removed across all cycle subtractions
    pub value_netted: i64,

    /// Edges remaining in the acyclic residual graph
    pub residual_edges: usize,
}

/// Reduce the graph until acyclic.
///
/// Running on an already-acyclic graph is a no-op and returns zeroed stats.
///
/// # Example
///
/// ```rust
/// use settlement_engine_core_rs::{Debt, netting::{reduce_cycles, DebtGraph}};
///
/// // A full cycle nets to nothing at all
/// let mut graph = DebtGraph::build(&[
///     Debt::new("alice", "bob", 100),
///     Debt::new("bob", "carol", 100),
///     Debt::new("carol", "alice", 100),
/// ])
/// .unwrap();
///
/// let stats = reduce_cycles(&mut graph).unwrap();
/// assert!(graph.is_empty());
/// assert_eq!(stats.cycles_eliminated, 1);
/// ```
pub fn reduce_cycles(graph: &mut DebtGraph) -> Result<ReductionStats, NettingError> {
    let baseline = net_balances(graph);

    let mut cycles_eliminated = 0;
    let mut value_netted = 0i64;

    while let Some(cycle) = find_cycle(graph) {
        let minimum = cycle
            .windows(2)
            .map(|hop| {
                graph
                    .amount(&hop[0], &hop[1])
                    .expect("cycle hop must have a supporting edge")
            })
            .min()
            .expect("cycle has at least two vertices");

        for hop in cycle.windows(2) {
            graph.subtract(&hop[0], &hop[1], minimum);
        }

        cycles_eliminated += 1;
        value_netted += minimum * (cycle.len() - 1) as i64;

        debug!(
            cycle_len = cycle.len() - 1,
            netted = minimum,
            "eliminated debt cycle"
        );

        let current = net_balances(graph);
        verify_balances_unchanged(&baseline, &current, "cycle reduction")?;
    }

    Ok(ReductionStats {
        cycles_eliminated,
        value_netted,
        residual_edges: graph.edge_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::debt::Debt;

    fn graph(debts: &[(&str, &str, i64)]) -> DebtGraph {
        let debts: Vec<Debt> = debts
            .iter()
            .map(|(debtor, creditor, amount)| Debt::new(*debtor, *creditor, *amount))
            .collect();
        DebtGraph::build(&debts).unwrap()
    }

    #[test]
    fn test_full_cycle_reduces_to_empty() {
        let mut g = graph(&[
            ("alice", "bob", 100),
            ("bob", "carol", 100),
            ("carol", "alice", 100),
        ]);

        let stats = reduce_cycles(&mut g).unwrap();

        assert!(g.is_empty());
        assert_eq!(stats.cycles_eliminated, 1);
        assert_eq!(stats.value_netted, 300);
        assert_eq!(stats.residual_edges, 0);
    }

    #[test]
    fn test_partial_cycle_leaves_residual() {
        let mut g = graph(&[
            ("alice", "bob", 100),
            ("bob", "carol", 30),
            ("carol", "alice", 100),
        ]);

        reduce_cycles(&mut g).unwrap();

        assert_eq!(g.amount("alice", "bob"), Some(70));
        assert_eq!(g.amount("carol", "alice"), Some(70));
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_acyclic_graph_unchanged() {
        let mut g = graph(&[("alice", "bob", 40), ("bob", "carol", 10)]);
        let before = g.clone();

        let stats = reduce_cycles(&mut g).unwrap();

        assert_eq!(g, before);
        assert_eq!(stats.cycles_eliminated, 0);
        assert_eq!(stats.value_netted, 0);
    }

    #[test]
    fn test_overlapping_cycles_terminate() {
        // Two cycles sharing the alice -> bob edge
        let mut g = graph(&[
            ("alice", "bob", 100),
            ("bob", "alice", 40),
            ("bob", "carol", 60),
            ("carol", "alice", 60),
        ]);

        let baseline = net_balances(&g);
        let stats = reduce_cycles(&mut g).unwrap();

        assert!(stats.cycles_eliminated >= 2);
        assert_eq!(find_cycle(&g), None);
        verify_balances_unchanged(&baseline, &net_balances(&g), "test").unwrap();
    }
}
