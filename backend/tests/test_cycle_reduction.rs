//! Cycle Reducer tests
//!
//! Full-cycle and partial-cycle worked examples, idempotence on acyclic
//! graphs, termination on overlapping cycles, and per-vertex balance
//! conservation through every reduction.

use settlement_engine_core_rs::netting::{
    find_cycle, net_balances, reduce_cycles, verify_balances_unchanged, DebtGraph,
};
use settlement_engine_core_rs::Debt;

// ============================================================================
// Test Helpers
// ============================================================================

fn graph(debts: &[(&str, &str, i64)]) -> DebtGraph {
    let debts: Vec<Debt> = debts
        .iter()
        .map(|(debtor, creditor, amount)| Debt::new(*debtor, *creditor, *amount))
        .collect();
    DebtGraph::build(&debts).unwrap()
}

// ============================================================================
// Worked examples
// ============================================================================

#[test]
fn test_full_cycle_reduces_to_empty_edge_set() {
    // A->B:100, B->C:100, C->A:100 nets to nothing
    let mut g = graph(&[
        ("alice", "bob", 100),
        ("bob", "carol", 100),
        ("carol", "alice", 100),
    ]);

    let stats = reduce_cycles(&mut g).unwrap();

    assert!(g.is_empty());
    assert_eq!(stats.cycles_eliminated, 1);
    assert_eq!(stats.residual_edges, 0);
}

#[test]
fn test_partial_cycle_leaves_residual_edges() {
    // A owes B:100, B owes C:30, C owes A:100
    // The 30-cycle nets away: residual A owes B:70, C owes A:70
    let mut g = graph(&[
        ("alice", "bob", 100),
        ("bob", "carol", 30),
        ("carol", "alice", 100),
    ]);

    reduce_cycles(&mut g).unwrap();

    assert_eq!(g.edge_count(), 2);
    assert_eq!(g.amount("alice", "bob"), Some(70));
    assert_eq!(g.amount("carol", "alice"), Some(70));

    let balances = net_balances(&g);
    assert_eq!(balances["alice"], 0);
    assert_eq!(balances["bob"], 70);
    assert_eq!(balances["carol"], -70);
}

#[test]
fn test_bilateral_debts_offset_to_net_direction() {
    // alice owes bob 500, bob owes alice 300 -> net alice owes bob 200
    let mut g = graph(&[("alice", "bob", 500), ("bob", "alice", 300)]);

    reduce_cycles(&mut g).unwrap();

    assert_eq!(g.edge_count(), 1);
    assert_eq!(g.amount("alice", "bob"), Some(200));
}

// ============================================================================
// Idempotence and termination
// ============================================================================

#[test]
fn test_acyclic_graph_returned_unchanged() {
    let mut g = graph(&[
        ("alice", "bob", 40),
        ("bob", "carol", 25),
        ("carol", "dan", 10),
    ]);
    let before = g.clone();

    let stats = reduce_cycles(&mut g).unwrap();

    assert_eq!(g, before);
    assert_eq!(stats.cycles_eliminated, 0);
    assert_eq!(stats.value_netted, 0);
}

#[test]
fn test_reduction_is_idempotent() {
    let mut g = graph(&[
        ("alice", "bob", 100),
        ("bob", "carol", 30),
        ("carol", "alice", 100),
    ]);

    reduce_cycles(&mut g).unwrap();
    let after_first = g.clone();

    let stats = reduce_cycles(&mut g).unwrap();
    assert_eq!(g, after_first);
    assert_eq!(stats.cycles_eliminated, 0);
}

#[test]
fn test_overlapping_cycles_terminate() {
    // Cycles share the alice -> bob edge; reduction must still converge
    let mut g = graph(&[
        ("alice", "bob", 100),
        ("bob", "alice", 40),
        ("bob", "carol", 60),
        ("carol", "alice", 60),
        ("carol", "dan", 20),
        ("dan", "bob", 20),
    ]);

    let baseline = net_balances(&g);
    reduce_cycles(&mut g).unwrap();

    assert_eq!(find_cycle(&g), None, "residual graph must be acyclic");
    verify_balances_unchanged(&baseline, &net_balances(&g), "test").unwrap();
}

#[test]
fn test_dense_overlapping_cycles_terminate() {
    // Every ordered pair among four parties owes something: heavily
    // overlapping cycles in both directions
    let parties = ["alice", "bob", "carol", "dan"];
    let mut debts = Vec::new();
    let mut amount = 1;
    for debtor in parties {
        for creditor in parties {
            if debtor != creditor {
                debts.push((debtor, creditor, amount));
                amount += 3;
            }
        }
    }

    let mut g = graph(&debts);
    let baseline = net_balances(&g);

    reduce_cycles(&mut g).unwrap();

    assert_eq!(find_cycle(&g), None);
    verify_balances_unchanged(&baseline, &net_balances(&g), "test").unwrap();
}

// ============================================================================
// Conservation
// ============================================================================

#[test]
fn test_reduction_never_moves_any_party_balance() {
    let mut g = graph(&[
        ("alice", "bob", 120),
        ("bob", "carol", 80),
        ("carol", "alice", 50),
        ("dan", "alice", 30),
        ("bob", "dan", 30),
        ("dan", "carol", 15),
    ]);

    let baseline = net_balances(&g);
    reduce_cycles(&mut g).unwrap();
    let after = net_balances(&g);

    verify_balances_unchanged(&baseline, &after, "test").unwrap();
    assert_eq!(after.values().sum::<i64>(), 0);
}
