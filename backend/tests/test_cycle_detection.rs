//! Cycle Detector tests
//!
//! One cycle at a time, deterministic selection, O(V+E) DFS behavior on
//! shapes that defeat naive detectors (shared edges, cycles off the root).

use settlement_engine_core_rs::netting::{find_cycle, DebtGraph};
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

fn assert_closed(cycle: &[String]) {
    assert!(cycle.len() >= 3, "cycle needs >= 2 distinct vertices: {cycle:?}");
    assert_eq!(cycle.first(), cycle.last(), "cycle must close: {cycle:?}");
}

// ============================================================================
// Basic shapes
// ============================================================================

#[test]
fn test_empty_graph_is_acyclic() {
    assert_eq!(find_cycle(&graph(&[])), None);
}

#[test]
fn test_single_edge_is_acyclic() {
    assert_eq!(find_cycle(&graph(&[("alice", "bob", 10)])), None);
}

#[test]
fn test_chain_is_acyclic() {
    let g = graph(&[
        ("alice", "bob", 10),
        ("bob", "carol", 10),
        ("carol", "dan", 10),
    ]);
    assert_eq!(find_cycle(&g), None);
}

#[test]
fn test_diamond_is_acyclic() {
    // Two paths alice -> dan; converging paths are not cycles
    let g = graph(&[
        ("alice", "bob", 10),
        ("alice", "carol", 10),
        ("bob", "dan", 10),
        ("carol", "dan", 10),
    ]);
    assert_eq!(find_cycle(&g), None);
}

#[test]
fn test_mutual_debts_form_two_cycle() {
    let g = graph(&[("alice", "bob", 10), ("bob", "alice", 7)]);
    let cycle = find_cycle(&g).unwrap();

    assert_closed(&cycle);
    assert_eq!(
        cycle,
        vec!["alice".to_string(), "bob".to_string(), "alice".to_string()]
    );
}

#[test]
fn test_triangle_found() {
    let g = graph(&[
        ("alice", "bob", 100),
        ("bob", "carol", 100),
        ("carol", "alice", 100),
    ]);

    let cycle = find_cycle(&g).unwrap();
    assert_closed(&cycle);
    assert_eq!(cycle.len(), 4);
}

// ============================================================================
// Determinism and reachability
// ============================================================================

#[test]
fn test_deterministic_cycle_for_same_graph() {
    let g = graph(&[
        ("alice", "bob", 10),
        ("bob", "carol", 10),
        ("carol", "alice", 10),
        ("bob", "dan", 10),
        ("dan", "alice", 10),
    ]);

    let first = find_cycle(&g).unwrap();
    let second = find_cycle(&g).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_lowest_party_id_component_searched_first() {
    let g = graph(&[
        ("zoe", "walt", 10),
        ("walt", "zoe", 10),
        ("bob", "carol", 10),
        ("carol", "bob", 10),
    ]);

    let cycle = find_cycle(&g).unwrap();
    assert_eq!(cycle[0], "bob");
}

#[test]
fn test_cycle_not_containing_dfs_root_is_found() {
    // DFS enters at alice but the cycle is bob -> carol -> bob
    let g = graph(&[
        ("alice", "bob", 10),
        ("bob", "carol", 10),
        ("carol", "bob", 10),
    ]);

    let cycle = find_cycle(&g).unwrap();
    assert_eq!(
        cycle,
        vec!["bob".to_string(), "carol".to_string(), "bob".to_string()]
    );
}

#[test]
fn test_every_reported_hop_has_supporting_edge() {
    let g = graph(&[
        ("alice", "bob", 10),
        ("bob", "carol", 20),
        ("carol", "dan", 30),
        ("dan", "bob", 40),
    ]);

    let cycle = find_cycle(&g).unwrap();
    assert_closed(&cycle);
    for hop in cycle.windows(2) {
        assert!(
            g.amount(&hop[0], &hop[1]).is_some(),
            "missing edge {} -> {}",
            hop[0],
            hop[1]
        );
    }
}
