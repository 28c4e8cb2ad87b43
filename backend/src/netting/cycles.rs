//! Cycle Detector
//!
//! Finds one directed cycle at a time in the current debt graph using
//! depth-first search with a recursion-stack marker.
//!
//! # Determinism
//!
//! Start vertices and successors are visited in ascending `PartyId` order
//! (the graph's BTreeMap ordering), so the same graph always yields the same
//! cycle across runs.
//!
//! Complexity: O(V+E) per call; fully explored vertices are never revisited.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::debt::PartyId;
use crate::netting::DebtGraph;

/// Find one cycle as a closed path `[v0, v1, ..., v0]`, or `None` if the
/// graph is acyclic.
///
/// # Example
///
/// ```rust
/// use settlement_engine_core_rs::{Debt, netting::{find_cycle, DebtGraph}};
///
/// let graph = DebtGraph::build(&[
///     Debt::new("alice", "bob", 100),
///     Debt::new("bob", "carol", 100),
///     Debt::new("carol", "alice", 100),
/// ])
/// .unwrap();
///
/// let cycle = find_cycle(&graph).unwrap();
/// assert_eq!(cycle.first(), cycle.last());
/// assert_eq!(cycle.len(), 4); // three vertices plus the closing repeat
/// ```
pub fn find_cycle(graph: &DebtGraph) -> Option<Vec<PartyId>> {
    let adjacency = graph.adjacency();
    let mut explored: BTreeSet<&PartyId> = BTreeSet::new();

    for start in adjacency.keys() {
        if explored.contains(*start) {
            continue;
        }

        let mut path: Vec<&PartyId> = Vec::new();
        let mut on_path: BTreeSet<&PartyId> = BTreeSet::new();

        if let Some(cycle) = visit(*start, &adjacency, &mut explored, &mut path, &mut on_path) {
            return Some(cycle);
        }
    }

    None
}

/// DFS helper. `path`/`on_path` track the current recursion stack; a
/// successor already on the path closes a cycle.
fn visit<'a>(
    vertex: &'a PartyId,
    adjacency: &BTreeMap<&'a PartyId, Vec<&'a PartyId>>,
    explored: &mut BTreeSet<&'a PartyId>,
    path: &mut Vec<&'a PartyId>,
    on_path: &mut BTreeSet<&'a PartyId>,
) -> Option<Vec<PartyId>> {
    path.push(vertex);
    on_path.insert(vertex);

    if let Some(successors) = adjacency.get(vertex) {
        for &next in successors {
            if on_path.contains(next) {
                // Back edge: the cycle is the path suffix from `next`, closed
                let start = path
                    .iter()
                    .position(|&p| p == next)
                    .expect("on_path vertex must be on the path");
                let mut cycle: Vec<PartyId> =
                    path[start..].iter().map(|&p| p.clone()).collect();
                cycle.push(next.clone());
                return Some(cycle);
            }

            if !explored.contains(next) {
                if let Some(cycle) = visit(next, adjacency, explored, path, on_path) {
                    return Some(cycle);
                }
            }
        }
    }

    path.pop();
    on_path.remove(vertex);
    explored.insert(vertex);
    None
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
    fn test_acyclic_chain_has_no_cycle() {
        let g = graph(&[("alice", "bob", 10), ("bob", "carol", 10)]);
        assert_eq!(find_cycle(&g), None);
    }

    #[test]
    fn test_two_party_cycle() {
        let g = graph(&[("alice", "bob", 10), ("bob", "alice", 5)]);
        let cycle = find_cycle(&g).unwrap();
        assert_eq!(
            cycle,
            vec!["alice".to_string(), "bob".to_string(), "alice".to_string()]
        );
    }

    #[test]
    fn test_triangle_cycle() {
        let g = graph(&[
            ("alice", "bob", 100),
            ("bob", "carol", 100),
            ("carol", "alice", 100),
        ]);
        let cycle = find_cycle(&g).unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
    }

    #[test]
    fn test_deterministic_selection_between_disjoint_cycles() {
        // Two disjoint 2-cycles; DFS starts from the smallest PartyId, so the
        // (alice, bob) cycle is always reported first.
        let g = graph(&[
            ("walt", "zoe", 10),
            ("zoe", "walt", 10),
            ("alice", "bob", 10),
            ("bob", "alice", 10),
        ]);

        let cycle = find_cycle(&g).unwrap();
        assert_eq!(cycle[0], "alice");
    }

    #[test]
    fn test_cycle_reachable_only_through_prefix() {
        // alice -> bob -> carol -> bob: cycle does not pass through the start
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
}
