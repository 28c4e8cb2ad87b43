//! Debt Graph Builder
//!
//! Converts a snapshot of active debts into a directed weighted graph.
//!
//! Edges are aggregated per `(debtor, creditor)` pair: two loans between the
//! same pair become one edge with the summed amount. Storage is a `BTreeMap`
//! keyed by `(debtor, creditor)` so edge iteration is always sorted and the
//! merged edge set is identical for any input order.
//!
//! # Critical Invariants
//!
//! 1. Every stored edge amount is > 0 (zero edges are removed on write)
//! 2. No self-loops (`debtor == creditor` is rejected as invalid input)
//! 3. One graph per settlement run; never shared or mutated concurrently

use std::collections::{BTreeMap, BTreeSet};

use crate::models::debt::{Debt, PartyId};
use crate::netting::InvalidDebtError;

/// Directed weighted debt graph with deterministic edge ordering.
///
/// # Example
///
/// ```rust
/// use settlement_engine_core_rs::{Debt, netting::DebtGraph};
///
/// let graph = DebtGraph::build(&[
///     Debt::new("alice", "bob", 40),
///     Debt::new("alice", "bob", 60),
/// ])
/// .unwrap();
///
/// assert_eq!(graph.edge_count(), 1);
/// assert_eq!(graph.amount("alice", "bob"), Some(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtGraph {
    /// (debtor, creditor) -> aggregated amount; sorted iteration order
    edges: BTreeMap<(PartyId, PartyId), i64>,
}

impl DebtGraph {
    /// Build the merged graph from a debt snapshot.
    ///
    /// Duplicate `(debtor, creditor)` pairs are summed. Zero-amount debts are
    /// dropped. Self-loops and negative amounts are invalid input.
    pub fn build(debts: &[Debt]) -> Result<Self, InvalidDebtError> {
        let mut edges: BTreeMap<(PartyId, PartyId), i64> = BTreeMap::new();

        for debt in debts {
            if debt.debtor == debt.creditor {
                return Err(InvalidDebtError::SelfLoop {
                    party: debt.debtor.clone(),
                });
            }
            if debt.amount < 0 {
                return Err(InvalidDebtError::NegativeAmount {
                    debtor: debt.debtor.clone(),
                    creditor: debt.creditor.clone(),
                    amount: debt.amount,
                });
            }
            if debt.amount == 0 {
                continue;
            }

            *edges
                .entry((debt.debtor.clone(), debt.creditor.clone()))
                .or_insert(0) += debt.amount;
        }

        Ok(Self { edges })
    }

    /// All parties appearing on any edge, sorted
    pub fn vertices(&self) -> BTreeSet<&PartyId> {
        self.edges
            .keys()
            .flat_map(|(debtor, creditor)| [debtor, creditor])
            .collect()
    }

    /// Number of aggregated edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Aggregated amount on an edge, if present
    pub fn amount(&self, debtor: &str, creditor: &str) -> Option<i64> {
        self.edges
            .get(&(debtor.to_string(), creditor.to_string()))
            .copied()
    }

    /// Edges in `(debtor, creditor)` sorted order
    pub fn edges(&self) -> impl Iterator<Item = (&PartyId, &PartyId, i64)> {
        self.edges
            .iter()
            .map(|((debtor, creditor), amount)| (debtor, creditor, *amount))
    }

    /// Total outstanding value across all edges
    pub fn total_value(&self) -> i64 {
        self.edges.values().sum()
    }

    /// Adjacency view: debtor -> sorted creditors.
    ///
    /// Sorted at both levels so DFS visitation order is deterministic.
    pub fn adjacency(&self) -> BTreeMap<&PartyId, Vec<&PartyId>> {
        let mut adjacency: BTreeMap<&PartyId, Vec<&PartyId>> = BTreeMap::new();
        for ((debtor, creditor), _) in &self.edges {
            adjacency.entry(debtor).or_default().push(creditor);
        }
        // BTreeMap key order already yields sorted creditor lists
        adjacency
    }

    /// Subtract `amount` from the `(debtor, creditor)` edge, removing it if
    /// the remainder hits zero.
    ///
    /// # Panics
    ///
    /// Panics if the edge is missing or the subtraction would go negative;
    /// both indicate a cycle-reduction logic bug.
    pub(crate) fn subtract(&mut self, debtor: &PartyId, creditor: &PartyId, amount: i64) {
        let key = (debtor.clone(), creditor.clone());
        let remaining = self
            .edges
            .get_mut(&key)
            .unwrap_or_else(|| panic!("missing edge {debtor} -> {creditor}"));

        assert!(
            *remaining >= amount,
            "edge {debtor} -> {creditor} has {remaining}, cannot subtract {amount}"
        );

        *remaining -= amount;
        if *remaining == 0 {
            self.edges.remove(&key);
        }
    }
}
