//! Debt (IOU) records
//!
//! A `Debt` is one outstanding obligation between two parties in a settlement
//! group, sourced from the external loan store. Debts are immutable once
//! loaded into a settlement run: the netting pipeline works on its own merged
//! copy (see `netting::DebtGraph`) and never writes back.
//!
//! CRITICAL: All money values are i64 (drops, the ledger's minor unit)

use serde::{Deserialize, Serialize};

/// Participant identifier (ledger account address).
pub type PartyId = String;

/// Settlement group (lending circle) identifier.
pub type GroupId = String;

/// One outstanding obligation: `debtor` owes `creditor` `amount`.
///
/// # Example
/// ```
/// use settlement_engine_core_rs::Debt;
///
/// let debt = Debt::new("alice", "bob", 100_000);
/// assert_eq!(debt.amount, 100_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    /// Party that owes
    pub debtor: PartyId,

    /// Party that is owed
    pub creditor: PartyId,

    /// Obligation amount in drops (must be >= 0; zero debts are ignored)
    pub amount: i64,
}

impl Debt {
    /// Create a new debt record
    pub fn new(debtor: impl Into<PartyId>, creditor: impl Into<PartyId>, amount: i64) -> Self {
        Self {
            debtor: debtor.into(),
            creditor: creditor.into(),
            amount,
        }
    }
}
