//! Instruction Generator
//!
//! Matches net debtors to net creditors into a minimal set of point-to-point
//! transfer instructions.
//!
//! # Matching policy
//!
//! Debtors and creditors are each sorted descending by magnitude, ties broken
//! ascending by `PartyId`, then matched greedily largest-first: instruction
//! amount = min(debtor remaining, creditor remaining); whichever side hits
//! zero advances. The ordering is a fixed policy so output is deterministic
//! and testable.
//!
//! Post-condition: replaying the instruction list reproduces the input net
//! balance vector exactly (checked by `verify_instructions`).

use crate::models::proposal::SettlementInstruction;
use crate::netting::{NetBalance, NettingError};

/// Generate transfer instructions realizing the net balance vector.
///
/// Every emitted amount is strictly positive; parties with a zero net
/// position get no instruction.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use settlement_engine_core_rs::netting::generate_instructions;
///
/// let balances = BTreeMap::from([
///     ("alice".to_string(), 0),
///     ("bob".to_string(), 70),
///     ("carol".to_string(), -70),
/// ]);
///
/// let instructions = generate_instructions(&balances);
/// assert_eq!(instructions.len(), 1);
/// assert_eq!(instructions[0].from, "carol");
/// assert_eq!(instructions[0].to, "bob");
/// assert_eq!(instructions[0].amount, 70);
/// ```
pub fn generate_instructions(balances: &NetBalance) -> Vec<SettlementInstruction> {
    // Magnitudes: debtors owe, creditors are owed
    let mut debtors: Vec<(String, i64)> = balances
        .iter()
        .filter(|(_, &net)| net < 0)
        .map(|(party, &net)| (party.clone(), -net))
        .collect();

    let mut creditors: Vec<(String, i64)> = balances
        .iter()
        .filter(|(_, &net)| net > 0)
        .map(|(party, &net)| (party.clone(), net))
        .collect();

    // Largest-first, PartyId ascending on ties
    let largest_first =
        |a: &(String, i64), b: &(String, i64)| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0));
    debtors.sort_by(largest_first);
    creditors.sort_by(largest_first);

    let mut instructions = Vec::new();
    let mut debtor_idx = 0;
    let mut creditor_idx = 0;

    while debtor_idx < debtors.len() && creditor_idx < creditors.len() {
        let debtor = &mut debtors[debtor_idx];
        let creditor = &mut creditors[creditor_idx];

        let amount = debtor.1.min(creditor.1);
        instructions.push(SettlementInstruction::new(
            debtor.0.clone(),
            creditor.0.clone(),
            amount,
        ));

        debtor.1 -= amount;
        creditor.1 -= amount;

        if debtors[debtor_idx].1 == 0 {
            debtor_idx += 1;
        }
        if creditors[creditor_idx].1 == 0 {
            creditor_idx += 1;
        }
    }

    instructions
}

/// Fold an instruction list back into net balances (`to` gains, `from` owes).
pub fn replay_instructions(instructions: &[SettlementInstruction]) -> NetBalance {
    let mut balances = NetBalance::new();

    for instruction in instructions {
        *balances.entry(instruction.to.clone()).or_insert(0) += instruction.amount;
        *balances.entry(instruction.from.clone()).or_insert(0) -= instruction.amount;
    }

    balances
}

/// Verify the generator post-condition: the instructions reproduce the net
/// balance vector exactly.
pub fn verify_instructions(
    balances: &NetBalance,
    instructions: &[SettlementInstruction],
) -> Result<(), NettingError> {
    let replayed = replay_instructions(instructions);

    let parties = balances.keys().chain(replayed.keys());
    for party in parties {
        let expected = balances.get(party).copied().unwrap_or(0);
        let actual = replayed.get(party).copied().unwrap_or(0);
        if expected != actual {
            return Err(NettingError::ConservationViolation {
                context: "instruction generation",
                detail: format!("party {party} nets to {actual}, expected {expected}"),
            });
        }
    }

    Ok(())
}
