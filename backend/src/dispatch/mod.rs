//! Dispatch Gateway
//!
//! Thin adapter over the external ledger client. For each instruction in an
//! approved proposal the gateway requests one conditional (escrowed) transfer
//! and records the outcome independently. The underlying ledger offers no
//! atomic multi-instruction commit, and completed transfers are irreversible,
//! so there is no rollback path: a partial failure is surfaced as the full
//! per-instruction outcome list for forward-only reconciliation.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::models::debt::PartyId;
use crate::models::proposal::{InstructionOutcome, SettlementInstruction};

/// A transfer the ledger refused or that errored in flight
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transfer rejected: {reason}")]
pub struct TransferError {
    pub reason: String,
}

impl TransferError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// External ledger client contract.
///
/// One call per instruction; blocking and retries are owned by the
/// implementation, not this engine. Returns the ledger reference id
/// (transaction hash) on success.
pub trait LedgerClient: Send + Sync {
    fn submit_transfer(
        &self,
        from: &PartyId,
        to: &PartyId,
        amount: i64,
    ) -> Result<String, TransferError>;
}

/// Summary of one dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Outcome per instruction, aligned with the proposal's instruction list
    pub outcomes: Vec<InstructionOutcome>,
}

impl DispatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(InstructionOutcome::is_success)
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.is_success())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.succeeded_count()
    }
}

/// Thin adapter submitting a proposal's instructions to the ledger client
pub struct DispatchGateway {
    client: Arc<dyn LedgerClient>,
}

impl DispatchGateway {
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        Self { client }
    }

    /// Submit every instruction in order, recording each outcome.
    ///
    /// Instructions after a failure are still attempted: outcomes are
    /// independent, and reconciliation needs the complete picture.
    pub fn dispatch_all(
        &self,
        proposal_id: &str,
        instructions: &[SettlementInstruction],
    ) -> DispatchReport {
        let mut outcomes = Vec::with_capacity(instructions.len());

        for instruction in instructions {
            match self
                .client
                .submit_transfer(&instruction.from, &instruction.to, instruction.amount)
            {
                Ok(reference_id) => {
                    info!(
                        proposal_id,
                        from = %instruction.from,
                        to = %instruction.to,
                        amount = instruction.amount,
                        reference_id = %reference_id,
                        "transfer submitted"
                    );
                    outcomes.push(InstructionOutcome::Submitted { reference_id });
                }
                Err(error) => {
                    warn!(
                        proposal_id,
                        from = %instruction.from,
                        to = %instruction.to,
                        amount = instruction.amount,
                        reason = %error.reason,
                        "transfer failed"
                    );
                    outcomes.push(InstructionOutcome::Failed {
                        reason: error.reason,
                    });
                }
            }
        }

        DispatchReport { outcomes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fails every transfer whose `from` party is listed
    struct FailingLedger {
        fail_from: Vec<PartyId>,
        calls: Mutex<Vec<(PartyId, PartyId, i64)>>,
    }

    impl LedgerClient for FailingLedger {
        fn submit_transfer(
            &self,
            from: &PartyId,
            to: &PartyId,
            amount: i64,
        ) -> Result<String, TransferError> {
            self.calls
                .lock()
                .unwrap()
                .push((from.clone(), to.clone(), amount));
            if self.fail_from.contains(from) {
                Err(TransferError::new("insufficient escrow balance"))
            } else {
                Ok(format!("TX-{from}-{to}"))
            }
        }
    }

    #[test]
    fn test_all_instructions_attempted_despite_failure() {
        let ledger = Arc::new(FailingLedger {
            fail_from: vec!["alice".to_string()],
            calls: Mutex::new(Vec::new()),
        });
        let gateway = DispatchGateway::new(ledger.clone());

        let report = gateway.dispatch_all(
            "prop-1",
            &[
                SettlementInstruction::new("alice", "bob", 10),
                SettlementInstruction::new("carol", "bob", 20),
            ],
        );

        assert_eq!(ledger.calls.lock().unwrap().len(), 2);
        assert!(!report.all_succeeded());
        assert_eq!(report.succeeded_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(matches!(
            report.outcomes[0],
            InstructionOutcome::Failed { .. }
        ));
        assert!(matches!(
            report.outcomes[1],
            InstructionOutcome::Submitted { .. }
        ));
    }
}
