//! Settlement Proposal Coordinator
//!
//! Owns the proposal state machine: creates proposals from netting runs,
//! collects and validates threshold signatures from concurrent signers,
//! triggers dispatch exactly once per proposal, and expires stale proposals.
//!
//! # Concurrency model
//!
//! Every proposal lives in its own `Arc<Mutex<_>>` slot, so signature
//! submissions against unrelated proposals never contend. The group index
//! (`active`) has its own lock, held for the whole existence-check-and-insert
//! in `create_proposal`; that lock is the only one ever taken *before* a
//! proposal lock, and no code path takes it while holding one, so the
//! ordering is acyclic. The `Approved -> Dispatching` claim happens inside
//! the proposal lock (`SettlementProposal::begin_dispatch`), which makes it a
//! single atomic compare-and-set: two racing dispatchers cannot both win.
//! No ledger I/O happens under any lock.
//!
//! # Critical Invariants
//!
//! 1. At most one active (non-terminal) proposal per settlement group
//! 2. Terminal proposals are never mutated
//! 3. A proposal that reached `Approved` can never be expired

pub mod expiry;

pub use expiry::ExpirySweeper;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dispatch::{DispatchGateway, LedgerClient};
use crate::models::debt::{Debt, GroupId, PartyId};
use crate::models::proposal::{
    ProposalId, ProposalStatus, SettlementInstruction, SettlementProposal, Signature,
    SignatureRecord,
};
use crate::netting::{plan_settlement, NettingError};

/// Signature verification contract, delegated to the host.
///
/// The engine never inspects raw cryptographic material; it only asks whether
/// `signature` is a valid authorization by `party_id` of this proposal's
/// instruction list.
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        proposal_id: &str,
        party_id: &PartyId,
        signature: &Signature,
        instructions: &[SettlementInstruction],
    ) -> bool;
}

/// Configuration for proposal lifecycle behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Seconds a proposal may collect signatures before expiring
    pub expiry_window_secs: i64,

    /// Distinct required signatures needed before dispatch.
    /// `None` = every required signer (unanimous debtor consent).
    pub quorum: Option<usize>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            expiry_window_secs: 24 * 60 * 60,
            quorum: None,
        }
    }
}

/// Errors from coordinator operations
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("group {group_id} already has an active proposal {proposal_id}")]
    ProposalAlreadyActive {
        group_id: GroupId,
        proposal_id: ProposalId,
    },

    #[error("unknown proposal {proposal_id}")]
    UnknownProposal { proposal_id: ProposalId },

    #[error("proposal {proposal_id} is in terminal status {status:?}")]
    ProposalTerminal {
        proposal_id: ProposalId,
        status: ProposalStatus,
    },

    #[error("party {party_id} is not a required signer for proposal {proposal_id}")]
    UnauthorizedSigner {
        proposal_id: ProposalId,
        party_id: PartyId,
    },

    #[error("signature from {party_id} failed verification for proposal {proposal_id}")]
    InvalidSignature {
        proposal_id: ProposalId,
        party_id: PartyId,
    },

    #[error("proposal {proposal_id} is not approved for dispatch (status {status:?})")]
    NotApproved {
        proposal_id: ProposalId,
        status: ProposalStatus,
    },

    #[error(transparent)]
    Netting(#[from] NettingError),
}

type ProposalSlot = Arc<Mutex<SettlementProposal>>;

/// Coordinates proposal lifecycles across settlement groups.
///
/// # Example
///
/// ```no_run
/// use settlement_engine_core_rs::{CoordinatorConfig, Debt, SettlementCoordinator};
///
/// # let verifier = todo!();
/// # let ledger = todo!();
/// let coordinator = SettlementCoordinator::new(CoordinatorConfig::default(), verifier, ledger);
///
/// let proposal = coordinator
///     .compute_settlement("circle-7", &[Debt::new("alice", "bob", 100_000)])
///     .unwrap();
/// let _status = coordinator
///     .submit_signature(proposal.id(), &"alice".to_string(), &"sig".to_string())
///     .unwrap();
/// ```
pub struct SettlementCoordinator {
    config: CoordinatorConfig,
    verifier: Arc<dyn SignatureVerifier>,
    gateway: DispatchGateway,

    /// One exclusive lock per proposal
    proposals: RwLock<HashMap<ProposalId, ProposalSlot>>,

    /// Group -> its active (non-terminal) proposal
    active: Mutex<HashMap<GroupId, ProposalId>>,
}

impl SettlementCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        verifier: Arc<dyn SignatureVerifier>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            config,
            verifier,
            gateway: DispatchGateway::new(ledger),
            proposals: RwLock::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run the netting pipeline over a debt snapshot and create the group's
    /// proposal from the result.
    ///
    /// Refuses to mint an empty proposal: a snapshot whose obligations are
    /// entirely circular nets to nothing and returns `NothingToSettle`.
    pub fn compute_settlement(
        &self,
        group_id: &str,
        debts: &[Debt],
    ) -> Result<SettlementProposal, CoordinatorError> {
        let plan = plan_settlement(debts)?;
        if plan.instructions.is_empty() {
            return Err(NettingError::NothingToSettle.into());
        }

        let proposal = self.create_proposal(group_id, plan.instructions)?;

        info!(
            group_id,
            proposal_id = proposal.id(),
            instructions = proposal.instructions().len(),
            cycles_netted = plan.cycles_eliminated,
            "settlement proposal created"
        );

        Ok(proposal)
    }

    /// Create a proposal for `group_id` from an instruction list.
    ///
    /// The group lock is held across the existence check and the insert, so
    /// two concurrent creates cannot both succeed.
    pub fn create_proposal(
        &self,
        group_id: &str,
        instructions: Vec<SettlementInstruction>,
    ) -> Result<SettlementProposal, CoordinatorError> {
        let mut active = self.active.lock().unwrap();

        if let Some(existing_id) = active.get(group_id) {
            // Entries are removed when a proposal goes terminal; re-check the
            // status in case a sweep raced the cleanup.
            if let Some(slot) = self.slot(existing_id) {
                let status = slot.lock().unwrap().status();
                if !status.is_terminal() {
                    return Err(CoordinatorError::ProposalAlreadyActive {
                        group_id: group_id.to_string(),
                        proposal_id: existing_id.clone(),
                    });
                }
            }
        }

        let proposal = SettlementProposal::new(
            group_id.to_string(),
            instructions,
            self.config.quorum,
            Duration::seconds(self.config.expiry_window_secs),
        );
        let proposal_id = proposal.id().to_string();
        let snapshot = proposal.clone();

        self.proposals
            .write()
            .unwrap()
            .insert(proposal_id.clone(), Arc::new(Mutex::new(proposal)));
        active.insert(group_id.to_string(), proposal_id);

        Ok(snapshot)
    }

    /// Submit one party's signature for a proposal.
    ///
    /// Idempotent: a party that already signed gets the current status back
    /// unchanged. A new valid signature moves `Pending`/`PartiallySigned` to
    /// `PartiallySigned`, then to `Approved` once quorum is reached.
    pub fn submit_signature(
        &self,
        proposal_id: &str,
        party_id: &PartyId,
        signature: &Signature,
    ) -> Result<ProposalStatus, CoordinatorError> {
        let slot = self.slot_or_err(proposal_id)?;

        let (result, expired_group) = {
            let mut proposal = slot.lock().unwrap();

            // A stale proposal may not have been swept yet; expire it here
            // rather than counting a late signature toward quorum.
            if proposal.status().accepts_signatures() && proposal.is_past_expiry(Utc::now()) {
                proposal.transition(ProposalStatus::Expired).expect(
                    "signature-accepting statuses can always expire",
                );
                warn!(proposal_id, "proposal expired before signature arrived");
                (
                    Err(CoordinatorError::ProposalTerminal {
                        proposal_id: proposal_id.to_string(),
                        status: ProposalStatus::Expired,
                    }),
                    Some(proposal.group_id().to_string()),
                )
            } else {
                (self.apply_signature(&mut proposal, party_id, signature), None)
            }
        };

        if let Some(group_id) = expired_group {
            self.release_group(&group_id, proposal_id);
        }

        result
    }

    /// Signature checks and state transitions, under the proposal lock.
    fn apply_signature(
        &self,
        proposal: &mut SettlementProposal,
        party_id: &PartyId,
        signature: &Signature,
    ) -> Result<ProposalStatus, CoordinatorError> {
        let proposal_id = proposal.id().to_string();

        if proposal.status().is_terminal() {
            return Err(CoordinatorError::ProposalTerminal {
                proposal_id,
                status: proposal.status(),
            });
        }

        if !proposal.is_required_signer(party_id) {
            return Err(CoordinatorError::UnauthorizedSigner {
                proposal_id,
                party_id: party_id.clone(),
            });
        }

        // Resubmission from a signer already on file is a no-op
        if proposal.signature_from(party_id).is_some() {
            debug!(
                proposal_id = %proposal_id,
                party_id = %party_id,
                "duplicate signature ignored"
            );
            return Ok(proposal.status());
        }

        if !proposal.status().accepts_signatures() {
            // Approved or Dispatching: quorum is already met and the
            // signature set is frozen for audit
            return Ok(proposal.status());
        }

        if !self
            .verifier
            .verify(&proposal_id, party_id, signature, proposal.instructions())
        {
            return Err(CoordinatorError::InvalidSignature {
                proposal_id,
                party_id: party_id.clone(),
            });
        }

        proposal.record_signature(SignatureRecord {
            signer: party_id.clone(),
            signature: signature.clone(),
            signed_at: Utc::now(),
        });

        if proposal.status() == ProposalStatus::Pending {
            proposal
                .transition(ProposalStatus::PartiallySigned)
                .expect("Pending -> PartiallySigned is in the table");
        }

        if proposal.quorum_reached() {
            proposal
                .transition(ProposalStatus::Approved)
                .expect("PartiallySigned -> Approved is in the table");
            info!(
                proposal_id = %proposal_id,
                signatures = proposal.signature_count(),
                quorum = proposal.quorum(),
                "proposal approved"
            );
        } else {
            debug!(
                proposal_id = %proposal_id,
                party_id = %party_id,
                signatures = proposal.signature_count(),
                quorum = proposal.quorum(),
                "signature collected"
            );
        }

        Ok(proposal.status())
    }

    /// Dispatch an approved proposal's instructions to the ledger.
    ///
    /// The `Approved -> Dispatching` claim is a compare-and-set under the
    /// proposal lock: of two concurrent callers exactly one proceeds, the
    /// other gets `NotApproved`. Ledger submission happens outside the lock
    /// and always runs to completion (`Executed` or `Failed`).
    pub fn dispatch(&self, proposal_id: &str) -> Result<ProposalStatus, CoordinatorError> {
        let slot = self.slot_or_err(proposal_id)?;

        let (instructions, group_id) = {
            let mut proposal = slot.lock().unwrap();

            if proposal.status().is_terminal() {
                return Err(CoordinatorError::ProposalTerminal {
                    proposal_id: proposal_id.to_string(),
                    status: proposal.status(),
                });
            }
            if !proposal.begin_dispatch() {
                return Err(CoordinatorError::NotApproved {
                    proposal_id: proposal_id.to_string(),
                    status: proposal.status(),
                });
            }

            (
                proposal.instructions().to_vec(),
                proposal.group_id().to_string(),
            )
        };

        let report = self.gateway.dispatch_all(proposal_id, &instructions);

        let status = {
            let mut proposal = slot.lock().unwrap();
            let next = if report.all_succeeded() {
                ProposalStatus::Executed
            } else {
                ProposalStatus::Failed
            };
            proposal.record_outcomes(report.outcomes.clone());
            proposal
                .transition(next)
                .expect("Dispatching -> Executed/Failed is in the table");
            proposal.status()
        };

        match status {
            ProposalStatus::Executed => info!(
                proposal_id,
                transfers = report.succeeded_count(),
                "settlement executed"
            ),
            _ => warn!(
                proposal_id,
                succeeded = report.succeeded_count(),
                failed = report.failed_count(),
                "settlement failed; outcomes recorded for reconciliation"
            ),
        }

        self.release_group(&group_id, proposal_id);
        Ok(status)
    }

    /// Expire every signature-collecting proposal past its deadline.
    ///
    /// Takes each proposal's own lock, so a sweep racing a last signature
    /// observes either the pre-approval state (and expires) or the approved
    /// state (and leaves the proposal alone), never both.
    pub fn sweep_expired(&self) -> Vec<ProposalId> {
        let now = Utc::now();
        let slots: Vec<(ProposalId, ProposalSlot)> = {
            let proposals = self.proposals.read().unwrap();
            proposals
                .iter()
                .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
                .collect()
        };

        let mut expired = Vec::new();

        for (proposal_id, slot) in slots {
            let group_id = {
                let mut proposal = slot.lock().unwrap();
                if proposal.status().accepts_signatures() && proposal.is_past_expiry(now) {
                    proposal
                        .transition(ProposalStatus::Expired)
                        .expect("signature-accepting statuses can always expire");
                    Some(proposal.group_id().to_string())
                } else {
                    None
                }
            };

            if let Some(group_id) = group_id {
                self.release_group(&group_id, &proposal_id);
                expired.push(proposal_id);
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "expired stale proposals");
        }

        expired
    }

    /// Read-only snapshot of a proposal
    pub fn get_proposal(&self, proposal_id: &str) -> Result<SettlementProposal, CoordinatorError> {
        let slot = self.slot_or_err(proposal_id)?;
        let proposal = slot.lock().unwrap();
        Ok(proposal.clone())
    }

    /// The group's active proposal id, if any
    pub fn active_proposal(&self, group_id: &str) -> Option<ProposalId> {
        self.active.lock().unwrap().get(group_id).cloned()
    }

    fn slot(&self, proposal_id: &str) -> Option<ProposalSlot> {
        self.proposals
            .read()
            .unwrap()
            .get(proposal_id)
            .map(Arc::clone)
    }

    fn slot_or_err(&self, proposal_id: &str) -> Result<ProposalSlot, CoordinatorError> {
        self.slot(proposal_id)
            .ok_or_else(|| CoordinatorError::UnknownProposal {
                proposal_id: proposal_id.to_string(),
            })
    }

    /// Drop the group's active entry once `proposal_id` went terminal.
    /// Called only after the proposal lock has been released.
    fn release_group(&self, group_id: &str, proposal_id: &str) {
        let mut active = self.active.lock().unwrap();
        if active.get(group_id).map(String::as_str) == Some(proposal_id) {
            active.remove(group_id);
        }
    }
}
