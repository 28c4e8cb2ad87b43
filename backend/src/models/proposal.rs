//! Settlement proposal model
//!
//! A `SettlementProposal` is the unit of coordination: the instruction list
//! produced by one netting run, plus the signature state needed to approve it
//! and the dispatch outcomes recorded against it.
//!
//! # Status lifecycle
//!
//! ```text
//! Pending ──▶ PartiallySigned ──▶ Approved ──▶ Dispatching ──▶ Executed
//!    │               │                                   └────▶ Failed
//!    └───────────────┴──▶ Expired
//! ```
//!
//! The status set is a closed enum with an explicit transition table; any
//! transition not in the table is rejected with `TransitionError` instead of
//! trusting caller-supplied state. Terminal states (`Executed`, `Expired`,
//! `Failed`) are immutable once reached.
//!
//! # Critical Invariants
//!
//! 1. `instructions` is fixed at creation and never regenerated
//! 2. `signatures` grows monotonically, at most one record per signer,
//!    in submission order (preserved for audit)
//! 3. All money values are i64 (drops)

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::debt::{GroupId, PartyId};

/// Proposal identifier (UUID v4).
pub type ProposalId = String;

/// Opaque signature blob. Verification is delegated to the host's
/// `SignatureVerifier`; the engine never inspects cryptographic material.
pub type Signature = String;

/// One minimal point-to-point transfer realizing part of the net balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementInstruction {
    /// Net debtor funding the transfer
    pub from: PartyId,

    /// Net creditor receiving the transfer
    pub to: PartyId,

    /// Transfer amount in drops (always > 0)
    pub amount: i64,
}

impl SettlementInstruction {
    pub fn new(from: impl Into<PartyId>, to: impl Into<PartyId>, amount: i64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

/// Proposal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Created, no signatures collected yet
    Pending,

    /// At least one signature collected, quorum not reached
    PartiallySigned,

    /// Quorum reached; eligible for dispatch
    Approved,

    /// Dispatch claimed; ledger submission in progress (not cancellable)
    Dispatching,

    /// Every instruction submitted successfully (terminal)
    Executed,

    /// Expiry passed before quorum was reached (terminal)
    Expired,

    /// At least one instruction failed at the ledger (terminal)
    Failed,
}

/// Error returned for a status transition not in the table
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid proposal status transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: ProposalStatus,
    pub to: ProposalStatus,
}

impl ProposalStatus {
    /// Whether this status is terminal (immutable once reached)
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProposalStatus::Executed | ProposalStatus::Expired | ProposalStatus::Failed
        )
    }

    /// Whether the proposal can still collect signatures
    pub fn accepts_signatures(self) -> bool {
        matches!(
            self,
            ProposalStatus::Pending | ProposalStatus::PartiallySigned
        )
    }

    /// Explicit transition table. Anything not listed here is rejected.
    pub fn can_transition_to(self, next: ProposalStatus) -> bool {
        use ProposalStatus::*;
        matches!(
            (self, next),
            (Pending, PartiallySigned)
                | (Pending, Expired)
                | (PartiallySigned, Approved)
                | (PartiallySigned, Expired)
                | (Approved, Dispatching)
                | (Dispatching, Executed)
                | (Dispatching, Failed)
        )
    }
}

/// One collected signature, in submission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// Signing party (always a member of `required_signers`)
    pub signer: PartyId,

    /// Opaque signature blob as submitted
    pub signature: Signature,

    /// Submission timestamp
    pub signed_at: DateTime<Utc>,
}

/// Per-instruction dispatch outcome, recorded for reconciliation.
///
/// Ledger transfers are irreversible, so a partial failure is never rolled
/// back; the outcome list tells the reconciliation process exactly which
/// transfers went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstructionOutcome {
    /// Transfer accepted by the ledger
    Submitted {
        /// Ledger reference id (transaction hash)
        reference_id: String,
    },

    /// Transfer rejected or errored
    Failed { reason: String },
}

impl InstructionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InstructionOutcome::Submitted { .. })
    }
}

/// The unit of coordination: one netting run's instructions plus approval
/// and dispatch state.
///
/// # Example
/// ```
/// use chrono::Duration;
/// use settlement_engine_core_rs::models::proposal::{
///     ProposalStatus, SettlementInstruction, SettlementProposal,
/// };
///
/// let proposal = SettlementProposal::new(
///     "circle-7".to_string(),
///     vec![SettlementInstruction::new("carol", "bob", 70)],
///     None,
///     Duration::hours(24),
/// );
///
/// assert_eq!(proposal.status(), ProposalStatus::Pending);
/// assert_eq!(proposal.quorum(), 1); // one net debtor, unanimous by default
/// assert!(proposal.is_required_signer("carol"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementProposal {
    /// Unique proposal identifier (UUID v4)
    id: ProposalId,

    /// Settlement group this proposal belongs to
    group_id: GroupId,

    /// Transfer instructions, fixed at creation
    instructions: Vec<SettlementInstruction>,

    /// Every party appearing as `from` in an instruction: each net debtor
    /// must authorize the debit
    required_signers: BTreeSet<PartyId>,

    /// Collected signatures in submission order (audit order)
    signatures: Vec<SignatureRecord>,

    /// Distinct required signatures needed before dispatch
    quorum: usize,

    /// Current lifecycle status
    status: ProposalStatus,

    /// Creation timestamp
    created_at: DateTime<Utc>,

    /// Deadline for reaching quorum
    expires_at: DateTime<Utc>,

    /// Per-instruction dispatch outcomes, aligned with `instructions`;
    /// empty until dispatch completes
    outcomes: Vec<InstructionOutcome>,
}

impl SettlementProposal {
    /// Create a new proposal in `Pending` state.
    ///
    /// `quorum_override` of `None` means unanimous debtor consent; an
    /// explicit value is clamped to `1..=required_signers.len()`.
    pub fn new(
        group_id: GroupId,
        instructions: Vec<SettlementInstruction>,
        quorum_override: Option<usize>,
        expiry_window: Duration,
    ) -> Self {
        let required_signers: BTreeSet<PartyId> = instructions
            .iter()
            .map(|instruction| instruction.from.clone())
            .collect();

        let quorum = quorum_override
            .unwrap_or(required_signers.len())
            .clamp(1, required_signers.len().max(1));

        let created_at = Utc::now();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            group_id,
            instructions,
            required_signers,
            signatures: Vec::new(),
            quorum,
            status: ProposalStatus::Pending,
            created_at,
            expires_at: created_at + expiry_window,
            outcomes: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn instructions(&self) -> &[SettlementInstruction] {
        &self.instructions
    }

    pub fn required_signers(&self) -> &BTreeSet<PartyId> {
        &self.required_signers
    }

    /// Collected signatures in submission order
    pub fn signatures(&self) -> &[SignatureRecord] {
        &self.signatures
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn status(&self) -> ProposalStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Dispatch outcomes; empty until a dispatch attempt completes
    pub fn outcomes(&self) -> &[InstructionOutcome] {
        &self.outcomes
    }

    pub fn is_required_signer(&self, party_id: &str) -> bool {
        self.required_signers.contains(party_id)
    }

    /// Signature already on file from `party_id`, if any
    pub fn signature_from(&self, party_id: &str) -> Option<&SignatureRecord> {
        self.signatures
            .iter()
            .find(|record| record.signer == party_id)
    }

    /// Number of distinct signatures collected
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Whether quorum has been reached
    pub fn quorum_reached(&self) -> bool {
        self.signature_count() >= self.quorum
    }

    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Apply a status transition, rejecting anything not in the table.
    pub fn transition(&mut self, next: ProposalStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Claim an `Approved` proposal for dispatch.
    ///
    /// Returns true iff the proposal was `Approved` and is now `Dispatching`.
    /// Callers serialize through the proposal lock, which makes this the
    /// atomic compare-and-set guarding against double dispatch.
    pub fn begin_dispatch(&mut self) -> bool {
        if self.status == ProposalStatus::Approved {
            self.status = ProposalStatus::Dispatching;
            true
        } else {
            false
        }
    }

    /// Append a signature record. No-op if the signer already has one
    /// (the signature map grows monotonically and is never overwritten).
    ///
    /// Returns true if the record was appended.
    pub fn record_signature(&mut self, record: SignatureRecord) -> bool {
        if self.signature_from(&record.signer).is_some() {
            return false;
        }
        self.signatures.push(record);
        true
    }

    /// Record the per-instruction dispatch outcomes.
    pub fn record_outcomes(&mut self, outcomes: Vec<InstructionOutcome>) {
        self.outcomes = outcomes;
    }
}
