//! Domain models for the settlement engine

pub mod debt;
pub mod proposal;

// Re-exports
pub use debt::{Debt, GroupId, PartyId};
pub use proposal::{
    InstructionOutcome, ProposalId, ProposalStatus, SettlementInstruction, SettlementProposal,
    Signature, SignatureRecord, TransitionError,
};
