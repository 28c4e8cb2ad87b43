//! Settlement Engine Core - Rust Engine
//!
//! Debt-netting and multi-party settlement engine for peer-to-peer lending
//! groups: collapses circular and offsetting obligations into a minimal set
//! of net transfers, then coordinates threshold-signature approval before any
//! transfer is dispatched exactly once.
//!
//! # Architecture
//!
//! - **models**: Domain types (Debt, SettlementProposal, status machine)
//! - **netting**: Pure planning pipeline (graph, cycles, reduction, netting,
//!   instruction generation)
//! - **coordinator**: Proposal lifecycle under concurrent signer input
//! - **dispatch**: Thin gateway over the external ledger client
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (drops), never floating point
//! 2. Conservation: balances sum to zero through every netting step, and the
//!    instruction list reproduces them exactly
//! 3. At most one active proposal per settlement group; dispatch fires at
//!    most once per proposal
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod coordinator;
pub mod dispatch;
pub mod models;
pub mod netting;

// Re-exports for convenience
pub use coordinator::{
    CoordinatorConfig, CoordinatorError, ExpirySweeper, SettlementCoordinator, SignatureVerifier,
};
pub use dispatch::{DispatchGateway, DispatchReport, LedgerClient, TransferError};
pub use models::{
    debt::{Debt, GroupId, PartyId},
    proposal::{
        InstructionOutcome, ProposalId, ProposalStatus, SettlementInstruction,
        SettlementProposal, Signature, SignatureRecord,
    },
};
pub use netting::{plan_settlement, NetBalance, NettingError, SettlementPlan};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn settlement_engine_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::PySettlementEngine>()?;
    Ok(())
}
