//! PyO3 wrapper for the settlement coordinator
//!
//! This class is the Python host's entry point to the engine.
//!
//! # Example (from Python)
//!
//! ```python
//! from settlement_engine_core_rs import SettlementEngine
//!
//! def verify(proposal_id, party_id, signature, instructions):
//!     return wallet_service.verify(proposal_id, party_id, signature)
//!
//! def submit_transfer(from_party, to_party, amount):
//!     return xrpl_client.create_escrow(from_party, to_party, amount)  # -> tx hash
//!
//! engine = SettlementEngine(verify, submit_transfer, {"expiry_window_secs": 3600})
//!
//! proposal = engine.compute_settlement("circle-7", [
//!     {"debtor": "alice", "creditor": "bob", "amount": 100_000},
//! ])
//! status = engine.sign_settlement(proposal["id"], "alice", signature_blob)
//! if status == "APPROVED":
//!     engine.dispatch_settlement(proposal["id"])
//! ```

use std::sync::Arc;

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use tracing::warn;

use crate::coordinator::{CoordinatorConfig, SettlementCoordinator, SignatureVerifier};
use crate::dispatch::{LedgerClient, TransferError};
use crate::models::debt::PartyId;
use crate::models::proposal::{SettlementInstruction, Signature};

use super::types::{
    coordinator_error_to_py, parse_config, parse_debts, proposal_to_py, status_to_str,
};

/// Signature verifier backed by a Python callable
/// `(proposal_id, party_id, signature, instructions) -> bool`,
/// where `instructions` is a list of `(from, to, amount)` tuples.
struct PyCallbackVerifier {
    callback: Py<PyAny>,
}

impl SignatureVerifier for PyCallbackVerifier {
    fn verify(
        &self,
        proposal_id: &str,
        party_id: &PartyId,
        signature: &Signature,
        instructions: &[SettlementInstruction],
    ) -> bool {
        Python::with_gil(|py| {
            let instruction_tuples: Vec<(String, String, i64)> = instructions
                .iter()
                .map(|i| (i.from.clone(), i.to.clone(), i.amount))
                .collect();

            let result = self.callback.call1(
                py,
                (proposal_id, party_id, signature, instruction_tuples),
            );

            match result.and_then(|value| value.extract::<bool>(py)) {
                Ok(valid) => valid,
                Err(error) => {
                    // A broken verifier must never approve anything
                    warn!(proposal_id, party_id = %party_id, %error, "verifier callback failed");
                    false
                }
            }
        })
    }
}

/// Ledger client backed by a Python callable
/// `(from_party, to_party, amount) -> reference_id`; a raised exception is a
/// failed transfer.
struct PyCallbackLedger {
    callback: Py<PyAny>,
}

impl LedgerClient for PyCallbackLedger {
    fn submit_transfer(
        &self,
        from: &PartyId,
        to: &PartyId,
        amount: i64,
    ) -> Result<String, TransferError> {
        Python::with_gil(|py| {
            self.callback
                .call1(py, (from, to, amount))
                .and_then(|value| value.extract::<String>(py))
                .map_err(|error| TransferError::new(error.to_string()))
        })
    }
}

/// Python wrapper for the settlement coordinator
#[pyclass(name = "SettlementEngine")]
pub struct PySettlementEngine {
    inner: Arc<SettlementCoordinator>,
}

#[pymethods]
impl PySettlementEngine {
    /// Create an engine.
    ///
    /// # Arguments
    ///
    /// * `verifier` - callable `(proposal_id, party_id, signature, instructions) -> bool`
    /// * `ledger` - callable `(from_party, to_party, amount) -> reference_id`,
    ///   raising on failure
    /// * `config` - optional dict: `expiry_window_secs`, `quorum`
    #[new]
    #[pyo3(signature = (verifier, ledger, config = None))]
    fn new(
        verifier: Py<PyAny>,
        ledger: Py<PyAny>,
        config: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<Self> {
        let config = match config {
            Some(config) => parse_config(config)?,
            None => CoordinatorConfig::default(),
        };

        let inner = Arc::new(SettlementCoordinator::new(
            config,
            Arc::new(PyCallbackVerifier { callback: verifier }),
            Arc::new(PyCallbackLedger { callback: ledger }),
        ));

        Ok(Self { inner })
    }

    /// Run the netting pipeline over a debt snapshot and create the group's
    /// proposal. Returns the proposal as a dict.
    ///
    /// Raises ValueError for invalid debts, an already-active proposal, or a
    /// snapshot with nothing left to settle.
    fn compute_settlement(
        &self,
        py: Python<'_>,
        group_id: &str,
        debts: &Bound<'_, PyList>,
    ) -> PyResult<Py<PyDict>> {
        let debts = parse_debts(debts)?;
        let proposal = py
            .allow_threads(|| self.inner.compute_settlement(group_id, &debts))
            .map_err(coordinator_error_to_py)?;
        proposal_to_py(py, &proposal)
    }

    /// Submit one party's signature. Returns the resulting status string.
    ///
    /// The GIL is released while the proposal lock is held: the verifier
    /// callback on a racing submission needs it.
    fn sign_settlement(
        &self,
        py: Python<'_>,
        proposal_id: &str,
        party_id: &str,
        signature: &str,
    ) -> PyResult<String> {
        let party_id = party_id.to_string();
        let signature = signature.to_string();
        let status = py
            .allow_threads(|| self.inner.submit_signature(proposal_id, &party_id, &signature))
            .map_err(coordinator_error_to_py)?;
        Ok(status_to_str(status).to_string())
    }

    /// Read-only proposal snapshot as a dict
    fn get_proposal(&self, py: Python<'_>, proposal_id: &str) -> PyResult<Py<PyDict>> {
        let proposal = py
            .allow_threads(|| self.inner.get_proposal(proposal_id))
            .map_err(coordinator_error_to_py)?;
        proposal_to_py(py, &proposal)
    }

    /// Dispatch an approved proposal. Returns the resulting status string
    /// (`EXECUTED` or `FAILED`).
    fn dispatch_settlement(&self, py: Python<'_>, proposal_id: &str) -> PyResult<String> {
        let status = py
            .allow_threads(|| self.inner.dispatch(proposal_id))
            .map_err(coordinator_error_to_py)?;
        Ok(status_to_str(status).to_string())
    }

    /// Expire stale proposals; returns their ids
    fn sweep_expired(&self, py: Python<'_>) -> Vec<String> {
        py.allow_threads(|| self.inner.sweep_expired())
    }

    /// The group's active proposal id, if any
    fn active_proposal(&self, py: Python<'_>, group_id: &str) -> Option<String> {
        py.allow_threads(|| self.inner.active_proposal(group_id))
    }
}
