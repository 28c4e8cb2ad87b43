//! Conversions between Python values and engine types

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::coordinator::{CoordinatorConfig, CoordinatorError};
use crate::models::debt::Debt;
use crate::models::proposal::{InstructionOutcome, ProposalStatus, SettlementProposal};
use crate::netting::NettingError;

/// Parse the optional engine configuration dict.
///
/// Recognized keys: `expiry_window_secs` (int), `quorum` (int).
pub fn parse_config(config: &Bound<'_, PyDict>) -> PyResult<CoordinatorConfig> {
    let mut parsed = CoordinatorConfig::default();

    if let Some(value) = config.get_item("expiry_window_secs")? {
        parsed.expiry_window_secs = value.extract()?;
        if parsed.expiry_window_secs <= 0 {
            return Err(PyValueError::new_err(
                "expiry_window_secs must be positive",
            ));
        }
    }

    if let Some(value) = config.get_item("quorum")? {
        parsed.quorum = Some(value.extract()?);
    }

    Ok(parsed)
}

/// Parse a debt snapshot: a list of dicts with `debtor`, `creditor`,
/// `amount` keys (amount in drops).
pub fn parse_debts(debts: &Bound<'_, PyList>) -> PyResult<Vec<Debt>> {
    let mut parsed = Vec::with_capacity(debts.len());

    for entry in debts.iter() {
        let entry = entry.downcast::<PyDict>().map_err(|_| {
            PyValueError::new_err("each debt must be a dict with debtor/creditor/amount")
        })?;

        let debtor: String = required_item(entry, "debtor")?;
        let creditor: String = required_item(entry, "creditor")?;
        let amount: i64 = required_item(entry, "amount")?;

        parsed.push(Debt::new(debtor, creditor, amount));
    }

    Ok(parsed)
}

fn required_item<'py, T: FromPyObject<'py>>(
    dict: &Bound<'py, PyDict>,
    key: &str,
) -> PyResult<T> {
    dict.get_item(key)?
        .ok_or_else(|| PyValueError::new_err(format!("debt missing required key '{key}'")))?
        .extract()
}

/// Wire status name for the Python host
pub fn status_to_str(status: ProposalStatus) -> &'static str {
    match status {
        ProposalStatus::Pending => "PENDING",
        ProposalStatus::PartiallySigned => "PARTIALLY_SIGNED",
        ProposalStatus::Approved => "APPROVED",
        ProposalStatus::Dispatching => "DISPATCHING",
        ProposalStatus::Executed => "EXECUTED",
        ProposalStatus::Expired => "EXPIRED",
        ProposalStatus::Failed => "FAILED",
    }
}

/// Convert a proposal snapshot to a Python dict, preserving instruction and
/// signature order.
pub fn proposal_to_py(py: Python<'_>, proposal: &SettlementProposal) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);

    dict.set_item("id", proposal.id())?;
    dict.set_item("group_id", proposal.group_id())?;
    dict.set_item("status", status_to_str(proposal.status()))?;
    dict.set_item("quorum", proposal.quorum())?;
    dict.set_item("created_at", proposal.created_at().to_rfc3339())?;
    dict.set_item("expires_at", proposal.expires_at().to_rfc3339())?;

    let instructions = PyList::empty_bound(py);
    for instruction in proposal.instructions() {
        let entry = PyDict::new_bound(py);
        entry.set_item("from", &instruction.from)?;
        entry.set_item("to", &instruction.to)?;
        entry.set_item("amount", instruction.amount)?;
        instructions.append(entry)?;
    }
    dict.set_item("instructions", instructions)?;

    let signers: Vec<&str> = proposal
        .required_signers()
        .iter()
        .map(String::as_str)
        .collect();
    dict.set_item("required_signers", signers)?;

    let signatures = PyList::empty_bound(py);
    for record in proposal.signatures() {
        let entry = PyDict::new_bound(py);
        entry.set_item("signer", &record.signer)?;
        entry.set_item("signature", &record.signature)?;
        entry.set_item("signed_at", record.signed_at.to_rfc3339())?;
        signatures.append(entry)?;
    }
    dict.set_item("signatures", signatures)?;

    let outcomes = PyList::empty_bound(py);
    for outcome in proposal.outcomes() {
        let entry = PyDict::new_bound(py);
        match outcome {
            InstructionOutcome::Submitted { reference_id } => {
                entry.set_item("success", true)?;
                entry.set_item("reference_id", reference_id)?;
            }
            InstructionOutcome::Failed { reason } => {
                entry.set_item("success", false)?;
                entry.set_item("reason", reason)?;
            }
        }
        outcomes.append(entry)?;
    }
    dict.set_item("outcomes", outcomes)?;

    Ok(dict.into())
}

/// Map engine errors onto Python exceptions: invariant breaches are
/// RuntimeError (bugs), everything else is ValueError (caller input).
pub fn coordinator_error_to_py(error: CoordinatorError) -> PyErr {
    match &error {
        CoordinatorError::Netting(NettingError::ConservationViolation { .. }) => {
            PyRuntimeError::new_err(error.to_string())
        }
        _ => PyValueError::new_err(error.to_string()),
    }
}
