//! Python FFI surface (feature `pyo3`)
//!
//! The surrounding system is a Python backend; this module exposes the
//! engine's four operations (compute, sign, get, dispatch) plus expiry
//! sweeping to that host. The two external collaborators (signature
//! verification and ledger transfers) stay on the Python side and are
//! supplied as callables at construction time.

pub mod engine;
pub mod types;

pub use engine::PySettlementEngine;
