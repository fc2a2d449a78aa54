//! Faults that escape the gate.
//!
//! Anything wrong with a request becomes a signed refusal. A `GateFault`
//! means a trusted dependency is broken instead: the signer, the ledger, or
//! the caller's own input state.

use thiserror::Error;

use crate::determinism::CanonicalError;
use crate::ledger::LedgerError;
use crate::receipt::ReceiptError;

/// Fatal errors returned by [`QsGate::process`](crate::gate::QsGate::process).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GateFault {
    /// The input state cannot be hashed, so no receipt can describe it.
    #[error("input state is not canonicalizable: {0}")]
    StateEncoding(#[source] CanonicalError),

    /// Receipt signing failed.
    #[error("receipt signing failed: {0}")]
    Receipt(#[from] ReceiptError),

    /// The ledger rejected the append.
    #[error("ledger append failed: {0}")]
    Ledger(#[from] LedgerError),
}

impl GateFault {
    /// Returns `true` if the ledger may have been left in an unknown state.
    ///
    /// Only append failures can occur after a commit was attempted.
    #[must_use]
    pub const fn is_commit_failure(&self) -> bool {
        matches!(self, Self::Ledger(_))
    }
}
