//! Ledger port and an in-memory reference ledger.
//!
//! The gate appends exactly one [`LedgerEntry`] per executed outcome and
//! nothing otherwise. Storage is owned by the caller; the gate only sees the
//! [`Ledger`] contract.
//!
//! # Example
//!
//! ```
//! use qs_gate::ledger::MemoryLedger;
//!
//! let ledger = MemoryLedger::new("L0");
//! assert_eq!(ledger.head(), "L0");
//! assert!(ledger.entries().is_empty());
//! ```

mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryLedger;

use crate::crypto::{HashHex, ReceiptSignature};
use crate::receipt::SignedReceiptBody;

/// Schema tag carried by every ledger entry.
pub const LEDGER_ENTRY_SCHEMA: &str = "TAS_LEDGER_ENTRY_V1";

/// Entry type for committed gate receipts.
pub const LEDGER_ENTRY_TYPE: &str = "QS_RECEIPT";

/// The durable record of one executed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LedgerEntry {
    /// Always [`LEDGER_ENTRY_SCHEMA`].
    pub schema: String,
    /// Always [`LEDGER_ENTRY_TYPE`].
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Hash of the signed receipt body.
    pub receipt_hash: HashHex,
    /// Signature over `receipt_hash`.
    pub signature: ReceiptSignature,
    /// Hash of the canonical request.
    pub request_hash: Option<HashHex>,
    /// State hash before execution.
    pub state_hash_before: HashHex,
    /// State hash after execution.
    pub state_hash_after: HashHex,
    /// Ledger head the entry was written against.
    pub ledger_head_before: String,
}

impl LedgerEntry {
    /// Builds the entry for a signed receipt body.
    #[must_use]
    pub fn for_receipt(signed: &SignedReceiptBody) -> Self {
        Self {
            schema: LEDGER_ENTRY_SCHEMA.to_string(),
            entry_type: LEDGER_ENTRY_TYPE.to_string(),
            receipt_hash: signed.body_hash.clone(),
            signature: signed.signature.clone(),
            request_hash: signed
                .body
                .request
                .as_ref()
                .and_then(|request| request.request_hash.clone()),
            state_hash_before: signed.body.state_hash_before.clone(),
            state_hash_after: signed.body.state_hash_after.clone(),
            ledger_head_before: signed.body.ledger_head_before.clone(),
        }
    }
}

/// Result of a successful append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// The ledger head after the append.
    pub new_head: String,
}

/// Errors that can occur when appending to a ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    /// The entry was written against a head that is no longer current.
    #[error("stale ledger head: ledger is at '{expected}', entry expects '{actual}'")]
    HeadMismatch {
        /// The ledger's current head.
        expected: String,
        /// The head recorded in the entry.
        actual: String,
    },

    /// Recomputing the head chain did not reproduce a stored head.
    #[error("hash chain broken at index={index}: {details}")]
    HashChainBroken {
        /// Position of the offending entry.
        index: usize,
        /// Details about the failure.
        details: String,
    },

    /// A storage backend failure.
    #[error("ledger backend error: {message}")]
    Backend {
        /// Backend-specific description.
        message: String,
    },
}

impl LedgerError {
    /// Creates a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Append-only storage for committed receipts.
pub trait Ledger {
    /// Appends one entry and returns the new head.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry cannot be durably appended. The
    /// gate does not retry.
    fn append(&mut self, entry: LedgerEntry) -> Result<AppendOutcome, LedgerError>;
}

impl<L: Ledger + ?Sized> Ledger for &mut L {
    fn append(&mut self, entry: LedgerEntry) -> Result<AppendOutcome, LedgerError> {
        (**self).append(entry)
    }
}

impl<L: Ledger + ?Sized> Ledger for Box<L> {
    fn append(&mut self, entry: LedgerEntry) -> Result<AppendOutcome, LedgerError> {
        (**self).append(entry)
    }
}
