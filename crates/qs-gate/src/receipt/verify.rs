//! Verification of receipts read back from storage.

use ed25519_dalek::VerifyingKey;
use thiserror::Error;

use super::{RECEIPT_SCHEMA, ReceiptBody, ReceiptKind, SignedReceipt};
use crate::crypto::{HashHex, SignatureError, sha256_hex, verify_signature};
use crate::determinism::{CanonicalError, to_canonical_string};

/// Errors that can occur when verifying a receipt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReceiptVerifyError {
    /// The body carries an unknown schema tag.
    #[error("unknown receipt schema '{schema}'")]
    UnknownSchema {
        /// The schema found.
        schema: String,
    },

    /// The body cannot be canonicalized.
    #[error("receipt body is not canonicalizable: {0}")]
    Encoding(#[from] CanonicalError),

    /// The stored canonical text is not the canonical encoding of the body.
    #[error("stored canonical body does not match the body")]
    CanonicalMismatch,

    /// The stored hash is not the hash of the canonical text.
    #[error("body hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Hash recomputed from the canonical text.
        expected: HashHex,
        /// Hash stored in the envelope.
        actual: HashHex,
    },

    /// The body violates the shape its kind requires.
    #[error("receipt invariant violated: {reason}")]
    InvariantViolated {
        /// Which rule was broken.
        reason: &'static str,
    },

    /// The signature does not verify.
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl ReceiptBody {
    /// Checks the shape rules for this body's kind.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptVerifyError::InvariantViolated`] naming the first
    /// broken rule.
    pub fn check_invariants(&self) -> Result<(), ReceiptVerifyError> {
        let violated = |reason: &'static str| -> Result<(), ReceiptVerifyError> {
            Err(ReceiptVerifyError::InvariantViolated { reason })
        };
        if self.kind == ReceiptKind::Executed {
            if self.refusal.is_some() {
                return violated("executed receipt carries a refusal");
            }
            if self.request.is_none() {
                return violated("executed receipt has no request");
            }
            return Ok(());
        }
        if self.state_hash_before != self.state_hash_after {
            return violated("non-executed receipt changes the state hash");
        }
        if !self.artifacts.is_empty() {
            return violated("non-executed receipt lists artifacts");
        }
        match (self.kind, &self.refusal, &self.request) {
            (ReceiptKind::Refused, None, _) => violated("refused receipt has no refusal"),
            (ReceiptKind::QuiescentNoop, Some(_), _) => violated("no-op receipt carries a refusal"),
            (ReceiptKind::QuiescentNoop, _, Some(_)) => violated("no-op receipt has a request"),
            _ => Ok(()),
        }
    }
}

impl SignedReceipt {
    /// Recomputes the canonical body and its hash and checks them against
    /// the envelope, along with the body's shape rules.
    ///
    /// This does not check the signature; see [`verify_receipt_signature`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ReceiptVerifyError`] found.
    pub fn verify_integrity(&self) -> Result<(), ReceiptVerifyError> {
        if self.body.schema != RECEIPT_SCHEMA {
            return Err(ReceiptVerifyError::UnknownSchema {
                schema: self.body.schema.clone(),
            });
        }
        if to_canonical_string(&self.body)? != self.body_canonical {
            return Err(ReceiptVerifyError::CanonicalMismatch);
        }
        let expected = sha256_hex(&self.body_canonical);
        if expected != self.body_hash {
            return Err(ReceiptVerifyError::HashMismatch {
                expected,
                actual: self.body_hash.clone(),
            });
        }
        self.body.check_invariants()?;
        if self.body.kind != ReceiptKind::Executed
            && self.ledger_head_after != self.body.ledger_head_before
        {
            return Err(ReceiptVerifyError::InvariantViolated {
                reason: "non-executed receipt moves the ledger head",
            });
        }
        Ok(())
    }
}

/// Verifies integrity and the Ed25519 signature of a receipt.
///
/// # Errors
///
/// Returns [`ReceiptVerifyError`] if the receipt is inconsistent or the
/// signature does not verify under `key`.
pub fn verify_receipt_signature(
    receipt: &SignedReceipt,
    key: &VerifyingKey,
) -> Result<(), ReceiptVerifyError> {
    receipt.verify_integrity()?;
    verify_signature(key, &receipt.body_hash, &receipt.signature)?;
    Ok(())
}
