//! Signed receipts for every gate outcome.
//!
//! A receipt body is canonicalized, hashed and handed to the signer. The
//! ledger head after the outcome is attached afterwards as an envelope field
//! ([`SignedReceipt::ledger_head_after`]); it is not covered by the hash or
//! the signature, since the ledger can only produce it once the signed hash
//! exists.
//!
//! # Example
//!
//! ```
//! use qs_gate::crypto::Ed25519ReceiptSigner;
//! use qs_gate::receipt::{ReceiptBody, sign_receipt_body, verify_receipt_signature};
//! use qs_gate::state::State;
//!
//! let state = State::new("L0", "P1", serde_json::Map::new());
//! let body = ReceiptBody::noop(&state, state.state_hash().unwrap());
//!
//! let signer = Ed25519ReceiptSigner::from_seed(&[1u8; 32]);
//! let receipt = sign_receipt_body(body, &signer).unwrap().anchor(state.ledger_head.clone());
//!
//! assert!(verify_receipt_signature(&receipt, &signer.verifying_key()).is_ok());
//! ```

mod verify;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use verify::{ReceiptVerifyError, verify_receipt_signature};

use crate::crypto::{HashHex, ReceiptSignature, ReceiptSigner, SignerError, sha256_hex};
use crate::determinism::{CanonicalError, to_canonical_string};
use crate::emission::ArtifactRef;
use crate::reason::Refusal;
use crate::state::State;

/// Schema tag carried by every receipt body.
pub const RECEIPT_SCHEMA: &str = "TAS_QS_RECEIPT_V1";

/// The three terminal outcomes of one gate invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptKind {
    /// The request ran and its result was committed.
    Executed,
    /// The request was refused; nothing changed.
    Refused,
    /// There was no request; nothing changed.
    QuiescentNoop,
}

impl ReceiptKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Executed => "EXECUTED",
            Self::Refused => "REFUSED",
            Self::QuiescentNoop => "QUIESCENT_NOOP",
        }
    }
}

impl std::fmt::Display for ReceiptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request metadata recorded in a receipt.
///
/// Every field is nullable: a request that failed canonicalization keeps
/// whatever identifiers it had, but never a hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    /// Request id, if known.
    pub request_id: Option<String>,
    /// Action type, if known.
    pub action_type: Option<String>,
    /// Hash of the canonical request, if it could be canonicalized.
    pub request_hash: Option<HashHex>,
}

/// The signed part of a receipt.
///
/// Construct bodies through [`ReceiptBody::noop`], [`ReceiptBody::refused`]
/// and [`ReceiptBody::executed`]; those enforce that non-executed bodies
/// carry no state change and no artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReceiptBody {
    /// Always [`RECEIPT_SCHEMA`].
    pub schema: String,
    /// Outcome kind.
    pub kind: ReceiptKind,
    /// Policy version of the input state.
    pub policy_version: String,
    /// State hash before the invocation.
    pub state_hash_before: HashHex,
    /// State hash after the invocation.
    pub state_hash_after: HashHex,
    /// Ledger head of the input state.
    pub ledger_head_before: String,
    /// Request metadata; `null` for a no-op.
    pub request: Option<RequestSummary>,
    /// Emitted artifacts, sorted by id; empty unless executed.
    pub artifacts: Vec<ArtifactRef>,
    /// Refusal record; present exactly when refused.
    pub refusal: Option<Refusal>,
}

impl ReceiptBody {
    /// Body for an invocation without a request.
    #[must_use]
    pub fn noop(state: &State, state_hash: HashHex) -> Self {
        Self {
            schema: RECEIPT_SCHEMA.to_string(),
            kind: ReceiptKind::QuiescentNoop,
            policy_version: state.policy_version.clone(),
            state_hash_before: state_hash.clone(),
            state_hash_after: state_hash,
            ledger_head_before: state.ledger_head.clone(),
            request: None,
            artifacts: Vec::new(),
            refusal: None,
        }
    }

    /// Body for a refused request.
    #[must_use]
    pub fn refused(
        state: &State,
        state_hash: HashHex,
        request: RequestSummary,
        refusal: Refusal,
    ) -> Self {
        Self {
            schema: RECEIPT_SCHEMA.to_string(),
            kind: ReceiptKind::Refused,
            policy_version: state.policy_version.clone(),
            state_hash_before: state_hash.clone(),
            state_hash_after: state_hash,
            ledger_head_before: state.ledger_head.clone(),
            request: Some(request),
            artifacts: Vec::new(),
            refusal: Some(refusal),
        }
    }

    /// Body for an executed request. `artifacts` must already be normalized.
    #[must_use]
    pub fn executed(
        state: &State,
        state_hash_before: HashHex,
        state_hash_after: HashHex,
        request: RequestSummary,
        artifacts: Vec<ArtifactRef>,
    ) -> Self {
        Self {
            schema: RECEIPT_SCHEMA.to_string(),
            kind: ReceiptKind::Executed,
            policy_version: state.policy_version.clone(),
            state_hash_before,
            state_hash_after,
            ledger_head_before: state.ledger_head.clone(),
            request: Some(request),
            artifacts,
            refusal: None,
        }
    }
}

/// Errors raised while signing a receipt body.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReceiptError {
    /// The body has no canonical encoding.
    #[error("receipt body is not canonicalizable: {0}")]
    Encoding(#[from] CanonicalError),

    /// The signer failed.
    #[error(transparent)]
    Signer(#[from] SignerError),
}

/// A signed body that has not yet been given its ledger head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedReceiptBody {
    /// The signed body.
    pub body: ReceiptBody,
    /// Canonical encoding of `body`.
    pub body_canonical: String,
    /// Hash of `body_canonical`.
    pub body_hash: HashHex,
    /// Signer output over `body_hash`.
    pub signature: ReceiptSignature,
}

impl SignedReceiptBody {
    /// Attaches the post-outcome ledger head.
    #[must_use]
    pub fn anchor(self, ledger_head_after: impl Into<String>) -> SignedReceipt {
        SignedReceipt {
            body: self.body,
            body_canonical: self.body_canonical,
            body_hash: self.body_hash,
            signature: self.signature,
            ledger_head_after: ledger_head_after.into(),
        }
    }
}

/// A complete receipt as returned by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignedReceipt {
    /// The signed body.
    pub body: ReceiptBody,
    /// Canonical encoding of `body`.
    pub body_canonical: String,
    /// Hash of `body_canonical`.
    pub body_hash: HashHex,
    /// Signer output over `body_hash`.
    pub signature: ReceiptSignature,
    /// Ledger head after the outcome. Not signed.
    pub ledger_head_after: String,
}

/// Canonicalizes, hashes and signs a receipt body.
///
/// # Errors
///
/// Returns [`ReceiptError::Encoding`] if the body cannot be canonicalized
/// and [`ReceiptError::Signer`] if the signer fails.
pub fn sign_receipt_body<S>(body: ReceiptBody, signer: &S) -> Result<SignedReceiptBody, ReceiptError>
where
    S: ReceiptSigner + ?Sized,
{
    let body_canonical = to_canonical_string(&body)?;
    let body_hash = sha256_hex(&body_canonical);
    let signature = signer.sign(&body_hash, &body_canonical)?;
    Ok(SignedReceiptBody {
        body,
        body_canonical,
        body_hash,
        signature,
    })
}
