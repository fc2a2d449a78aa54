//! Signer port and the Ed25519 adapter.

use std::fmt;
use std::sync::Arc;

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hash::HashHex;

/// An opaque receipt signature as produced by a [`ReceiptSigner`].
///
/// The gate never interprets the contents; the Ed25519 adapter uses lowercase
/// hex of the 64 signature bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptSignature(String);

impl ReceiptSignature {
    /// Wraps a signer-specific signature string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the signature string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the signer produced nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ReceiptSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors a signer may report.
///
/// These are never converted into refusals: a signer that cannot sign is a
/// broken trusted dependency and the failure propagates to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SignerError {
    /// The signing key could not be loaded or is not available.
    #[error("signing key unavailable: {reason}")]
    KeyUnavailable {
        /// Why the key is unavailable.
        reason: String,
    },

    /// The signing operation itself failed.
    #[error("signing failed: {reason}")]
    SigningFailed {
        /// Why signing failed.
        reason: String,
    },
}

impl SignerError {
    /// Creates a key unavailable error.
    #[must_use]
    pub fn key_unavailable(reason: impl Into<String>) -> Self {
        Self::KeyUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a signing failed error.
    #[must_use]
    pub fn signing_failed(reason: impl Into<String>) -> Self {
        Self::SigningFailed {
            reason: reason.into(),
        }
    }
}

/// Signs receipt body hashes.
///
/// Implementations receive both the hash and the canonical body text it was
/// computed from; which one they commit to is their own choice.
pub trait ReceiptSigner {
    /// Signs one receipt body.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError`] if no signature can be produced.
    fn sign(
        &self,
        body_hash: &HashHex,
        body_canonical: &str,
    ) -> Result<ReceiptSignature, SignerError>;
}

impl<S: ReceiptSigner + ?Sized> ReceiptSigner for &S {
    fn sign(
        &self,
        body_hash: &HashHex,
        body_canonical: &str,
    ) -> Result<ReceiptSignature, SignerError> {
        (**self).sign(body_hash, body_canonical)
    }
}

impl<S: ReceiptSigner + ?Sized> ReceiptSigner for Box<S> {
    fn sign(
        &self,
        body_hash: &HashHex,
        body_canonical: &str,
    ) -> Result<ReceiptSignature, SignerError> {
        (**self).sign(body_hash, body_canonical)
    }
}

impl<S: ReceiptSigner + ?Sized> ReceiptSigner for Arc<S> {
    fn sign(
        &self,
        body_hash: &HashHex,
        body_canonical: &str,
    ) -> Result<ReceiptSignature, SignerError> {
        (**self).sign(body_hash, body_canonical)
    }
}

/// Ed25519 signer over the raw 32 bytes of the body hash.
pub struct Ed25519ReceiptSigner {
    signing_key: SigningKey,
}

impl Ed25519ReceiptSigner {
    /// Wraps an existing signing key.
    #[must_use]
    pub const fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Derives a signer from a 32-byte secret seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(seed))
    }

    /// Returns the public half of the key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl fmt::Debug for Ed25519ReceiptSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519ReceiptSigner")
            .field("public_key", &hex::encode(self.verifying_key().as_bytes()))
            .finish_non_exhaustive()
    }
}

impl ReceiptSigner for Ed25519ReceiptSigner {
    fn sign(
        &self,
        body_hash: &HashHex,
        _body_canonical: &str,
    ) -> Result<ReceiptSignature, SignerError> {
        let signature = self.signing_key.sign(&body_hash.to_bytes());
        Ok(ReceiptSignature(hex::encode(signature.to_bytes())))
    }
}

/// Errors that can occur when verifying an Ed25519 receipt signature.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature string is not 128 hex characters.
    #[error("malformed signature: {reason}")]
    Malformed {
        /// What is wrong with the encoding.
        reason: String,
    },

    /// The signature does not verify under the given key.
    #[error("signature verification failed")]
    Invalid,
}

/// Verifies an Ed25519 signature produced by [`Ed25519ReceiptSigner`].
///
/// # Errors
///
/// Returns [`SignatureError`] if the signature is malformed or does not
/// verify.
pub fn verify_signature(
    key: &VerifyingKey,
    body_hash: &HashHex,
    signature: &ReceiptSignature,
) -> Result<(), SignatureError> {
    let bytes = hex::decode(signature.as_str()).map_err(|e| SignatureError::Malformed {
        reason: e.to_string(),
    })?;
    let signature = Signature::from_slice(&bytes).map_err(|e| SignatureError::Malformed {
        reason: e.to_string(),
    })?;
    key.verify(&body_hash.to_bytes(), &signature)
        .map_err(|_| SignatureError::Invalid)
}
