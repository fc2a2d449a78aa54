//! Hashing and signing primitives for receipts and ledger entries.
//!
//! - **SHA-256 hashing**: every fingerprint is `SHA-256(canonical text)`,
//!   rendered as lowercase hex ([`HashHex`])
//! - **Signer port**: the gate only ever asks a [`ReceiptSigner`] to sign a
//!   body hash; key custody is the caller's concern
//! - **Ed25519 adapter**: [`Ed25519ReceiptSigner`] is a ready-made signer
//!   over the raw 32 hash bytes
//!
//! # Example
//!
//! ```
//! use qs_gate::crypto::{Ed25519ReceiptSigner, ReceiptSigner, canonical_hash, verify_signature};
//! use serde_json::json;
//!
//! let hash = canonical_hash(&json!({"b": 2, "a": 1})).unwrap();
//! assert_eq!(hash.as_str().len(), 64);
//!
//! let signer = Ed25519ReceiptSigner::from_seed(&[7u8; 32]);
//! let signature = signer.sign(&hash, r#"{"a":1,"b":2}"#).unwrap();
//! assert!(verify_signature(&signer.verifying_key(), &hash, &signature).is_ok());
//! ```

mod hash;
mod sign;

pub use hash::{HASH_SIZE, Hash, HashHex, HashHexError, canonical_hash, sha256, sha256_hex};
pub use sign::{
    Ed25519ReceiptSigner, ReceiptSignature, ReceiptSigner, SignatureError, SignerError,
    verify_signature,
};
