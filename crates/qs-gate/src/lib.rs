//! # qs-gate
//!
//! Quiescent-sufficiency admission and commit gate.
//!
//! The gate turns an inbound request into exactly one of three signed
//! outcomes:
//!
//! - **`EXECUTED`**: the request was canonical, admitted, executed, and its
//!   artifacts matched the declared manifest; one ledger entry was appended
//! - **`REFUSED`**: something failed; state and ledger are untouched and the
//!   receipt says why
//! - **`QUIESCENT_NOOP`**: there was no request; the receipt proves nothing
//!   happened
//!
//! ## Core Concepts
//!
//! - **Canonical serialization** ([`determinism`]): the only input to any
//!   hash; fail-closed on anything without a unique encoding
//! - **State hash** ([`state`]): covers `{policyVersion, data}` and never the
//!   ledger head, so a receipt hash cannot depend on its own future cursor
//! - **Bounded emission** ([`emission`]): an executed action emits exactly
//!   its declared artifact set
//! - **Ports** ([`ports`], [`ledger`], [`crypto::ReceiptSigner`]): the caller
//!   owns policy, business logic, storage and keys
//!
//! ## Example
//!
//! ```rust
//! use qs_gate::prelude::*;
//! use serde_json::{Map, Value, json};
//!
//! fn increment(req: &CanonicalRequest, state: &State) -> Result<ExecutorOutput, ExecutorError> {
//!     let by = req.payload()["by"].as_i64().ok_or_else(|| ExecutorError::new("missing 'by'"))?;
//!     let counter = state.data.get("counter").and_then(Value::as_i64).unwrap_or(0);
//!     let mut next = state.clone();
//!     next.data.insert("counter".into(), json!(counter + by));
//!     let plan = ArtifactRef::from_content("ACTUATION_PLAN", b"counter += by");
//!     Ok(ExecutorOutput::new(next, vec![plan]))
//! }
//!
//! let manifests = GateConfig::from_toml(
//!     r#"
//!     [manifests.INCREMENT]
//!     exact_artifact_ids = ["ACTUATION_PLAN"]
//!     "#,
//! )
//! .unwrap()
//! .into_manifests()
//! .unwrap();
//!
//! let signer = Ed25519ReceiptSigner::from_seed(&[42u8; 32]);
//! let key = signer.verifying_key();
//! let mut gate = QsGate::new(signer, MemoryLedger::new("L0"), AdmitAll, increment, manifests);
//!
//! let mut data = Map::new();
//! data.insert("counter".into(), json!(0));
//! let state = State::new("L0", "P1", data);
//!
//! let result = gate
//!     .process(Some(Request::new("req-1", "INCREMENT", json!({"by": 2}))), state)
//!     .unwrap();
//!
//! assert_eq!(result.kind, ReceiptKind::Executed);
//! assert_eq!(result.state.data["counter"], 2);
//! assert_eq!(result.state.ledger_head, result.receipt.ledger_head_after);
//! assert!(verify_receipt_signature(&result.receipt, &key).is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod crypto;
pub mod determinism;
pub mod emission;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod ports;
pub mod reason;
pub mod receipt;
pub mod request;
pub mod state;

// Re-export main types at crate root for convenience
pub use config::{ConfigError, GateConfig};
pub use error::GateFault;
pub use gate::{GateResult, QsGate};
pub use reason::{ReasonCode, Refusal};
pub use receipt::{ReceiptKind, SignedReceipt};
pub use request::{CanonicalRequest, Request};
pub use state::State;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{ConfigError, GateConfig};
    pub use crate::crypto::{
        Ed25519ReceiptSigner, HashHex, ReceiptSignature, ReceiptSigner, SignerError,
    };
    pub use crate::emission::{ArtifactRef, EmissionManifest, EmissionManifests};
    pub use crate::error::GateFault;
    pub use crate::gate::{GateResult, QsGate};
    pub use crate::ledger::{AppendOutcome, Ledger, LedgerEntry, LedgerError, MemoryLedger};
    pub use crate::ports::{
        Admissibility, AdmissibilityDecision, AdmitAll, Executor, ExecutorError, ExecutorOutput,
    };
    pub use crate::reason::{ReasonCode, Refusal};
    pub use crate::receipt::{ReceiptKind, SignedReceipt, verify_receipt_signature};
    pub use crate::request::{CanonicalRequest, Request, WitnessProof};
    pub use crate::state::State;
}
