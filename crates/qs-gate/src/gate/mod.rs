//! The admission and commit gate.
//!
//! One call to [`QsGate::process`] runs the full sequence for one request:
//!
//! 1. no request: sign a `QUIESCENT_NOOP` receipt and return the state
//! 2. canonicalize the request
//! 3. ask the admissibility port
//! 4. run the executor on a candidate state (errors and panics are caught)
//! 5. check the produced artifacts against the emission manifest
//! 6. sign an `EXECUTED` receipt, append it to the ledger and return the
//!    candidate state positioned at the new ledger head
//!
//! Any failure in steps 2 to 5 becomes a signed `REFUSED` receipt. Refusals
//! and no-ops hand back the input state untouched and never call the ledger;
//! the only externally visible effect of an invocation is the single append
//! in step 6.
//!
//! The gate holds no mutable state of its own apart from the ledger it
//! appends to, and [`QsGate::process`] takes `&mut self`. Owning the gate (or
//! putting it behind one lock) is what gives a governed state/ledger pair a
//! single writer.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::crypto::{HashHex, ReceiptSigner};
use crate::determinism::to_canonical_value;
use crate::emission::{EmissionManifests, enforce_emission_manifest};
use crate::error::GateFault;
use crate::ledger::{AppendOutcome, Ledger, LedgerEntry};
use crate::ports::{Admissibility, Executor, ExecutorError, ExecutorOutput};
use crate::reason::Refusal;
use crate::receipt::{ReceiptBody, ReceiptKind, RequestSummary, SignedReceipt, sign_receipt_body};
use crate::request::{CanonicalRequest, Request};
use crate::state::State;

/// The outcome of one gate invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResult {
    /// Which terminal outcome was reached.
    pub kind: ReceiptKind,
    /// Signed receipt for the outcome.
    pub receipt: SignedReceipt,
    /// The state after the invocation; the input state unless executed.
    pub state: State,
}

impl GateResult {
    /// The refusal record, if the request was refused.
    #[must_use]
    pub const fn refusal(&self) -> Option<&Refusal> {
        self.receipt.body.refusal.as_ref()
    }
}

/// Admission and commit gate over caller-supplied ports.
pub struct QsGate<S, L, A, X> {
    signer: S,
    ledger: L,
    admissibility: A,
    executor: X,
    manifests: EmissionManifests,
}

impl<S, L, A, X> QsGate<S, L, A, X> {
    /// Creates a gate.
    pub const fn new(
        signer: S,
        ledger: L,
        admissibility: A,
        executor: X,
        manifests: EmissionManifests,
    ) -> Self {
        Self {
            signer,
            ledger,
            admissibility,
            executor,
            manifests,
        }
    }

    /// The ledger the gate appends to.
    #[must_use]
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The configured emission manifests.
    #[must_use]
    pub const fn manifests(&self) -> &EmissionManifests {
        &self.manifests
    }

    /// Consumes the gate and returns its ledger.
    #[must_use]
    pub fn into_ledger(self) -> L {
        self.ledger
    }
}

impl<S, L, A, X> QsGate<S, L, A, X>
where
    S: ReceiptSigner,
    L: Ledger,
    A: Admissibility,
    X: Executor,
{
    /// Processes one request (or its absence) against `state`.
    ///
    /// Every request-shaped input yields a [`GateResult`]; refusals are data,
    /// not errors.
    ///
    /// # Errors
    ///
    /// Returns [`GateFault`] only when a trusted dependency fails: the input
    /// state cannot be hashed, the signer cannot sign, or the ledger rejects
    /// the append.
    pub fn process<P: Serialize>(
        &mut self,
        request: Option<Request<P>>,
        state: State,
    ) -> Result<GateResult, GateFault> {
        let state_hash = state.state_hash().map_err(GateFault::StateEncoding)?;

        let Some(request) = request else {
            debug!(state_hash = %state_hash, "no request, quiescent no-op");
            let body = ReceiptBody::noop(&state, state_hash);
            return self.finish_unchanged(body, state);
        };

        let canonical = match CanonicalRequest::from_request(&request) {
            Ok(canonical) => canonical,
            Err(err) => {
                // Not trustworthy enough to hash; keep whatever ids it had.
                let summary = RequestSummary {
                    request_id: request.request_id,
                    action_type: request.action_type,
                    request_hash: None,
                };
                return self.refuse(state, state_hash, summary, err.into());
            },
        };

        let request_id = canonical.request_id();
        let action_type = canonical.action_type();
        debug!(
            request_id,
            action_type,
            request_hash = %canonical.request_hash(),
            "request canonicalized"
        );
        let summary = RequestSummary {
            request_id: Some(request_id.to_string()),
            action_type: Some(action_type.to_string()),
            request_hash: Some(canonical.request_hash().clone()),
        };

        if let Some(refusal) = self.admissibility.decide(&canonical, &state).into_refusal() {
            debug!(request_id, action_type, reason_code = %refusal.reason_code, "request not admitted");
            return self.refuse(state, state_hash, summary, refusal);
        }
        debug!(request_id, action_type, "request admitted");

        let ExecutorOutput {
            new_state,
            artifacts,
        } = match run_executor(&self.executor, &canonical, &state) {
            Ok(output) => output,
            Err(err) => {
                warn!(request_id, action_type, error = %err, "executor failed, discarding candidate");
                return self.refuse(state, state_hash, summary, err.into());
            },
        };
        debug!(request_id, action_type, artifacts = artifacts.len(), "executor produced candidate");

        let artifacts = match enforce_emission_manifest(action_type, artifacts, &self.manifests) {
            Ok(artifacts) => artifacts,
            Err(err) => {
                warn!(request_id, action_type, error = %err, "emission check failed, discarding candidate");
                return self.refuse(state, state_hash, summary, err.into());
            },
        };
        debug!(request_id, action_type, "emission manifest satisfied");

        let state_hash_after = match new_state.state_hash() {
            Ok(hash) => hash,
            Err(err) => {
                warn!(request_id, action_type, error = %err, "candidate state is not canonicalizable");
                return self.refuse(state, state_hash, summary, err.into());
            },
        };

        let body = ReceiptBody::executed(&state, state_hash, state_hash_after, summary, artifacts);
        let signed = sign_receipt_body(body, &self.signer)?;
        let AppendOutcome { new_head } = self.ledger.append(LedgerEntry::for_receipt(&signed))?;

        info!(
            kind = %ReceiptKind::Executed,
            request_id,
            action_type,
            receipt_hash = %signed.body_hash,
            ledger_head = %new_head,
            "request executed and committed"
        );
        Ok(GateResult {
            kind: ReceiptKind::Executed,
            receipt: signed.anchor(new_head.clone()),
            state: new_state.with_ledger_head(new_head),
        })
    }

    fn refuse(
        &self,
        state: State,
        state_hash: HashHex,
        summary: RequestSummary,
        refusal: Refusal,
    ) -> Result<GateResult, GateFault> {
        let body = ReceiptBody::refused(&state, state_hash, summary, encodable(refusal));
        self.finish_unchanged(body, state)
    }

    /// Signs a non-executed body and returns the input state as is.
    fn finish_unchanged(&self, body: ReceiptBody, state: State) -> Result<GateResult, GateFault> {
        let kind = body.kind;
        let reason_code = body.refusal.as_ref().map(|r| r.reason_code.as_str());
        let signed = sign_receipt_body(body, &self.signer)?;
        info!(
            kind = %kind,
            reason_code,
            receipt_hash = %signed.body_hash,
            "request not committed"
        );
        Ok(GateResult {
            kind,
            receipt: signed.anchor(state.ledger_head.clone()),
            state,
        })
    }
}

fn run_executor<X: Executor>(
    executor: &X,
    request: &CanonicalRequest,
    state: &State,
) -> Result<ExecutorOutput, ExecutorError> {
    panic::catch_unwind(AssertUnwindSafe(|| executor.execute(request, state)))
        .unwrap_or_else(|payload| Err(ExecutorError::new(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    format!("executor panicked: {detail}")
}

/// Port-supplied details may nest too deeply to sign; keep the diagnosis.
fn encodable(refusal: Refusal) -> Refusal {
    if refusal.details.is_none() {
        return refusal;
    }
    // Same nesting the refusal has inside a receipt body. A body within
    // MAX_DEPTH also re-parses once wrapped in a stored SignedReceipt.
    match to_canonical_value(&[&refusal]) {
        Ok(_) => refusal,
        Err(err) => Refusal {
            details: Some(err.details()),
            ..refusal
        },
    }
}
