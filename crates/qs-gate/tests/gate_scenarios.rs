//! End-to-end scenarios for the admission and commit gate.
//!
//! Each test drives [`QsGate::process`] with scripted ports and checks the
//! outcome, the receipt, the returned state and the ledger:
//!
//! - Non-canonical payloads refuse before any port is called
//! - Admissibility refusals never reach the executor
//! - Emission violations discard the candidate state
//! - Successful execution appends exactly once and moves the head
//! - An absent request still produces a signed receipt

mod common;

use std::cell::Cell;

use common::{GENESIS, counter, increment, manifests, plan, request, signer, state};
use qs_gate::prelude::*;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct Reading {
    sensor: &'static str,
    value: f64,
}

fn gate_with<A, X>(admissibility: A, executor: X) -> QsGate<Ed25519ReceiptSigner, MemoryLedger, A, X>
where
    A: Admissibility,
    X: Executor,
{
    QsGate::new(
        signer(),
        MemoryLedger::new(GENESIS),
        admissibility,
        executor,
        manifests(),
    )
}

fn assert_unchanged(result: &GateResult, input: &State, ledger: &MemoryLedger) {
    assert_eq!(&result.state, input);
    assert_eq!(result.receipt.ledger_head_after, input.ledger_head);
    assert_eq!(
        result.receipt.body.state_hash_before,
        result.receipt.body.state_hash_after
    );
    assert_eq!(
        result.receipt.body.state_hash_before,
        input.state_hash().unwrap()
    );
    assert!(result.receipt.body.artifacts.is_empty());
    assert!(ledger.is_empty());
    assert_eq!(ledger.head(), GENESIS);
    assert!(verify_receipt_signature(&result.receipt, &signer().verifying_key()).is_ok());
}

#[test]
fn test_non_canonical_payload_refuses_before_ports() {
    let admitted = Cell::new(0);
    let executed = Cell::new(0);
    let mut gate = gate_with(
        |_: &CanonicalRequest, _: &State| {
            admitted.set(admitted.get() + 1);
            AdmissibilityDecision::Admit
        },
        |req: &CanonicalRequest, st: &State| {
            executed.set(executed.get() + 1);
            increment(req, st)
        },
    );

    let input = state(0);
    let bad = Request::new(
        "req-a",
        "INCREMENT",
        Reading {
            sensor: "t1",
            value: f64::NAN,
        },
    );
    let result = gate.process(Some(bad), input.clone()).unwrap();

    assert_eq!(result.kind, ReceiptKind::Refused);
    let refusal = result.refusal().unwrap();
    assert_eq!(refusal.reason_code, ReasonCode::NonCanonicalPayload);
    assert_eq!(refusal.details.as_ref().unwrap()["path"], "$.payload.value");
    assert_eq!(result.receipt.ledger_head_after, "L0");

    let summary = result.receipt.body.request.as_ref().unwrap();
    assert_eq!(summary.request_id.as_deref(), Some("req-a"));
    assert_eq!(summary.action_type.as_deref(), Some("INCREMENT"));
    assert!(summary.request_hash.is_none());

    assert_eq!(admitted.get(), 0);
    assert_eq!(executed.get(), 0);
    assert_unchanged(&result, &input, gate.ledger());
}

#[test]
fn test_missing_request_id_refuses_with_salvaged_metadata() {
    let executed = Cell::new(0);
    let mut gate = gate_with(AdmitAll, |req: &CanonicalRequest, st: &State| {
        executed.set(executed.get() + 1);
        increment(req, st)
    });

    let inbound: Request =
        serde_json::from_value(json!({"actionType": "INCREMENT", "payload": {}})).unwrap();
    let input = state(0);
    let result = gate.process(Some(inbound), input.clone()).unwrap();

    let refusal = result.refusal().unwrap();
    assert_eq!(refusal.reason_code, ReasonCode::NonCanonicalPayload);
    assert_eq!(refusal.details, Some(json!({"field": "requestId"})));
    let summary = result.receipt.body.request.as_ref().unwrap();
    assert_eq!(summary.request_id, None);
    assert_eq!(summary.action_type.as_deref(), Some("INCREMENT"));
    assert_eq!(executed.get(), 0);
    assert_unchanged(&result, &input, gate.ledger());
}

#[test]
fn test_admissibility_refusal_skips_executor() {
    let executed = Cell::new(0);
    let mut gate = gate_with(
        |req: &CanonicalRequest, _: &State| {
            if req.witness().is_none() {
                AdmissibilityDecision::refuse(ReasonCode::MissingWitness)
            } else {
                AdmissibilityDecision::Admit
            }
        },
        |req: &CanonicalRequest, st: &State| {
            executed.set(executed.get() + 1);
            increment(req, st)
        },
    );

    let input = state(0);
    let result = gate.process(request("INCREMENT"), input.clone()).unwrap();

    assert_eq!(result.kind, ReceiptKind::Refused);
    let refusal = result.refusal().unwrap();
    assert_eq!(refusal.reason_code, ReasonCode::MissingWitness);
    assert_eq!(refusal.message, "Request is inadmissible.");
    assert!(
        result.receipt.body.request.as_ref().unwrap().request_hash.is_some(),
        "admissibility refusals hash the canonical request"
    );
    assert_eq!(executed.get(), 0);
    assert_unchanged(&result, &input, gate.ledger());

    let witnessed = Request::new("req-2", "INCREMENT", json!({"by": 1}))
        .with_witness(WitnessProof::new("quorum-1", vec!["sig-a".into()]));
    let result = gate.process(Some(witnessed), input).unwrap();
    assert_eq!(result.kind, ReceiptKind::Executed);
    assert_eq!(executed.get(), 1);
}

#[test]
fn test_emission_violation_discards_candidate_state() {
    let executed = Cell::new(0);
    let mut gate = gate_with(AdmitAll, |req: &CanonicalRequest, st: &State| {
        executed.set(executed.get() + 1);
        increment(req, st)
    });

    let input = state(0);
    let result = gate.process(request("PING"), input.clone()).unwrap();

    assert_eq!(result.kind, ReceiptKind::Refused);
    let refusal = result.refusal().unwrap();
    assert_eq!(refusal.reason_code, ReasonCode::EmissionManifestViolation);
    assert_eq!(
        refusal.details,
        Some(json!({"actionType": "PING", "expected": [], "actual": ["ACTUATION_PLAN"]}))
    );
    assert_eq!(executed.get(), 1);
    assert_eq!(counter(&result.state), 0);
    assert_unchanged(&result, &input, gate.ledger());
}

#[test]
fn test_increment_executes_and_commits_once() {
    let mut gate = gate_with(AdmitAll, increment);

    let input = state(0);
    let result = gate.process(request("INCREMENT"), input.clone()).unwrap();

    assert_eq!(result.kind, ReceiptKind::Executed);
    assert!(result.refusal().is_none());
    assert_eq!(counter(&result.state), 1);
    assert_ne!(result.state.ledger_head, "L0");
    assert_eq!(result.receipt.ledger_head_after, result.state.ledger_head);
    assert_eq!(result.receipt.body.ledger_head_before, "L0");
    assert_eq!(result.receipt.body.artifacts, vec![plan()]);
    assert_ne!(
        result.receipt.body.state_hash_before,
        result.receipt.body.state_hash_after
    );
    assert_eq!(
        result.receipt.body.state_hash_after,
        result.state.state_hash().unwrap()
    );

    // The caller's copy is untouched.
    assert_eq!(counter(&input), 0);
    assert_eq!(input.ledger_head, "L0");

    let ledger = gate.ledger();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.head(), result.state.ledger_head);
    let entry = &ledger.entries()[0];
    assert_eq!(entry.receipt_hash, result.receipt.body_hash);
    assert_eq!(entry.signature, result.receipt.signature);
    assert_eq!(entry.ledger_head_before, "L0");
    assert_eq!(
        entry.request_hash.as_ref(),
        result
            .receipt
            .body
            .request
            .as_ref()
            .unwrap()
            .request_hash
            .as_ref()
    );
    assert!(ledger.verify_chain().is_ok());
    assert!(verify_receipt_signature(&result.receipt, &signer().verifying_key()).is_ok());
}

#[test]
fn test_consecutive_executions_chain_heads() {
    let mut gate = gate_with(AdmitAll, increment);

    let first = gate.process(request("INCREMENT"), state(0)).unwrap();
    let second = gate
        .process(
            Some(Request::new("req-2", "INCREMENT", json!({"by": 1}))),
            first.state.clone(),
        )
        .unwrap();

    assert_eq!(second.kind, ReceiptKind::Executed);
    assert_eq!(counter(&second.state), 2);
    assert_eq!(
        second.receipt.body.ledger_head_before,
        first.receipt.ledger_head_after
    );
    assert_ne!(second.state.ledger_head, first.state.ledger_head);

    let ledger = gate.into_ledger();
    assert_eq!(ledger.len(), 2);
    assert!(ledger.verify_chain().is_ok());
}

#[test]
fn test_absent_request_is_signed_noop() {
    let admitted = Cell::new(0);
    let mut gate = gate_with(
        |_: &CanonicalRequest, _: &State| {
            admitted.set(admitted.get() + 1);
            AdmissibilityDecision::Admit
        },
        increment,
    );

    let input = state(0);
    let result = gate.process(None::<Request>, input.clone()).unwrap();

    assert_eq!(result.kind, ReceiptKind::QuiescentNoop);
    assert_eq!(result.receipt.body.kind, ReceiptKind::QuiescentNoop);
    assert!(result.receipt.body.request.is_none());
    assert!(result.refusal().is_none());
    assert_eq!(result.receipt.body_hash.as_str().len(), 64);
    assert!(!result.receipt.signature.is_empty());
    assert_eq!(admitted.get(), 0);
    assert_unchanged(&result, &input, gate.ledger());
}

#[test]
fn test_noop_receipts_are_deterministic() {
    let mut gate = gate_with(AdmitAll, increment);
    let a = gate.process(None::<Request>, state(3)).unwrap();
    let b = gate.process(None::<Request>, state(3)).unwrap();
    assert_eq!(a.receipt, b.receipt);
}

#[test]
fn test_unknown_action_type_refuses_after_executor_ran() {
    let executed = Cell::new(0);
    let mut gate = gate_with(AdmitAll, |req: &CanonicalRequest, st: &State| {
        executed.set(executed.get() + 1);
        increment(req, st)
    });

    let input = state(0);
    let result = gate.process(request("DEPLOY"), input.clone()).unwrap();

    let refusal = result.refusal().unwrap();
    assert_eq!(refusal.reason_code, ReasonCode::UnknownActionType);
    assert_eq!(refusal.details, Some(json!({"actionType": "DEPLOY"})));
    assert_eq!(executed.get(), 1);
    assert_unchanged(&result, &input, gate.ledger());
}

#[test]
fn test_duplicate_artifacts_never_commit() {
    let mut gate = gate_with(AdmitAll, |_: &CanonicalRequest, st: &State| {
        Ok(ExecutorOutput::new(st.clone(), vec![plan(), plan()]))
    });

    let input = state(0);
    let result = gate.process(request("INCREMENT"), input.clone()).unwrap();

    let refusal = result.refusal().unwrap();
    assert_eq!(refusal.reason_code, ReasonCode::EmissionManifestViolation);
    assert_eq!(refusal.details, Some(json!({"artifactId": "ACTUATION_PLAN"})));
    assert_unchanged(&result, &input, gate.ledger());
}

#[test]
fn test_executor_error_refuses() {
    let mut gate = gate_with(AdmitAll, |_: &CanonicalRequest, _: &State| {
        Err(ExecutorError::new("actuator offline"))
    });

    let input = state(0);
    let result = gate.process(request("INCREMENT"), input.clone()).unwrap();

    let refusal = result.refusal().unwrap();
    assert_eq!(refusal.reason_code, ReasonCode::ExecutorError);
    assert_eq!(refusal.message, "Executor threw; refusing commit.");
    assert_eq!(refusal.details, Some(json!({"error": "actuator offline"})));
    assert_unchanged(&result, &input, gate.ledger());
}

#[test]
fn test_executor_panic_refuses() {
    let mut gate = gate_with(
        AdmitAll,
        |_: &CanonicalRequest, _: &State| -> Result<ExecutorOutput, ExecutorError> {
            panic!("division by zero")
        },
    );

    let input = state(0);
    let result = gate.process(request("INCREMENT"), input.clone()).unwrap();

    let refusal = result.refusal().unwrap();
    assert_eq!(refusal.reason_code, ReasonCode::ExecutorError);
    assert_eq!(
        refusal.details,
        Some(json!({"error": "executor panicked: division by zero"}))
    );
    assert_unchanged(&result, &input, gate.ledger());
}

#[test]
fn test_unhashable_candidate_state_refuses() {
    let mut gate = gate_with(AdmitAll, |_: &CanonicalRequest, st: &State| {
        let mut deep = json!(0);
        for _ in 0..200 {
            deep = json!([deep]);
        }
        let mut next = st.clone();
        next.data.insert("deep".into(), deep);
        Ok(ExecutorOutput::new(next, vec![plan()]))
    });

    let input = state(0);
    let result = gate.process(request("INCREMENT"), input.clone()).unwrap();

    assert_eq!(
        result.refusal().unwrap().reason_code,
        ReasonCode::NonCanonicalPayload
    );
    assert_unchanged(&result, &input, gate.ledger());
}

#[test]
fn test_policy_version_check_via_admissibility() {
    let mut gate = gate_with(
        |req: &CanonicalRequest, st: &State| match req.policy_version() {
            Some(version) if version != st.policy_version => {
                AdmissibilityDecision::refuse(ReasonCode::PolicyVersionMismatch)
                    .with_message("request targets another policy")
                    .with_details(json!({"expected": st.policy_version, "actual": version}))
            },
            _ => AdmissibilityDecision::Admit,
        },
        increment,
    );

    let stale = Request::new("req-9", "INCREMENT", json!({})).with_policy_version("P0");
    let result = gate.process(Some(stale), state(0)).unwrap();
    let refusal = result.refusal().unwrap();
    assert_eq!(refusal.reason_code, ReasonCode::PolicyVersionMismatch);
    assert_eq!(refusal.message, "request targets another policy");
    assert_eq!(
        refusal.details,
        Some(json!({"expected": "P1", "actual": "P0"}))
    );
}

struct BrokenSigner;

impl ReceiptSigner for BrokenSigner {
    fn sign(&self, _: &HashHex, _: &str) -> Result<ReceiptSignature, SignerError> {
        Err(SignerError::signing_failed("key revoked"))
    }
}

#[test]
fn test_signer_failure_is_a_fault_not_a_refusal() {
    let mut gate = QsGate::new(
        BrokenSigner,
        MemoryLedger::new(GENESIS),
        AdmitAll,
        increment,
        manifests(),
    );

    assert!(matches!(
        gate.process(None::<Request>, state(0)),
        Err(GateFault::Receipt(_))
    ));
    assert!(matches!(
        gate.process(request("INCREMENT"), state(0)),
        Err(GateFault::Receipt(_))
    ));
    assert!(gate.ledger().is_empty());
}

#[test]
fn test_gate_accepts_borrowed_ledger() {
    let mut ledger = MemoryLedger::new(GENESIS);
    {
        let mut gate = QsGate::new(signer(), &mut ledger, AdmitAll, increment, manifests());
        let result = gate.process(request("INCREMENT"), state(0)).unwrap();
        assert_eq!(result.kind, ReceiptKind::Executed);
    }
    assert_eq!(ledger.len(), 1);
}
