//! Property tests for the gate's outcome invariants.
//!
//! For arbitrary requests, admissibility decisions and executor behaviors:
//!
//! - refusals and no-ops leave state, state hash and ledger untouched
//! - executed outcomes append exactly once and emit exactly the declared set

mod common;

use common::{GENESIS, counter, manifests, plan, signer, state};
use proptest::prelude::*;
use qs_gate::prelude::*;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Matching,
    Extra,
    Missing,
    Duplicate,
    Fails,
}

fn behavior() -> impl Strategy<Value = Behavior> {
    prop_oneof![
        Just(Behavior::Matching),
        Just(Behavior::Extra),
        Just(Behavior::Missing),
        Just(Behavior::Duplicate),
        Just(Behavior::Fails),
    ]
}

fn decision() -> impl Strategy<Value = Option<ReasonCode>> {
    prop_oneof![
        3 => Just(None),
        1 => Just(Some(ReasonCode::MissingWitness)),
        1 => Just(Some(ReasonCode::AmbiguousInput)),
        1 => Just(Some(ReasonCode::Inadmissible)),
    ]
}

fn payload() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9]{0,8}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn action_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("INCREMENT".to_string()),
        Just("PING".to_string()),
        "[A-Z]{3,8}",
    ]
}

fn run(
    request: Option<Request>,
    refuse_with: Option<ReasonCode>,
    behavior: Behavior,
    start: i64,
) -> (GateResult, MemoryLedger, State) {
    let admissibility = move |_: &CanonicalRequest, _: &State| match refuse_with {
        Some(reason) => AdmissibilityDecision::refuse(reason),
        None => AdmissibilityDecision::Admit,
    };
    let executor = move |_: &CanonicalRequest, st: &State| {
        let mut next = st.clone();
        next.data.insert("counter".into(), json!(counter(st) + 1));
        let artifacts = match behavior {
            Behavior::Matching => vec![plan()],
            Behavior::Extra => vec![plan(), ArtifactRef::from_content("LOG", b"log")],
            Behavior::Missing => Vec::new(),
            Behavior::Duplicate => vec![plan(), plan()],
            Behavior::Fails => return Err(ExecutorError::new("scripted failure")),
        };
        Ok(ExecutorOutput::new(next, artifacts))
    };

    let mut gate = QsGate::new(
        signer(),
        MemoryLedger::new(GENESIS),
        admissibility,
        executor,
        manifests(),
    );
    let input = state(start);
    let result = gate.process(request, input.clone()).unwrap();
    (result, gate.into_ledger(), input)
}

proptest! {
    /// Property: refusals and no-ops preserve state and ledger.
    #[test]
    fn prop_non_executed_outcomes_preserve_state_and_ledger(
        present in any::<bool>(),
        action in action_type(),
        body in payload(),
        refuse_with in decision(),
        behavior in behavior(),
        start in -1000i64..1000,
    ) {
        let request = present.then(|| Request::new("req-p", action, body));
        let (result, ledger, input) = run(request, refuse_with, behavior, start);

        if result.kind != ReceiptKind::Executed {
            prop_assert_eq!(&result.state, &input);
            prop_assert_eq!(result.state.state_hash().unwrap(), input.state_hash().unwrap());
            prop_assert_eq!(&result.receipt.ledger_head_after, &input.ledger_head);
            prop_assert_eq!(&result.receipt.body.state_hash_before, &result.receipt.body.state_hash_after);
            prop_assert!(result.receipt.body.artifacts.is_empty());
            prop_assert_eq!(ledger.len(), 0);
            prop_assert_eq!(
                result.receipt.body.refusal.is_some(),
                result.kind == ReceiptKind::Refused
            );
        }
        prop_assert!(result.receipt.verify_integrity().is_ok());
    }

    /// Property: executed outcomes commit once with exactly the declared
    /// artifact set.
    #[test]
    fn prop_executed_outcomes_are_bounded(
        action in action_type(),
        body in payload(),
        refuse_with in decision(),
        behavior in behavior(),
        start in -1000i64..1000,
    ) {
        let declared = manifests();
        let request = Some(Request::new("req-p", action.clone(), body));
        let (result, ledger, input) = run(request, refuse_with, behavior, start);

        if result.kind == ReceiptKind::Executed {
            prop_assert_eq!(ledger.len(), 1);
            let ids: Vec<&str> = result.receipt.body.artifacts.iter().map(|a| a.id.as_str()).collect();
            let expected: Vec<&str> = declared[&action].exact_artifact_ids().iter().map(String::as_str).collect();
            prop_assert_eq!(ids, expected);
            prop_assert_eq!(&result.receipt.ledger_head_after, &result.state.ledger_head);
            prop_assert_ne!(&result.state.ledger_head, &input.ledger_head);
            prop_assert_ne!(&result.receipt.body.state_hash_before, &result.receipt.body.state_hash_after);
        } else {
            prop_assert_eq!(ledger.len(), 0);
        }

        // Only an admitted request whose executor emits the declared set
        // can commit.
        let can_commit = refuse_with.is_none()
            && match action.as_str() {
                "INCREMENT" => matches!(behavior, Behavior::Matching),
                "PING" => matches!(behavior, Behavior::Missing),
                _ => false,
            };
        prop_assert_eq!(result.kind == ReceiptKind::Executed, can_commit);
    }

    /// Property: an undeclared action type always refuses as unknown once
    /// admitted and executed.
    #[test]
    fn prop_unknown_action_type_always_refuses(
        action in "[A-Z]{3,8}".prop_filter("undeclared", |a| a != "PING"),
        behavior in behavior().prop_filter("executor succeeds", |b| !matches!(b, Behavior::Fails)),
    ) {
        let (result, ledger, _) = run(
            Some(Request::new("req-u", action, json!({}))),
            None,
            behavior,
            0,
        );
        prop_assert_eq!(result.kind, ReceiptKind::Refused);
        prop_assert_eq!(
            result.refusal().map(|r| r.reason_code),
            Some(ReasonCode::UnknownActionType)
        );
        prop_assert_eq!(ledger.len(), 0);
    }
}
