//! Shared fixtures for gate integration tests.

#![allow(dead_code)]

use qs_gate::prelude::*;
use serde_json::{Map, Value, json};

pub const GENESIS: &str = "L0";
pub const POLICY: &str = "P1";

pub fn signer() -> Ed25519ReceiptSigner {
    Ed25519ReceiptSigner::from_seed(&[0x5a; 32])
}

pub fn state(counter: i64) -> State {
    let mut data = Map::new();
    data.insert("counter".into(), json!(counter));
    State::new(GENESIS, POLICY, data)
}

pub fn counter(state: &State) -> i64 {
    state.data.get("counter").and_then(Value::as_i64).unwrap_or(0)
}

/// `PING` emits nothing, `INCREMENT` emits exactly `ACTUATION_PLAN`.
pub fn manifests() -> EmissionManifests {
    GateConfig::from_toml(
        r#"
        [manifests.INCREMENT]
        exact_artifact_ids = ["ACTUATION_PLAN"]

        [manifests.PING]
        exact_artifact_ids = []
        "#,
    )
    .unwrap()
    .into_manifests()
    .unwrap()
}

pub fn plan() -> ArtifactRef {
    ArtifactRef::from_content("ACTUATION_PLAN", b"counter += 1")
}

/// Increments the counter and emits one actuation plan, whatever the action.
pub fn increment(_: &CanonicalRequest, state: &State) -> Result<ExecutorOutput, ExecutorError> {
    let mut next = state.clone();
    next.data.insert("counter".into(), json!(counter(state) + 1));
    Ok(ExecutorOutput::new(next, vec![plan()]))
}

pub fn request(action_type: &str) -> Option<Request> {
    Some(Request::new("req-1", action_type, json!({"by": 1})))
}
