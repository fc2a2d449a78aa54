//! Inbound requests and their canonical form.
//!
//! A [`Request`] is whatever the caller's boundary produced: identifiers may
//! be missing and the payload is any serializable value. A
//! [`CanonicalRequest`] only exists once the whole request has been
//! canonicalized; its fingerprint is the hash of that single canonical
//! encoding.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::crypto::{HashHex, sha256_hex};
use crate::determinism::{CanonicalError, to_canonical_value};
use crate::reason::{ReasonCode, Refusal};

/// A quorum proof attached to a request, consumed by admissibility only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WitnessProof {
    /// Identifier of the witnessing quorum.
    pub quorum_id: String,
    /// Member signatures, opaque to the gate.
    pub signatures: Vec<String>,
}

impl WitnessProof {
    /// Creates a witness proof.
    #[must_use]
    pub fn new(quorum_id: impl Into<String>, signatures: Vec<String>) -> Self {
        Self {
            quorum_id: quorum_id.into(),
            signatures,
        }
    }
}

/// A request as received from the caller's boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request<P = Value> {
    /// Caller-assigned request id. Required for processing.
    #[serde(default)]
    pub request_id: Option<String>,

    /// Action type, selecting the emission manifest. Required for processing.
    #[serde(default)]
    pub action_type: Option<String>,

    /// Arbitrary payload; must have a canonical encoding.
    pub payload: P,

    /// Policy version the request was written against.
    #[serde(default)]
    pub policy_version: Option<String>,

    /// Optional witness quorum proof.
    #[serde(default)]
    pub witness: Option<WitnessProof>,
}

impl<P> Request<P> {
    /// Creates a request with both identifiers set.
    #[must_use]
    pub fn new(request_id: impl Into<String>, action_type: impl Into<String>, payload: P) -> Self {
        Self {
            request_id: Some(request_id.into()),
            action_type: Some(action_type.into()),
            payload,
            policy_version: None,
            witness: None,
        }
    }

    /// Sets the policy version.
    #[must_use]
    pub fn with_policy_version(mut self, policy_version: impl Into<String>) -> Self {
        self.policy_version = Some(policy_version.into());
        self
    }

    /// Attaches a witness proof.
    #[must_use]
    pub fn with_witness(mut self, witness: WitnessProof) -> Self {
        self.witness = Some(witness);
        self
    }
}

/// Errors that prevent a request from being canonicalized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RequestError {
    /// A required identifier is absent.
    #[error("request field '{field}' is missing")]
    MissingField {
        /// Wire name of the missing field.
        field: &'static str,
    },

    /// Some part of the request has no canonical encoding.
    #[error(transparent)]
    NonCanonical(#[from] CanonicalError),
}

impl From<RequestError> for Refusal {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::MissingField { field } => {
                let message = err.to_string();
                Self::new(ReasonCode::NonCanonicalPayload, message)
                    .with_details(json!({ "field": field }))
            },
            RequestError::NonCanonical(inner) => inner.into(),
        }
    }
}

/// Borrowed view used to canonicalize a request in one pass.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestView<'a, P> {
    request_id: &'a str,
    action_type: &'a str,
    payload: &'a P,
    policy_version: Option<&'a str>,
    witness: Option<&'a WitnessProof>,
}

/// A request whose every field has been proven canonical.
///
/// Serializing a `CanonicalRequest` reproduces exactly the text its
/// [`request_hash`](Self::request_hash) was computed over.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRequest {
    request_id: String,
    action_type: String,
    payload: Value,
    policy_version: Option<String>,
    witness: Option<WitnessProof>,
    #[serde(skip)]
    request_hash: HashHex,
}

impl CanonicalRequest {
    /// Canonicalizes `request`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::MissingField`] if `requestId` or `actionType`
    /// is absent, and [`RequestError::NonCanonical`] if any value in the
    /// request has no canonical encoding.
    pub fn from_request<P: Serialize>(request: &Request<P>) -> Result<Self, RequestError> {
        let request_id = request
            .request_id
            .as_deref()
            .ok_or(RequestError::MissingField { field: "requestId" })?;
        let action_type = request
            .action_type
            .as_deref()
            .ok_or(RequestError::MissingField {
                field: "actionType",
            })?;

        let canonical = to_canonical_value(&RequestView {
            request_id,
            action_type,
            payload: &request.payload,
            policy_version: request.policy_version.as_deref(),
            witness: request.witness.as_ref(),
        })?;
        let request_hash = sha256_hex(&canonical.to_canonical_string());

        let payload = match canonical.into_value() {
            Value::Object(mut fields) => fields.remove("payload").unwrap_or(Value::Null),
            _ => Value::Null,
        };

        Ok(Self {
            request_id: request_id.to_string(),
            action_type: action_type.to_string(),
            payload,
            policy_version: request.policy_version.clone(),
            witness: request.witness.clone(),
            request_hash,
        })
    }

    /// The request id.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The action type.
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// The payload as a canonical JSON value.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// The policy version the request was written against, if any.
    #[must_use]
    pub fn policy_version(&self) -> Option<&str> {
        self.policy_version.as_deref()
    }

    /// The witness proof, if any.
    #[must_use]
    pub const fn witness(&self) -> Option<&WitnessProof> {
        self.witness.as_ref()
    }

    /// Hash of the canonical request encoding.
    #[must_use]
    pub const fn request_hash(&self) -> &HashHex {
        &self.request_hash
    }
}
