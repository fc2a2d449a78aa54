//! Refusal reason codes and the refusal record carried by receipts.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::determinism::CanonicalError;

/// Why a request was refused.
///
/// The set is closed: every failure reachable from processing a request maps
/// onto exactly one of these codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// The request, or a value inside it, has no canonical encoding.
    NonCanonicalPayload,
    /// A required witness quorum proof is missing.
    MissingWitness,
    /// The request targets a different policy version than the state.
    PolicyVersionMismatch,
    /// The request cannot be interpreted unambiguously.
    AmbiguousInput,
    /// Generic admissibility refusal.
    Inadmissible,
    /// Executor output does not match the declared artifact set.
    EmissionManifestViolation,
    /// The executor failed.
    ExecutorError,
    /// No emission manifest exists for the action type.
    UnknownActionType,
}

impl ReasonCode {
    /// All reason codes, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::NonCanonicalPayload,
        Self::MissingWitness,
        Self::PolicyVersionMismatch,
        Self::AmbiguousInput,
        Self::Inadmissible,
        Self::EmissionManifestViolation,
        Self::ExecutorError,
        Self::UnknownActionType,
    ];

    /// Returns the wire name of this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonCanonicalPayload => "NON_CANONICAL_PAYLOAD",
            Self::MissingWitness => "MISSING_WITNESS",
            Self::PolicyVersionMismatch => "POLICY_VERSION_MISMATCH",
            Self::AmbiguousInput => "AMBIGUOUS_INPUT",
            Self::Inadmissible => "INADMISSIBLE",
            Self::EmissionManifestViolation => "EMISSION_MANIFEST_VIOLATION",
            Self::ExecutorError => "EXECUTOR_ERROR",
            Self::UnknownActionType => "UNKNOWN_ACTION_TYPE",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The refusal record embedded in a `REFUSED` receipt body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refusal {
    /// Machine-readable reason.
    pub reason_code: ReasonCode,
    /// Human-readable explanation.
    pub message: String,
    /// Optional structured diagnostics; `null` on the wire when absent.
    pub details: Option<Value>,
}

impl Refusal {
    /// Creates a refusal without details.
    #[must_use]
    pub fn new(reason_code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            reason_code,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<CanonicalError> for Refusal {
    fn from(err: CanonicalError) -> Self {
        Self::new(ReasonCode::NonCanonicalPayload, err.to_string()).with_details(err.details())
    }
}
