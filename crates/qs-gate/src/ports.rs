//! Admissibility and executor ports.
//!
//! Both are supplied by the caller. Plain closures implement the traits, so
//! simple policies need no wrapper types.

use serde_json::{Value, json};
use thiserror::Error;

use crate::emission::ArtifactRef;
use crate::reason::{ReasonCode, Refusal};
use crate::request::CanonicalRequest;
use crate::state::State;

/// Message used when a refusal decision does not carry one.
pub const DEFAULT_INADMISSIBLE_MESSAGE: &str = "Request is inadmissible.";

/// Message recorded when the executor fails.
pub const EXECUTOR_FAILED_MESSAGE: &str = "Executor threw; refusing commit.";

/// Outcome of an admissibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissibilityDecision {
    /// Proceed to execution.
    Admit,
    /// Refuse the request.
    Refuse {
        /// Reason recorded in the receipt.
        reason: ReasonCode,
        /// Explanation; defaults to [`DEFAULT_INADMISSIBLE_MESSAGE`].
        message: Option<String>,
        /// Optional structured diagnostics.
        details: Option<Value>,
    },
}

impl AdmissibilityDecision {
    /// Refuses with the given reason.
    #[must_use]
    pub const fn refuse(reason: ReasonCode) -> Self {
        Self::Refuse {
            reason,
            message: None,
            details: None,
        }
    }

    /// Refuses with [`ReasonCode::Inadmissible`].
    #[must_use]
    pub const fn inadmissible() -> Self {
        Self::refuse(ReasonCode::Inadmissible)
    }

    /// Sets the refusal message. Has no effect on [`Self::Admit`].
    #[must_use]
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        if let Self::Refuse { message, .. } = &mut self {
            *message = Some(text.into());
        }
        self
    }

    /// Sets the refusal details. Has no effect on [`Self::Admit`].
    #[must_use]
    pub fn with_details(mut self, value: Value) -> Self {
        if let Self::Refuse { details, .. } = &mut self {
            *details = Some(value);
        }
        self
    }

    /// Returns `true` for [`Self::Admit`].
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit)
    }

    /// Converts a refusal decision into the receipt's refusal record.
    #[must_use]
    pub fn into_refusal(self) -> Option<Refusal> {
        match self {
            Self::Admit => None,
            Self::Refuse {
                reason,
                message,
                details,
            } => Some(Refusal {
                reason_code: reason,
                message: message.unwrap_or_else(|| DEFAULT_INADMISSIBLE_MESSAGE.to_string()),
                details,
            }),
        }
    }
}

/// Decides whether a canonical request may run against a state.
pub trait Admissibility {
    /// Returns the decision for `request` against `state`.
    fn decide(&self, request: &CanonicalRequest, state: &State) -> AdmissibilityDecision;
}

impl<F> Admissibility for F
where
    F: Fn(&CanonicalRequest, &State) -> AdmissibilityDecision,
{
    fn decide(&self, request: &CanonicalRequest, state: &State) -> AdmissibilityDecision {
        self(request, state)
    }
}

/// Admits every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdmitAll;

impl Admissibility for AdmitAll {
    fn decide(&self, _request: &CanonicalRequest, _state: &State) -> AdmissibilityDecision {
        AdmissibilityDecision::Admit
    }
}

/// Candidate result of executing a request.
///
/// Nothing here is committed until the emission check passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOutput {
    /// Candidate next state. Its ledger head is replaced on commit.
    pub new_state: State,
    /// Produced artifacts.
    pub artifacts: Vec<ArtifactRef>,
}

impl ExecutorOutput {
    /// Creates an executor output.
    #[must_use]
    pub const fn new(new_state: State, artifacts: Vec<ArtifactRef>) -> Self {
        Self {
            new_state,
            artifacts,
        }
    }
}

/// Failure reported by an executor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutorError {
    /// What went wrong.
    pub message: String,
    /// Optional structured diagnostics.
    pub details: Option<Value>,
}

impl ExecutorError {
    /// Creates an executor error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
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

impl From<ExecutorError> for Refusal {
    fn from(err: ExecutorError) -> Self {
        let details = match err.details {
            Some(details) => json!({ "error": err.message, "details": details }),
            None => json!({ "error": err.message }),
        };
        Self::new(ReasonCode::ExecutorError, EXECUTOR_FAILED_MESSAGE).with_details(details)
    }
}

/// Computes a candidate next state for an admitted request.
pub trait Executor {
    /// Executes `request` against `state`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] if no candidate can be produced; the gate
    /// refuses the request.
    fn execute(
        &self,
        request: &CanonicalRequest,
        state: &State,
    ) -> Result<ExecutorOutput, ExecutorError>;
}

impl<F> Executor for F
where
    F: Fn(&CanonicalRequest, &State) -> Result<ExecutorOutput, ExecutorError>,
{
    fn execute(
        &self,
        request: &CanonicalRequest,
        state: &State,
    ) -> Result<ExecutorOutput, ExecutorError> {
        self(request, state)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::request::Request;

    fn request() -> CanonicalRequest {
        CanonicalRequest::from_request(&Request::new("r", "A", json!({}))).unwrap()
    }

    fn state() -> State {
        State::new("L0", "P1", Map::new())
    }

    #[test]
    fn test_refusal_defaults() {
        let refusal = AdmissibilityDecision::inadmissible().into_refusal().unwrap();
        assert_eq!(refusal.reason_code, ReasonCode::Inadmissible);
        assert_eq!(refusal.message, DEFAULT_INADMISSIBLE_MESSAGE);
        assert_eq!(refusal.details, None);
        assert_eq!(AdmissibilityDecision::Admit.into_refusal(), None);
    }

    #[test]
    fn test_refusal_builders() {
        let refusal = AdmissibilityDecision::refuse(ReasonCode::MissingWitness)
            .with_message("quorum required")
            .with_details(json!({"quorum": "q1"}))
            .into_refusal()
            .unwrap();
        assert_eq!(refusal.reason_code, ReasonCode::MissingWitness);
        assert_eq!(refusal.message, "quorum required");
        assert_eq!(refusal.details, Some(json!({"quorum": "q1"})));

        assert!(
            AdmissibilityDecision::Admit
                .with_message("ignored")
                .is_admitted()
        );
    }

    #[test]
    fn test_closures_implement_ports() {
        let policy = |req: &CanonicalRequest, st: &State| {
            if req.policy_version().is_some_and(|v| v != st.policy_version) {
                AdmissibilityDecision::refuse(ReasonCode::PolicyVersionMismatch)
            } else {
                AdmissibilityDecision::Admit
            }
        };
        assert!(policy.decide(&request(), &state()).is_admitted());
        assert!(AdmitAll.decide(&request(), &state()).is_admitted());

        let executor = |_: &CanonicalRequest, st: &State| {
            Ok::<_, ExecutorError>(ExecutorOutput::new(st.clone(), Vec::new()))
        };
        assert_eq!(executor.execute(&request(), &state()).unwrap().new_state, state());
    }

    #[test]
    fn test_executor_error_refusal() {
        let refusal = Refusal::from(ExecutorError::new("boom"));
        assert_eq!(refusal.reason_code, ReasonCode::ExecutorError);
        assert_eq!(refusal.message, EXECUTOR_FAILED_MESSAGE);
        assert_eq!(refusal.details, Some(json!({"error": "boom"})));

        let refusal = Refusal::from(ExecutorError::new("boom").with_details(json!([1])));
        assert_eq!(
            refusal.details,
            Some(json!({"error": "boom", "details": [1]}))
        );
    }
}
