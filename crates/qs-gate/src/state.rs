//! The governed state snapshot and its fingerprint.
//!
//! A [`State`] carries an opaque ledger cursor next to the hashed content.
//! The cursor is advanced by the ledger after a receipt is signed, so it can
//! never be part of the state hash: the receipt hash would otherwise depend
//! on its own future value. [`State::state_hash`] therefore only covers
//! `{policyVersion, data}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::{HashHex, canonical_hash};
use crate::determinism::CanonicalError;

/// Snapshot of the governed system.
///
/// The gate takes a `State` by value and hands back a (possibly new) value;
/// it never mutates a caller's copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct State {
    /// Ledger cursor. Excluded from every hash domain.
    pub ledger_head: String,

    /// Policy version locked into this state.
    pub policy_version: String,

    /// Governed content.
    pub data: Map<String, Value>,
}

/// The hashed projection of a [`State`].
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateCore<'a> {
    policy_version: &'a str,
    data: &'a Map<String, Value>,
}

impl State {
    /// Creates a state.
    #[must_use]
    pub fn new(
        ledger_head: impl Into<String>,
        policy_version: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            ledger_head: ledger_head.into(),
            policy_version: policy_version.into(),
            data,
        }
    }

    /// Returns a copy of this state positioned at a different ledger head.
    #[must_use]
    pub fn with_ledger_head(self, ledger_head: impl Into<String>) -> Self {
        Self {
            ledger_head: ledger_head.into(),
            ..self
        }
    }

    /// Computes `hash({policyVersion, data})`.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError`] if `data` has no canonical encoding (for
    /// example it nests deeper than the canonicalizer allows).
    pub fn state_hash(&self) -> Result<HashHex, CanonicalError> {
        canonical_hash(&StateCore {
            policy_version: &self.policy_version,
            data: &self.data,
        })
    }
}

/// Free-function form of [`State::state_hash`].
///
/// # Errors
///
/// See [`State::state_hash`].
pub fn state_hash(state: &State) -> Result<HashHex, CanonicalError> {
    state.state_hash()
}
