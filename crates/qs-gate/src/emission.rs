//! Bounded emission: executor output must produce exactly the declared
//! artifact set for its action type.
//!
//! Artifact sets are compared as sets. Both sides are brought into ascending
//! id order and compared position by position, so the comparison is exact
//! (same length, same ids) and independent of the order the executor
//! returned them in. Duplicate ids are never tolerated on either side.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::crypto::{HashHex, sha256};
use crate::reason::{ReasonCode, Refusal};

/// One produced artifact, identified by id and content hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactRef {
    /// Artifact identifier, unique within one outcome.
    pub id: String,
    /// Hash of the artifact content.
    pub hash: HashHex,
}

impl ArtifactRef {
    /// Creates a reference from an id and a precomputed hash.
    #[must_use]
    pub fn new(id: impl Into<String>, hash: HashHex) -> Self {
        Self {
            id: id.into(),
            hash,
        }
    }

    /// Creates a reference by hashing `content`.
    #[must_use]
    pub fn from_content(id: impl Into<String>, content: &[u8]) -> Self {
        Self::new(id, HashHex::from_bytes(&sha256(content)))
    }
}

/// The exact artifact ids an action type must emit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ManifestRepr")]
pub struct EmissionManifest {
    exact_artifact_ids: BTreeSet<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ManifestRepr {
    exact_artifact_ids: Vec<String>,
}

impl TryFrom<ManifestRepr> for EmissionManifest {
    type Error = EmissionError;

    fn try_from(repr: ManifestRepr) -> Result<Self, Self::Error> {
        Self::new(repr.exact_artifact_ids)
    }
}

impl EmissionManifest {
    /// Creates a manifest from a list of ids.
    ///
    /// # Errors
    ///
    /// Returns [`EmissionError::DuplicateManifestId`] if an id is listed
    /// twice.
    pub fn new<I, S>(ids: I) -> Result<Self, EmissionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut exact_artifact_ids = BTreeSet::new();
        for id in ids {
            let id = id.into();
            if exact_artifact_ids.contains(&id) {
                return Err(EmissionError::DuplicateManifestId { artifact_id: id });
            }
            exact_artifact_ids.insert(id);
        }
        Ok(Self { exact_artifact_ids })
    }

    /// A manifest that permits no artifacts at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The declared ids, in ascending order.
    #[must_use]
    pub const fn exact_artifact_ids(&self) -> &BTreeSet<String> {
        &self.exact_artifact_ids
    }
}

/// Manifests keyed by action type.
pub type EmissionManifests = BTreeMap<String, EmissionManifest>;

/// Errors raised by the emission check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EmissionError {
    /// Executor output contains the same artifact id more than once.
    #[error("duplicate artifact id '{artifact_id}' is not allowed")]
    DuplicateArtifactId {
        /// The repeated id.
        artifact_id: String,
    },

    /// No manifest is registered for the action type.
    #[error("no emission manifest is defined for action type '{action_type}'")]
    UnknownActionType {
        /// The unmatched action type.
        action_type: String,
    },

    /// Executor output differs from the declared set.
    #[error("artifacts do not match the emission manifest for '{action_type}'")]
    ManifestViolation {
        /// The action type being checked.
        action_type: String,
        /// Declared ids, ascending.
        expected: Vec<String>,
        /// Produced ids, ascending.
        actual: Vec<String>,
    },

    /// A manifest declares the same id more than once.
    #[error("emission manifest lists artifact id '{artifact_id}' more than once")]
    DuplicateManifestId {
        /// The repeated id.
        artifact_id: String,
    },
}

impl EmissionError {
    /// Returns the refusal reason this error maps to.
    #[must_use]
    pub const fn reason_code(&self) -> ReasonCode {
        match self {
            Self::UnknownActionType { .. } => ReasonCode::UnknownActionType,
            Self::DuplicateArtifactId { .. }
            | Self::ManifestViolation { .. }
            | Self::DuplicateManifestId { .. } => ReasonCode::EmissionManifestViolation,
        }
    }

    /// Returns structured diagnostics for the refusal record.
    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::DuplicateArtifactId { artifact_id } | Self::DuplicateManifestId { artifact_id } => {
                json!({ "artifactId": artifact_id })
            },
            Self::UnknownActionType { action_type } => json!({ "actionType": action_type }),
            Self::ManifestViolation {
                action_type,
                expected,
                actual,
            } => json!({
                "actionType": action_type,
                "expected": expected,
                "actual": actual,
            }),
        }
    }
}

impl From<EmissionError> for Refusal {
    fn from(err: EmissionError) -> Self {
        Self::new(err.reason_code(), err.to_string()).with_details(err.details())
    }
}

/// Sorts artifacts by id and rejects duplicate ids.
///
/// # Errors
///
/// Returns [`EmissionError::DuplicateArtifactId`] for the first repeated id
/// in sorted order.
pub fn normalize_artifacts(
    mut artifacts: Vec<ArtifactRef>,
) -> Result<Vec<ArtifactRef>, EmissionError> {
    artifacts.sort_by(|a, b| a.id.cmp(&b.id));
    if let Some(pair) = artifacts.windows(2).find(|pair| pair[0].id == pair[1].id) {
        return Err(EmissionError::DuplicateArtifactId {
            artifact_id: pair[0].id.clone(),
        });
    }
    Ok(artifacts)
}

/// Checks that `artifacts` is exactly the declared set for `action_type`.
///
/// The manifest lookup happens first, so an unknown action type is reported
/// as such whatever the executor produced. On success the artifacts are
/// returned normalized.
///
/// # Errors
///
/// Returns [`EmissionError::UnknownActionType`] if no manifest exists,
/// [`EmissionError::DuplicateArtifactId`] for repeated ids, and
/// [`EmissionError::ManifestViolation`] if the sets differ.
///
/// # Example
///
/// ```
/// use qs_gate::emission::{
///     ArtifactRef, EmissionManifest, EmissionManifests, enforce_emission_manifest,
/// };
///
/// let mut manifests = EmissionManifests::new();
/// manifests.insert("INCREMENT".into(), EmissionManifest::new(["ACTUATION_PLAN"]).unwrap());
///
/// let plan = ArtifactRef::from_content("ACTUATION_PLAN", b"step 1");
/// assert!(enforce_emission_manifest("INCREMENT", vec![plan.clone()], &manifests).is_ok());
/// assert!(enforce_emission_manifest("INCREMENT", vec![], &manifests).is_err());
/// assert!(enforce_emission_manifest("PING", vec![plan], &manifests).is_err());
/// ```
pub fn enforce_emission_manifest(
    action_type: &str,
    artifacts: Vec<ArtifactRef>,
    manifests: &EmissionManifests,
) -> Result<Vec<ArtifactRef>, EmissionError> {
    let manifest = manifests
        .get(action_type)
        .ok_or_else(|| EmissionError::UnknownActionType {
            action_type: action_type.to_string(),
        })?;

    let normalized = normalize_artifacts(artifacts)?;
    let matches = normalized.len() == manifest.exact_artifact_ids.len()
        && normalized
            .iter()
            .zip(&manifest.exact_artifact_ids)
            .all(|(artifact, expected)| &artifact.id == expected);

    if !matches {
        return Err(EmissionError::ManifestViolation {
            action_type: action_type.to_string(),
            expected: manifest.exact_artifact_ids.iter().cloned().collect(),
            actual: normalized.into_iter().map(|a| a.id).collect(),
        });
    }
    Ok(normalized)
}
