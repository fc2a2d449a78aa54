//! Gate configuration.
//!
//! Emission manifests are declared in TOML, one table per action type:
//!
//! ```toml
//! [manifests.INCREMENT]
//! exact_artifact_ids = ["ACTUATION_PLAN"]
//!
//! [manifests.PING]
//! exact_artifact_ids = []
//! ```
//!
//! Validation is fail-closed: unknown keys, an empty action type, or an
//! artifact id listed twice reject the whole file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::emission::{EmissionManifest, EmissionManifests};

/// Top-level gate configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Emission manifests keyed by action type.
    #[serde(default)]
    pub manifests: BTreeMap<String, ManifestConfig>,
}

/// One action type's declared artifact set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestConfig {
    /// Artifact ids the action must emit, no more and no fewer.
    pub exact_artifact_ids: Vec<String>,
}

impl GateConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML is invalid or contains unknown keys
    /// - An action type is empty
    /// - A manifest lists the same artifact id twice
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Checks every manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (action_type, manifest) in &self.manifests {
            if action_type.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "manifest action type must not be empty".to_string(),
                ));
            }
            EmissionManifest::new(manifest.exact_artifact_ids.iter().cloned()).map_err(|e| {
                ConfigError::Validation(format!("manifest '{action_type}': {e}"))
            })?;
        }
        Ok(())
    }

    /// Converts the configuration into the manifests the gate consumes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] under the same conditions as
    /// [`validate`](Self::validate).
    pub fn into_manifests(self) -> Result<EmissionManifests, ConfigError> {
        self.validate()?;
        self.manifests
            .into_iter()
            .map(|(action_type, manifest)| {
                EmissionManifest::new(manifest.exact_artifact_ids)
                    .map(|m| (action_type.clone(), m))
                    .map_err(|e| ConfigError::Validation(format!("manifest '{action_type}': {e}")))
            })
            .collect()
    }
}

impl From<&EmissionManifests> for GateConfig {
    fn from(manifests: &EmissionManifests) -> Self {
        Self {
            manifests: manifests
                .iter()
                .map(|(action_type, manifest)| {
                    (
                        action_type.clone(),
                        ManifestConfig {
                            exact_artifact_ids: manifest.exact_artifact_ids().iter().cloned().collect(),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}
