//! Descriptive metadata for the compliance dimensions.
//!
//! Consumed only when rendering reports; never used for control flow.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dimension::Dimension;
use crate::error::ConfigError;

/// Human-facing name and description of a dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDefinition {
    pub name: String,
    pub description: String,
}

/// Definitions for every dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckDefinitions(BTreeMap<Dimension, CheckDefinition>);

impl CheckDefinitions {
    /// Definitions shipped with the engine.
    pub fn builtin() -> Self {
        let entries = [
            (
                Dimension::SourceControl,
                "Source-control integration",
                "Fleet config file is committed and a registry sync workflow is present.",
            ),
            (
                Dimension::Monitoring,
                "Monitoring agent",
                "The monitoring agent is a declared dependency, a monitoring module exists, or CI wires it in.",
            ),
            (
                Dimension::CanonicalFiles,
                "Canonical files",
                "README, security policy and code owners are present; branch protection is scored.",
            ),
            (
                Dimension::RegistryHeartbeat,
                "Registry heartbeat",
                "Deploys report to the service registry and the service is registered.",
            ),
            (
                Dimension::Routing,
                "Routing",
                "The public domain resolves through the edge router.",
            ),
            (
                Dimension::TrustChain,
                "Trust-chain provisioning",
                "The fleet config declares the trust-chain keys and the expected auth provider.",
            ),
            (
                Dimension::HealthEndpoint,
                "Health endpoint",
                "The deployed service answers its health path with a recognised body.",
            ),
        ];
        Self(
            entries
                .into_iter()
                .map(|(dim, name, description)| {
                    (
                        dim,
                        CheckDefinition {
                            name: name.to_string(),
                            description: description.to_string(),
                        },
                    )
                })
                .collect(),
        )
    }

    /// Load definitions from a YAML file; all dimensions must be defined.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::CheckDefinitions {
            path: origin.clone(),
            detail: e.to_string(),
        })?;
        Self::parse(&raw, &origin)
    }

    pub fn parse(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let definitions: Self =
            serde_yaml::from_str(raw).map_err(|e| ConfigError::CheckDefinitions {
                path: origin.to_string(),
                detail: e.to_string(),
            })?;

        let missing: Vec<&str> = Dimension::ALL
            .iter()
            .filter(|d| !definitions.0.contains_key(d))
            .map(|d| d.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::CheckDefinitions {
                path: origin.to_string(),
                detail: format!("missing definitions for {}", missing.join(", ")),
            });
        }
        Ok(definitions)
    }

    pub fn get(&self, dimension: Dimension) -> Option<&CheckDefinition> {
        self.0.get(&dimension)
    }

    /// Display name, falling back to the dimension id.
    pub fn name(&self, dimension: Dimension) -> &str {
        self.get(dimension)
            .map(|d| d.name.as_str())
            .unwrap_or_else(|| dimension.as_str())
    }
}

impl Default for CheckDefinitions {
    fn default() -> Self {
        Self::builtin()
    }
}
