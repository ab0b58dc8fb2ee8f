//! Evaluation constants for every dimension.
//!
//! [`DimensionRules`] is plain data (serde, overridable from the config
//! file); [`CompiledRules`] holds the same rules with patterns compiled.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Branch-protection contributions to the canonical-files score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionWeights {
    pub enabled: f64,
    pub required_reviews: f64,
    pub no_force_push: f64,
}

impl Default for ProtectionWeights {
    fn default() -> Self {
        Self {
            enabled: 0.5,
            required_reviews: 0.25,
            no_force_push: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionRules {
    /// Fleet config file read by source-control and trust-chain checks.
    pub config_file: String,
    pub sync_workflow_patterns: Vec<String>,
    pub monitoring_package: String,
    pub monitoring_module_files: Vec<String>,
    pub monitoring_workflow_patterns: Vec<String>,
    pub canonical_files: Vec<String>,
    pub protection_weights: ProtectionWeights,
    pub registry_workflow_patterns: Vec<String>,
    pub trust_chain_keywords: Vec<String>,
    pub auth_provider: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for DimensionRules {
    fn default() -> Self {
        Self {
            config_file: ".github/fleet.yml".to_string(),
            sync_workflow_patterns: strings(&[
                r"(?i)fleet[-_]?sync",
                r"(?i)registry[-_]?sync",
                r"(?i)sync[-_]?services?",
            ]),
            monitoring_package: "@fleet/monitor".to_string(),
            monitoring_module_files: strings(&[
                "src/monitoring.ts",
                "src/monitoring.js",
                "monitoring.py",
                "src/monitoring.rs",
                "monitoring/monitoring.go",
            ]),
            monitoring_workflow_patterns: strings(&[r"(?i)monitor"]),
            canonical_files: strings(&["README.md", "SECURITY.md", ".github/CODEOWNERS"]),
            protection_weights: ProtectionWeights::default(),
            registry_workflow_patterns: strings(&[r"(?i)service[-_]?registry"]),
            trust_chain_keywords: strings(&[
                "trust_chain",
                "oidc_issuer",
                "audience",
                "token_exchange",
            ]),
            auth_provider: "fleet-auth".to_string(),
        }
    }
}

impl DimensionRules {
    pub fn compile(&self) -> Result<CompiledRules, ConfigError> {
        if self.canonical_files.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "rules.canonical_files must not be empty".to_string(),
            ));
        }
        Ok(CompiledRules {
            sync_workflows: compile_all("sync_workflow_patterns", &self.sync_workflow_patterns)?,
            monitoring_workflows: compile_all(
                "monitoring_workflow_patterns",
                &self.monitoring_workflow_patterns,
            )?,
            registry_workflows: compile_all(
                "registry_workflow_patterns",
                &self.registry_workflow_patterns,
            )?,
            rules: self.clone(),
        })
    }
}

fn compile_all(field: &str, patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| {
                ConfigError::InvalidConfig(format!("rules.{field}: invalid pattern {p:?}: {e}"))
            })
        })
        .collect()
}

/// Rules with every pattern compiled once per run.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub rules: DimensionRules,
    pub sync_workflows: Vec<Regex>,
    pub monitoring_workflows: Vec<Regex>,
    pub registry_workflows: Vec<Regex>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_compile_and_match() {
        let compiled = DimensionRules::default().compile().unwrap();
        assert!(compiled
            .sync_workflows
            .iter()
            .any(|re| re.is_match(".github/workflows/Fleet-Sync.yml")));
        assert!(compiled
            .registry_workflows
            .iter()
            .any(|re| re.is_match("curl https://service_registry/heartbeat")));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let rules = DimensionRules {
            sync_workflow_patterns: vec!["(unclosed".to_string()],
            ..DimensionRules::default()
        };
        let err = rules.compile().unwrap_err();
        assert!(err.to_string().contains("sync_workflow_patterns"));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let rules: DimensionRules = serde_yaml::from_str("auth_provider: acme-sso\n").unwrap();
        assert_eq!(rules.auth_provider, "acme-sso");
        assert_eq!(rules.canonical_files.len(), 3);
        assert_eq!(rules.protection_weights.enabled, 0.5);
    }
}
