//! Audit configuration.
//!
//! One explicit struct threaded through the orchestrator and both probes.
//! Loaded from YAML with every field defaulted; secrets arrive from the CLI.

use std::path::Path;

use fleet_audit_probes::ProbeConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rules::DimensionRules;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Upper bound on services evaluated at once.
    pub max_concurrent_services: usize,
    /// Short-circuit every runtime probe to `skip`.
    pub skip_runtime: bool,
    pub probe: ProbeConfig,
    pub rules: DimensionRules,
    /// Labels applied to remediation issues.
    pub issue_labels: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_concurrent_services: 4,
            skip_runtime: false,
            probe: ProbeConfig::default(),
            rules: DimensionRules::default(),
            issue_labels: vec!["compliance".to_string()],
        }
    }
}

impl AuditConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|e| {
            ConfigError::InvalidConfig(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_skip_runtime(mut self, skip: bool) -> Self {
        self.skip_runtime = skip;
        self
    }

    pub fn with_concurrency(mut self, max_concurrent_services: usize) -> Self {
        self.max_concurrent_services = max_concurrent_services;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_services == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_concurrent_services must be at least 1".to_string(),
            ));
        }
        self.probe
            .validate()
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        self.rules.compile().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AuditConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = AuditConfig::default().with_concurrency(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "max_concurrent_services: 8\nprobe:\n  http_timeout_secs: 3\nrules:\n  auth_provider: acme-sso"
        )
        .unwrap();
        let config = AuditConfig::load(file.path()).unwrap();
        assert_eq!(config.max_concurrent_services, 8);
        assert_eq!(config.probe.http_timeout_secs, 3);
        assert_eq!(config.probe.default_branch, "main");
        assert_eq!(config.rules.auth_provider, "acme-sso");
        assert_eq!(config.issue_labels, vec!["compliance".to_string()]);
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "probe:\n  http_timeout_secs: 0").unwrap();
        assert!(AuditConfig::load(file.path()).is_err());
    }
}
