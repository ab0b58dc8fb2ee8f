//! Probe configuration
//!
//! Every timeout, rate limit and endpoint the probes use lives here and is
//! threaded in explicitly; nothing in this crate reads the environment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ProbeError, ProbeResult};

/// Probe configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// GitHub REST API base URL
    pub github_api_url: String,
    /// GitHub token (optional for public repositories)
    #[serde(skip_serializing)]
    pub github_token: Option<String>,
    /// Service registry base URL used by the heartbeat probe
    pub registry_url: String,
    /// Path probed on a service's domain for the health check
    pub health_path: String,
    /// Per-request timeout for every HTTP call
    pub http_timeout_secs: u64,
    /// Minimum spacing between two GitHub API requests
    pub min_request_interval_ms: u64,
    /// Retries on rate-limited responses before giving up
    pub max_retries: u32,
    /// Branch inspected for branch protection
    pub default_branch: String,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            github_api_url: "https://api.github.com".to_string(),
            github_token: None,
            registry_url: "https://registry.fleet.internal".to_string(),
            health_path: "/health".to_string(),
            http_timeout_secs: 10,
            min_request_interval_ms: 50,
            max_retries: 3,
            default_branch: "main".to_string(),
            user_agent: format!("fleet-audit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ProbeConfig {
    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.github_token = Some(token.to_string());
        self
    }

    /// Override the service registry endpoint
    pub fn with_registry_url(mut self, url: &str) -> Self {
        self.registry_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    /// Reject configurations that would make a probe unbounded.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.http_timeout_secs == 0 {
            return Err(ProbeError::Config(
                "http_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.github_api_url.is_empty() {
            return Err(ProbeError::Config("github_api_url is empty".to_string()));
        }
        if !self.health_path.starts_with('/') {
            return Err(ProbeError::Config(format!(
                "health_path must start with '/': {}",
                self.health_path
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProbeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.default_branch, "main");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ProbeConfig {
            http_timeout_secs: 0,
            ..ProbeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ProbeError::Config(_))));
    }

    #[test]
    fn test_token_never_serialized() {
        let config = ProbeConfig::default().with_token("ghp_secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("ghp_secret"));
    }

    #[test]
    fn test_registry_url_trailing_slash_trimmed() {
        let config = ProbeConfig::default().with_registry_url("https://reg.acme.dev/");
        assert_eq!(config.registry_url, "https://reg.acme.dev");
    }
}
