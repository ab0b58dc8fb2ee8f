//! Error taxonomy for the audit engine.
//!
//! `ConfigError` is fatal and aborts before any service is evaluated.
//! Probe failures never appear here: they are absorbed into a check's
//! `reason` by the orchestrator.

/// Malformed or incomplete registry, check definitions, or config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load registry {path}: {detail}")]
    RegistryLoad { path: String, detail: String },

    #[error("registry {path} is missing top-level key `{key}`")]
    MissingKey { path: String, key: &'static str },

    #[error("repository {repo} is claimed by both {first} and {second}")]
    DuplicateRepository {
        repo: String,
        first: String,
        second: String,
    },

    #[error("no compliance profile for service type {service_type} (used by {services:?})")]
    MissingProfile {
        service_type: String,
        services: Vec<String>,
    },

    #[error("compliance profile {service_type} is missing dimensions {missing:?}")]
    IncompleteProfile {
        service_type: String,
        missing: Vec<String>,
    },

    #[error("service {org}/{service} has malformed repository coordinate {repo:?}")]
    InvalidRepository {
        org: String,
        service: String,
        repo: String,
    },

    #[error("failed to load check definitions {path}: {detail}")]
    CheckDefinitions { path: String, detail: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Audit engine errors.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuditError {
    /// True for errors that must stop a run before any report exists.
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, AuditError::Config(_))
    }
}

/// Result type for audit engine operations.
pub type AuditResult<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_repository_names_both_owners() {
        let err = ConfigError::DuplicateRepository {
            repo: "acme/api".to_string(),
            first: "acme/api-gateway".to_string(),
            second: "labs/gateway".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("acme/api-gateway"));
        assert!(msg.contains("labs/gateway"));
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err: AuditError = ConfigError::InvalidConfig("bad".to_string()).into();
        assert!(err.is_fatal_config());
        assert!(err.to_string().contains("configuration error"));

        let io: AuditError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(!io.is_fatal_config());
    }

    #[test]
    fn test_missing_profile_display() {
        let err = ConfigError::MissingProfile {
            service_type: "client-sdk".to_string(),
            services: vec!["acme/sdk-js".to_string()],
        };
        assert!(err.to_string().contains("client-sdk"));
        assert!(err.to_string().contains("acme/sdk-js"));
    }
}
