//! Error types for fleet-audit-probes

use thiserror::Error;

/// Errors that can occur while talking to an external collaborator
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Transport-level failure (DNS, TLS, connection reset)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request exceeded the configured timeout
    #[error("request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// Unexpected status code
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// Rate limit still exhausted after all retries
    #[error("rate limited by {host} after {attempts} attempts")]
    RateLimited { host: String, attempts: u32 },

    /// Credentials missing or insufficient for the repository
    #[error("access denied to repository {repo}")]
    AccessDenied { repo: String },

    /// Response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Probe could not be constructed from its configuration
    #[error("invalid probe configuration: {0}")]
    Config(String),
}

impl ProbeError {
    /// True when the repository as a whole could not be reached, as opposed
    /// to a single call failing.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, ProbeError::AccessDenied { .. })
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        ProbeError::Decode(err.to_string())
    }
}

/// Result type for probe operations
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_display_names_repo() {
        let err = ProbeError::AccessDenied {
            repo: "acme/private".to_string(),
        };
        assert!(err.to_string().contains("acme/private"));
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_timeout_display() {
        let err = ProbeError::Timeout {
            url: "https://api.acme.dev/health".to_string(),
            secs: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("10s"));
        assert!(!err.is_access_denied());
    }
}
