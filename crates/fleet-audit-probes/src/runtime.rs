//! Live HTTP probes against deployed services.
//!
//! Each check is a single bounded-timeout request. Transport and status
//! failures become a failing [`CheckResult`] with a readable reason.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::ProbeConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::outcome::CheckResult;
use crate::traits::RuntimeProbe;

const HEALTHY_STATUSES: &[&str] = &["ok", "healthy", "pass", "up"];

/// Whether `body` has one of the recognised health shapes: a JSON object
/// whose `status` is a healthy word, or the plain text `ok`.
pub fn recognized_health_body(body: &str) -> bool {
    let trimmed = body.trim();
    if trimmed.eq_ignore_ascii_case("ok") {
        return true;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map
            .get("status")
            .and_then(Value::as_str)
            .map(|s| {
                HEALTHY_STATUSES
                    .iter()
                    .any(|healthy| s.eq_ignore_ascii_case(healthy))
            })
            .unwrap_or(false),
        _ => false,
    }
}

/// reqwest-backed [`RuntimeProbe`]
pub struct HttpRuntimeProbe {
    config: ProbeConfig,
    http: reqwest::Client,
}

impl HttpRuntimeProbe {
    pub fn new(config: ProbeConfig) -> ProbeResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| ProbeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, CheckResult> {
        debug!(%url, "runtime probe");
        self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                CheckResult::fail(format!(
                    "request to {url} timed out after {}s",
                    self.config.http_timeout_secs
                ))
            } else {
                CheckResult::fail(format!("request to {url} failed: {e}"))
            }
        })
    }
}

#[async_trait]
impl RuntimeProbe for HttpRuntimeProbe {
    async fn check_health(&self, domain: &str) -> CheckResult {
        let url = format!("https://{domain}{}", self.config.health_path);
        let resp = match self.get(&url).await {
            Ok(resp) => resp,
            Err(failed) => return failed,
        };
        let status = resp.status();
        if !status.is_success() {
            return CheckResult::fail(format!(
                "health endpoint {url} returned status {}",
                status.as_u16()
            ));
        }
        match resp.text().await {
            Ok(body) if recognized_health_body(&body) => CheckResult::pass(),
            Ok(_) => CheckResult::fail(format!("health endpoint {url} returned an unrecognised body")),
            Err(e) => CheckResult::fail(format!("health endpoint {url} body unreadable: {e}")),
        }
    }

    async fn check_registry(&self, service_name: &str) -> CheckResult {
        let url = format!(
            "{}/services/{service_name}",
            self.config.registry_url.trim_end_matches('/')
        );
        let resp = match self.get(&url).await {
            Ok(resp) => resp,
            Err(failed) => return failed,
        };
        match resp.status() {
            s if s.is_success() => CheckResult::pass(),
            reqwest::StatusCode::NOT_FOUND => {
                CheckResult::fail(format!("service {service_name} is not registered"))
            }
            s => CheckResult::fail(format!("registry returned status {}", s.as_u16())),
        }
    }

    async fn check_router(&self, domain: &str) -> CheckResult {
        let url = format!("https://{domain}/");
        let resp = match self.get(&url).await {
            Ok(resp) => resp,
            Err(failed) => return failed,
        };
        let status = resp.status();
        if status.is_server_error() {
            CheckResult::fail(format!("router for {domain} returned status {}", status.as_u16()))
        } else {
            CheckResult::pass()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ok_body_recognised() {
        assert!(recognized_health_body("ok"));
        assert!(recognized_health_body("OK\n"));
    }

    #[test]
    fn test_json_status_body_recognised() {
        assert!(recognized_health_body(r#"{"status":"healthy","version":"1.2.0"}"#));
        assert!(recognized_health_body(r#"{"status":"UP"}"#));
    }

    #[test]
    fn test_unhealthy_or_unknown_bodies_rejected() {
        assert!(!recognized_health_body(r#"{"status":"degraded"}"#));
        assert!(!recognized_health_body(r#"{"healthy":true}"#));
        assert!(!recognized_health_body("<html>welcome</html>"));
        assert!(!recognized_health_body(""));
    }

    #[test]
    fn test_probe_requires_finite_timeout() {
        let config = ProbeConfig {
            http_timeout_secs: 0,
            ..ProbeConfig::default()
        };
        assert!(HttpRuntimeProbe::new(config).is_err());
    }
}
