//! Structured lifecycle events for audit and remediation runs.
//!
//! Every event carries an `event` field (`audit.started`,
//! `service.classified`, `audit.finished`, `remediation.issue`) so log
//! pipelines can filter on it.

use tracing::{info, warn};

/// The run-scoped span; every log line emitted inside carries the run id.
pub fn audit_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("fleet_audit.run", run_id = %run_id)
}

pub fn emit_audit_started(run_id: &str, organizations: usize, services: usize, skip_runtime: bool) {
    info!(
        event = "audit.started",
        run_id = %run_id,
        organizations = organizations,
        services = services,
        skip_runtime = skip_runtime,
    );
}

pub fn emit_service_classified(service: &str, classification: &str, warnings: usize) {
    info!(
        event = "service.classified",
        service = %service,
        classification = %classification,
        warnings = warnings,
    );
}

pub fn emit_audit_finished(run_id: &str, duration_ms: u64, total: usize, compliance_rate: u32) {
    info!(
        event = "audit.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        total = total,
        compliance_rate = compliance_rate,
    );
}

/// `action` is one of `planned`, `created`, `updated`, `unchanged`.
pub fn emit_remediation_issue(repo: &str, action: &str, number: Option<u64>) {
    info!(event = "remediation.issue", repo = %repo, action = %action, number = ?number);
}

pub fn emit_remediation_error(repo: &str, error: &dyn std::fmt::Display) {
    warn!(event = "remediation.error", repo = %repo, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_span_create() {
        let _span = audit_span("test-run-id").entered();
        emit_service_classified("acme/gateway", "full_pass", 0);
    }
}
