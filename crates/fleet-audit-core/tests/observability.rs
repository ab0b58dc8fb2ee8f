//! Lifecycle events and counters emitted by an audit run.

use std::sync::Arc;

use fleet_audit_core::metrics::METRICS;
use fleet_audit_core::obs::{
    audit_span, emit_audit_finished, emit_audit_started, emit_remediation_error,
    emit_remediation_issue,
};
use fleet_audit_core::{AuditConfig, AuditFilter, AuditOrchestrator, Registry};
use fleet_audit_probes::fakes::{FakeRuntime, FakeSourceControl};
use tracing_test::traced_test;

const REGISTRY: &str = r#"
compliance_profiles:
  documentation:
    source_control: not_applicable
    monitoring: not_applicable
    canonical_files: required
    registry_heartbeat: not_applicable
    routing: not_applicable
    trust_chain: not_applicable
    health_endpoint: not_applicable
organizations:
  acme:
    services:
      handbook:
        repo: acme/handbook
        tier: 3
        type: documentation
"#;

#[traced_test]
#[test]
fn test_emit_audit_started_logs_event() {
    emit_audit_started("run-123", 2, 14, true);
    assert!(logs_contain("audit.started"));
    assert!(logs_contain("skip_runtime=true"));
}

#[traced_test]
#[test]
fn test_emit_audit_finished_logs_rate() {
    emit_audit_finished("run-456", 1200, 14, 57);
    assert!(logs_contain("audit.finished"));
    assert!(logs_contain("compliance_rate=57"));
}

#[traced_test]
#[test]
fn test_remediation_events() {
    emit_remediation_issue("acme/api", "created", Some(12));
    let error = "GitHub returned 502";
    emit_remediation_error("acme/web", &error);
    assert!(logs_contain("remediation.issue"));
    assert!(logs_contain("remediation.error"));
}

#[traced_test]
#[test]
fn test_audit_span_tags_run_id() {
    let _span = audit_span("span-run-1").entered();
    tracing::info!("inside span");
    assert!(logs_contain("span-run-1"));
}

#[traced_test]
#[tokio::test]
async fn test_audit_run_emits_lifecycle_and_counts() {
    METRICS.reset();
    let registry = Registry::parse(REGISTRY, "inline").unwrap();
    let source = FakeSourceControl::new().with_file("acme/handbook", "README.md", "");
    let orchestrator = AuditOrchestrator::new(
        registry,
        Arc::new(source),
        Arc::new(FakeRuntime::new()),
        AuditConfig::default(),
    )
    .unwrap();

    let report = orchestrator.run(&AuditFilter::all()).await.unwrap();

    assert!(logs_contain("audit.started"));
    assert!(logs_contain("service.classified"));
    assert!(logs_contain("audit.finished"));
    assert!(logs_contain(&report.run_id.to_string()));
    assert_eq!(METRICS.checks_evaluated(), 1);
    assert_eq!(METRICS.services_audited(), 1);
    assert_eq!(METRICS.probe_failures(), 0);
}
