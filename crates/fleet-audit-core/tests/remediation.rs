//! Remediation against a recording issue tracker.

use std::collections::BTreeMap;
use std::sync::Arc;

use fleet_audit_core::remediation::issue_marker;
use fleet_audit_core::{
    plan_issues, AuditReport, CheckDefinitions, CheckResult, Dimension, IssueAction,
    OrganizationReport, RemediationEngine, RemediationMode, ServiceDescriptor, ServiceReport,
    ServiceType,
};
use fleet_audit_probes::fakes::RecordingIssueTracker;
use fleet_audit_probes::IssueTracker;
use uuid::Uuid;

fn descriptor(org: &str, name: &str) -> ServiceDescriptor {
    ServiceDescriptor {
        organization: org.to_string(),
        name: name.to_string(),
        repo: format!("{org}/{name}"),
        tier: 1,
        service_type: ServiceType::CloudflareWorker,
        domain: Some(format!("{name}.{org}.dev")),
        active: true,
    }
}

fn report_with(gateway_health: CheckResult) -> AuditReport {
    let mut gateway = BTreeMap::new();
    gateway.insert(
        Dimension::SourceControl,
        CheckResult::fail("missing .github/fleet.yml"),
    );
    gateway.insert(Dimension::HealthEndpoint, gateway_health);
    gateway.insert(Dimension::CanonicalFiles, CheckResult::pass());

    let mut clean = BTreeMap::new();
    clean.insert(Dimension::CanonicalFiles, CheckResult::pass());

    let mut acme = OrganizationReport::default();
    acme.services.insert(
        "gateway".to_string(),
        ServiceReport::audited(&descriptor("acme", "gateway"), gateway, Vec::new()),
    );
    acme.services.insert(
        "web".to_string(),
        ServiceReport::audited(&descriptor("acme", "web"), clean, Vec::new()),
    );
    let mut retired = ServiceReport::inactive(&descriptor("acme", "retired"));
    retired.active = false;
    acme.services.insert("retired".to_string(), retired);

    let mut organizations = BTreeMap::new();
    organizations.insert("acme".to_string(), acme);
    AuditReport::assemble("2.1", Uuid::nil(), false, organizations)
}

fn engine(tracker: &Arc<RecordingIssueTracker>) -> RemediationEngine {
    let tracker: Arc<dyn IssueTracker> = tracker.clone();
    RemediationEngine::new(Some(tracker), vec!["compliance".to_string()])
}

#[test]
fn only_failing_and_partial_services_get_drafts() {
    let drafts = plan_issues(
        &report_with(CheckResult::fail("timeout after 10s")),
        &CheckDefinitions::builtin(),
    );
    assert_eq!(drafts.len(), 1);
    let draft = &drafts[0];
    assert_eq!(draft.repo, "acme/gateway");
    assert!(draft.body.starts_with(&issue_marker("acme", "gateway")));
    assert!(draft.body.contains("missing .github/fleet.yml"));
    assert!(draft.body.contains("timeout after 10s"));
    assert!(draft.body.contains(&draft.fingerprint));
}

#[tokio::test]
async fn dry_run_matches_issue_bodies_and_never_writes() {
    let report = report_with(CheckResult::fail("timeout after 10s"));
    let tracker = Arc::new(RecordingIssueTracker::new());

    let dry = engine(&tracker)
        .run(&report, RemediationMode::DryRun)
        .await
        .unwrap();
    assert_eq!(tracker.reads(), 0);
    assert_eq!(tracker.writes(), 0);
    assert!(dry.outcomes.iter().all(|o| o.action == IssueAction::Planned));

    let filed = engine(&tracker)
        .run(&report, RemediationMode::Issues)
        .await
        .unwrap();
    let dry_bodies: Vec<_> = dry.outcomes.iter().map(|o| &o.draft.body).collect();
    let filed_bodies: Vec<_> = filed.outcomes.iter().map(|o| &o.draft.body).collect();
    assert_eq!(dry_bodies, filed_bodies);

    let issues = tracker.issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(&issues[0].body, dry_bodies[0]);
    assert_eq!(issues[0].labels, vec!["compliance".to_string()]);
}

#[tokio::test]
async fn repeated_runs_do_not_duplicate_issues() {
    let report = report_with(CheckResult::fail("timeout after 10s"));
    let tracker = Arc::new(RecordingIssueTracker::new());
    let engine = engine(&tracker);

    let first = engine.run(&report, RemediationMode::Issues).await.unwrap();
    assert_eq!(first.count("created"), 1);

    let second = engine.run(&report, RemediationMode::Issues).await.unwrap();
    assert_eq!(second.count("unchanged"), 1);
    assert_eq!(tracker.issues().len(), 1);
    assert_eq!(tracker.writes(), 1);
}

#[tokio::test]
async fn changed_findings_update_the_open_issue() {
    let tracker = Arc::new(RecordingIssueTracker::new());
    let engine = engine(&tracker);

    engine
        .run(
            &report_with(CheckResult::fail("timeout after 10s")),
            RemediationMode::Issues,
        )
        .await
        .unwrap();
    let second = engine
        .run(
            &report_with(CheckResult::fail("health endpoint returned 503")),
            RemediationMode::Issues,
        )
        .await
        .unwrap();

    assert_eq!(second.count("updated"), 1);
    let issues = tracker.issues();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].body.contains("returned 503"));
    assert!(!issues[0].body.contains("timeout after 10s"));
}

#[tokio::test]
async fn issues_mode_without_tracker_is_a_config_error() {
    let report = report_with(CheckResult::fail("timeout after 10s"));
    let err = RemediationEngine::new(None, Vec::new())
        .run(&report, RemediationMode::Issues)
        .await
        .unwrap_err();
    assert!(err.is_fatal_config());
}

#[tokio::test]
async fn tier_change_updates_the_open_issue() {
    let tracker = Arc::new(RecordingIssueTracker::new());
    let engine = engine(&tracker);
    let report = report_with(CheckResult::fail("timeout after 10s"));
    engine.run(&report, RemediationMode::Issues).await.unwrap();

    let mut retiered = report.clone();
    if let Some(gateway) = retiered
        .organizations
        .get_mut("acme")
        .and_then(|org| org.services.get_mut("gateway"))
    {
        gateway.tier = 3;
    }
    let second = engine.run(&retiered, RemediationMode::Issues).await.unwrap();

    assert_eq!(second.count("updated"), 1);
    let issues = tracker.issues();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].body.contains("(tier 3,"));
}
