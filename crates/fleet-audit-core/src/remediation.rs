//! Remediation: turn a prior report into tracking issues.
//!
//! Every service classified `fail` or `partial` gets one [`IssueDraft`]
//! with a deterministic body. The body embeds a per-service marker and a
//! fingerprint of everything else it renders, so filing is
//! search-before-create:
//!
//! - no open issue carries the marker: create one
//! - an open issue carries the marker with a different fingerprint: update it
//! - same fingerprint: leave it alone
//!
//! Dry-run builds the same drafts and never touches the tracker.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use fleet_audit_probes::{CheckStatus, IssueRef, IssueTracker};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::checks::CheckDefinitions;
use crate::error::{AuditResult, ConfigError};
use crate::metrics::METRICS;
use crate::obs;
use crate::report::{AuditReport, ServiceReport};

const FINGERPRINT_PREFIX: &str = "<!-- fleet-audit-fingerprint:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemediationMode {
    DryRun,
    Issues,
}

impl RemediationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemediationMode::DryRun => "dry-run",
            RemediationMode::Issues => "issues",
        }
    }
}

impl fmt::Display for RemediationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemediationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dry-run" => Ok(RemediationMode::DryRun),
            "issues" => Ok(RemediationMode::Issues),
            other => Err(format!(
                "unknown remediation mode `{other}` (expected dry-run or issues)"
            )),
        }
    }
}

/// Marker identifying the tracking issue of one service.
pub fn issue_marker(org: &str, service: &str) -> String {
    format!("<!-- fleet-audit:{org}/{service} -->")
}

/// Fingerprint embedded in an existing issue body, if any.
pub fn extract_fingerprint(body: &str) -> Option<&str> {
    body.lines()
        .find_map(|line| line.trim().strip_prefix(FINGERPRINT_PREFIX))
        .and_then(|rest| rest.strip_suffix("-->"))
        .map(str::trim)
}

/// The issue one service should have open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDraft {
    pub organization: String,
    pub service: String,
    pub repo: String,
    pub title: String,
    pub body: String,
    pub marker: String,
    pub fingerprint: String,
}

/// One finding line per failing dimension. A service that failed without
/// any failing check (everything skipped) lists its skipped checks instead.
fn findings(service: &ServiceReport, definitions: &CheckDefinitions) -> String {
    let mut out = String::new();
    let mut failing = service.failing_checks().peekable();
    if failing.peek().is_some() {
        for (dimension, check) in failing {
            out.push_str(&format!(
                "- **{}** (`{}`): {}\n",
                definitions.name(dimension),
                dimension,
                check.reason.as_deref().unwrap_or("failed")
            ));
            for detail in &check.details {
                out.push_str(&format!("  - {detail}\n"));
            }
        }
    } else {
        out.push_str("No applicable check passed:\n\n");
        for (dimension, check) in &service.checks {
            if check.status == CheckStatus::Skip {
                out.push_str(&format!(
                    "- **{}** (`{}`): skipped, {}\n",
                    definitions.name(*dimension),
                    dimension,
                    check.reason.as_deref().unwrap_or("no reason recorded")
                ));
            }
        }
    }
    for warning in &service.warnings {
        out.push_str(&format!(
            "- warning on `{}`: {}\n",
            warning.dimension, warning.message
        ));
    }
    out
}

fn draft(
    org: &str,
    name: &str,
    service: &ServiceReport,
    definitions: &CheckDefinitions,
) -> IssueDraft {
    let marker = issue_marker(org, name);
    let title = format!("Fleet compliance: {org}/{name} is {}", service.classification);
    let findings = findings(service, definitions);

    let content = format!(
        "{marker}\n\
         ## Compliance findings for `{org}/{name}`\n\n\
         Classification: **{classification}** (tier {tier}, type `{service_type}`)\n\n\
         {findings}\n\
         Re-run the audit after fixing these; this issue is updated in place.\n",
        classification = service.classification,
        tier = service.tier,
        service_type = service.service_type,
    );

    // Everything rendered except the fingerprint line itself.
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(content.as_bytes());
    let fingerprint = hex::encode(hasher.finalize());
    let body = format!("{content}\n{FINGERPRINT_PREFIX}{fingerprint} -->\n");

    IssueDraft {
        organization: org.to_string(),
        service: name.to_string(),
        repo: service.repo.clone(),
        title,
        body,
        marker,
        fingerprint,
    }
}

/// Drafts for every service needing remediation, in report order.
pub fn plan_issues(report: &AuditReport, definitions: &CheckDefinitions) -> Vec<IssueDraft> {
    report
        .services()
        .filter(|(_, _, service)| !service.skipped && service.classification.needs_remediation())
        .map(|(org, name, service)| draft(org, name, service, definitions))
        .collect()
}

/// What happened to one draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IssueAction {
    /// Dry-run: nothing was sent.
    Planned,
    Created { issue: IssueRef },
    Updated { issue: IssueRef },
    Unchanged { issue: IssueRef },
    Failed { error: String },
}

impl IssueAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueAction::Planned => "planned",
            IssueAction::Created { .. } => "created",
            IssueAction::Updated { .. } => "updated",
            IssueAction::Unchanged { .. } => "unchanged",
            IssueAction::Failed { .. } => "failed",
        }
    }

    fn issue_number(&self) -> Option<u64> {
        match self {
            IssueAction::Created { issue }
            | IssueAction::Updated { issue }
            | IssueAction::Unchanged { issue } => Some(issue.number),
            IssueAction::Planned | IssueAction::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationOutcome {
    pub draft: IssueDraft,
    #[serde(flatten)]
    pub action: IssueAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationSummary {
    pub mode: RemediationMode,
    pub outcomes: Vec<RemediationOutcome>,
}

impl RemediationSummary {
    pub fn count(&self, action: &str) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.action.as_str() == action)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RemediationOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.action, IssueAction::Failed { .. }))
    }
}

pub struct RemediationEngine {
    tracker: Option<Arc<dyn IssueTracker>>,
    labels: Vec<String>,
    definitions: CheckDefinitions,
}

impl RemediationEngine {
    pub fn new(tracker: Option<Arc<dyn IssueTracker>>, labels: Vec<String>) -> Self {
        Self {
            tracker,
            labels,
            definitions: CheckDefinitions::builtin(),
        }
    }

    pub fn with_definitions(mut self, definitions: CheckDefinitions) -> Self {
        self.definitions = definitions;
        self
    }

    /// File (or, in dry-run, only plan) issues for `report`.
    ///
    /// A failure on one repository is recorded on its outcome and the run
    /// moves on to the next draft.
    pub async fn run(
        &self,
        report: &AuditReport,
        mode: RemediationMode,
    ) -> AuditResult<RemediationSummary> {
        let drafts = plan_issues(report, &self.definitions);
        debug!(%mode, drafts = drafts.len(), "remediation planned");

        let tracker = match mode {
            RemediationMode::DryRun => None,
            RemediationMode::Issues => Some(self.tracker.as_ref().ok_or_else(|| {
                ConfigError::InvalidConfig("issues mode requires an issue tracker".to_string())
            })?),
        };

        let mut outcomes = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let action = match tracker {
                None => IssueAction::Planned,
                Some(tracker) => self.ensure_issue(tracker.as_ref(), &draft).await,
            };
            match &action {
                IssueAction::Failed { error } => obs::emit_remediation_error(&draft.repo, error),
                other => obs::emit_remediation_issue(&draft.repo, other.as_str(), other.issue_number()),
            }
            outcomes.push(RemediationOutcome { draft, action });
        }
        Ok(RemediationSummary { mode, outcomes })
    }

    async fn ensure_issue(&self, tracker: &dyn IssueTracker, draft: &IssueDraft) -> IssueAction {
        let existing = match tracker.find_open_issue(&draft.repo, &draft.marker).await {
            Ok(existing) => existing,
            Err(err) => {
                return IssueAction::Failed {
                    error: err.to_string(),
                }
            }
        };

        let result = match existing {
            Some(open) if extract_fingerprint(&open.body) == Some(draft.fingerprint.as_str()) => {
                return IssueAction::Unchanged { issue: open.issue };
            }
            Some(open) => tracker
                .update_issue(&draft.repo, open.issue.number, &draft.title, &draft.body)
                .await
                .map(|issue| IssueAction::Updated { issue }),
            None => tracker
                .create_issue(&draft.repo, &draft.title, &draft.body, &self.labels)
                .await
                .map(|issue| IssueAction::Created { issue }),
        };
        match result {
            Ok(action) => {
                METRICS.inc_issues_filed();
                action
            }
            Err(err) => IssueAction::Failed {
                error: err.to_string(),
            },
        }
    }
}
