//! Probe traits consumed by the audit engine.
//!
//! Implement these to plug in real APIs or test stubs (see [`crate::fakes`]).
//! Every call may be slow; callers must not assume they are instantaneous.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ProbeResult;
use crate::outcome::CheckResult;

/// Outcome of looking for a package across a repository's manifests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyPresence {
    /// The package is declared by at least one manifest.
    pub exists: bool,
    /// At least one dependency manifest exists in the repository.
    pub has_manifest: bool,
}

/// Branch protection settings for one branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchProtection {
    pub enabled: bool,
    pub required_reviews: bool,
    pub no_force_push: bool,
}

/// Static source-control checks against a repository (`owner/name`).
#[async_trait]
pub trait SourceControlProbe: Send + Sync {
    /// Whether `path` exists on the default branch.
    async fn file_exists(&self, repo: &str, path: &str) -> ProbeResult<bool>;

    /// Whether any dependency manifest declares `package`.
    async fn has_dependency(&self, repo: &str, package: &str) -> ProbeResult<DependencyPresence>;

    /// Whether any workflow file's path or content matches one of `patterns`.
    async fn has_workflow_matching(&self, repo: &str, patterns: &[Regex]) -> ProbeResult<bool>;

    /// Raw file content, or `None` when the file does not exist.
    async fn get_file_content(&self, repo: &str, path: &str) -> ProbeResult<Option<String>>;

    /// Protection settings of `branch`; an unprotected branch is all `false`.
    async fn get_branch_protection(&self, repo: &str, branch: &str)
        -> ProbeResult<BranchProtection>;
}

/// Reference to an issue in the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    pub url: String,
}

/// An open issue as seen by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenIssue {
    pub issue: IssueRef,
    pub title: String,
    pub body: String,
}

/// Write side of the source-control collaborator.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// First open issue in `repo` whose body contains `marker`.
    async fn find_open_issue(&self, repo: &str, marker: &str) -> ProbeResult<Option<OpenIssue>>;

    async fn create_issue(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> ProbeResult<IssueRef>;

    async fn update_issue(
        &self,
        repo: &str,
        number: u64,
        title: &str,
        body: &str,
    ) -> ProbeResult<IssueRef>;
}

/// Live HTTP checks against deployed services.
///
/// Transport and status failures are reported as a failing [`CheckResult`]
/// with a human-readable reason, never as an error.
#[async_trait]
pub trait RuntimeProbe: Send + Sync {
    async fn check_health(&self, domain: &str) -> CheckResult;

    async fn check_registry(&self, service_name: &str) -> CheckResult;

    async fn check_router(&self, domain: &str) -> CheckResult;
}
