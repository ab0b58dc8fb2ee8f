//! In-memory fakes for probe traits (testing only)
//!
//! Provides `FakeSourceControl`, `FakeRuntime`, and `RecordingIssueTracker`
//! that satisfy the trait contracts without any network access. Each fake
//! counts its calls so tests can assert that no probe was touched.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use regex::Regex;

use crate::error::{ProbeError, ProbeResult};
use crate::outcome::CheckResult;
use crate::traits::*;

// ---------------------------------------------------------------------------
// FakeSourceControl
// ---------------------------------------------------------------------------

/// Source-control fake keyed by repository.
#[derive(Debug, Default)]
pub struct FakeSourceControl {
    files: HashMap<(String, String), String>,
    workflows: HashMap<String, Vec<(String, String)>>,
    dependencies: HashMap<String, DependencyPresence>,
    protection: HashMap<String, BranchProtection>,
    denied: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeSourceControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with content.
    pub fn with_file(mut self, repo: &str, path: &str, content: &str) -> Self {
        self.files
            .insert((repo.to_string(), path.to_string()), content.to_string());
        self
    }

    /// Add a workflow file under `.github/workflows/`.
    pub fn with_workflow(mut self, repo: &str, file_name: &str, content: &str) -> Self {
        self.workflows.entry(repo.to_string()).or_default().push((
            format!(".github/workflows/{file_name}"),
            content.to_string(),
        ));
        self
    }

    pub fn with_dependency(mut self, repo: &str, presence: DependencyPresence) -> Self {
        self.dependencies.insert(repo.to_string(), presence);
        self
    }

    pub fn with_protection(mut self, repo: &str, protection: BranchProtection) -> Self {
        self.protection.insert(repo.to_string(), protection);
        self
    }

    /// Every call against `repo` fails with `AccessDenied`.
    pub fn deny(mut self, repo: &str) -> Self {
        self.denied.insert(repo.to_string());
        self
    }

    /// Total number of trait calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, repo: &str) -> ProbeResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.denied.contains(repo) {
            return Err(ProbeError::AccessDenied {
                repo: repo.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SourceControlProbe for FakeSourceControl {
    async fn file_exists(&self, repo: &str, path: &str) -> ProbeResult<bool> {
        self.enter(repo)?;
        Ok(self
            .files
            .contains_key(&(repo.to_string(), path.to_string())))
    }

    async fn has_dependency(&self, repo: &str, _package: &str) -> ProbeResult<DependencyPresence> {
        self.enter(repo)?;
        Ok(self.dependencies.get(repo).copied().unwrap_or_default())
    }

    async fn has_workflow_matching(&self, repo: &str, patterns: &[Regex]) -> ProbeResult<bool> {
        self.enter(repo)?;
        Ok(self.workflows.get(repo).is_some_and(|files| {
            files.iter().any(|(path, content)| {
                patterns
                    .iter()
                    .any(|re| re.is_match(path) || re.is_match(content))
            })
        }))
    }

    async fn get_file_content(&self, repo: &str, path: &str) -> ProbeResult<Option<String>> {
        self.enter(repo)?;
        Ok(self
            .files
            .get(&(repo.to_string(), path.to_string()))
            .cloned())
    }

    async fn get_branch_protection(
        &self,
        repo: &str,
        _branch: &str,
    ) -> ProbeResult<BranchProtection> {
        self.enter(repo)?;
        Ok(self.protection.get(repo).copied().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// FakeRuntime
// ---------------------------------------------------------------------------

/// Runtime fake with canned results; anything unset fails.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    health: HashMap<String, CheckResult>,
    registry: HashMap<String, CheckResult>,
    router: HashMap<String, CheckResult>,
    calls: AtomicUsize,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_health(mut self, domain: &str, result: CheckResult) -> Self {
        self.health.insert(domain.to_string(), result);
        self
    }

    pub fn with_registry(mut self, service: &str, result: CheckResult) -> Self {
        self.registry.insert(service.to_string(), result);
        self
    }

    pub fn with_router(mut self, domain: &str, result: CheckResult) -> Self {
        self.router.insert(domain.to_string(), result);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, table: &HashMap<String, CheckResult>, key: &str) -> CheckResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        table
            .get(key)
            .cloned()
            .unwrap_or_else(|| CheckResult::fail(format!("no response from {key}")))
    }
}

#[async_trait]
impl RuntimeProbe for FakeRuntime {
    async fn check_health(&self, domain: &str) -> CheckResult {
        self.lookup(&self.health, domain)
    }

    async fn check_registry(&self, service_name: &str) -> CheckResult {
        self.lookup(&self.registry, service_name)
    }

    async fn check_router(&self, domain: &str) -> CheckResult {
        self.lookup(&self.router, domain)
    }
}

// ---------------------------------------------------------------------------
// RecordingIssueTracker
// ---------------------------------------------------------------------------

/// An issue held by [`RecordingIssueTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedIssue {
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// Issue tracker fake that stores issues in memory and counts reads/writes.
#[derive(Debug, Default)]
pub struct RecordingIssueTracker {
    issues: Mutex<Vec<RecordedIssue>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl RecordingIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self) -> Vec<RecordedIssue> {
        self.issues.lock().unwrap().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn issue_ref(repo: &str, number: u64) -> IssueRef {
        IssueRef {
            number,
            url: format!("https://github.com/{repo}/issues/{number}"),
        }
    }
}

#[async_trait]
impl IssueTracker for RecordingIssueTracker {
    async fn find_open_issue(&self, repo: &str, marker: &str) -> ProbeResult<Option<OpenIssue>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let issues = self.issues.lock().unwrap();
        Ok(issues
            .iter()
            .find(|i| i.repo == repo && i.body.contains(marker))
            .map(|i| OpenIssue {
                issue: Self::issue_ref(repo, i.number),
                title: i.title.clone(),
                body: i.body.clone(),
            }))
    }

    async fn create_issue(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> ProbeResult<IssueRef> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut issues = self.issues.lock().unwrap();
        let number = issues.iter().filter(|i| i.repo == repo).count() as u64 + 1;
        issues.push(RecordedIssue {
            repo: repo.to_string(),
            number,
            title: title.to_string(),
            body: body.to_string(),
            labels: labels.to_vec(),
        });
        Ok(Self::issue_ref(repo, number))
    }

    async fn update_issue(
        &self,
        repo: &str,
        number: u64,
        title: &str,
        body: &str,
    ) -> ProbeResult<IssueRef> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .iter_mut()
            .find(|i| i.repo == repo && i.number == number)
            .ok_or_else(|| ProbeError::Status {
                status: 404,
                url: format!("{repo}#{number}"),
            })?;
        issue.title = title.to_string();
        issue.body = body.to_string();
        Ok(Self::issue_ref(repo, number))
    }
}
