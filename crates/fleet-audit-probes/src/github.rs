//! GitHub REST client
//!
//! Implements [`SourceControlProbe`] and [`IssueTracker`] on top of the
//! GitHub v3 API. All requests share one [`RateLimiter`]; rate-limited
//! responses are retried with exponential backoff before surfacing as
//! [`ProbeError::RateLimited`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use crate::config::ProbeConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::rate_limit::{backoff_delay, RateLimiter};
use crate::traits::{
    BranchProtection, DependencyPresence, IssueRef, IssueTracker, OpenIssue, SourceControlProbe,
};

const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_RAW: &str = "application/vnd.github.raw";
const API_VERSION: &str = "2022-11-28";
const WORKFLOW_DIR: &str = ".github/workflows";
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const ISSUE_PAGE_SIZE: usize = 100;
const MAX_ISSUE_PAGES: usize = 10;

/// Manifests inspected by [`SourceControlProbe::has_dependency`].
const MANIFESTS: &[&str] = &[
    "package.json",
    "Cargo.toml",
    "pyproject.toml",
    "requirements.txt",
    "go.mod",
];

/// A workflow file and its raw content.
#[derive(Debug, Clone)]
struct WorkflowFile {
    path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProtectionPayload {
    required_pull_request_reviews: Option<ReviewsPayload>,
    allow_force_pushes: Option<EnabledPayload>,
}

#[derive(Debug, Deserialize)]
struct ReviewsPayload {
    #[serde(default)]
    required_approving_review_count: u32,
}

#[derive(Debug, Deserialize)]
struct EnabledPayload {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct IssuePayload {
    number: u64,
    html_url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    pull_request: Option<Value>,
}

impl IssuePayload {
    fn issue_ref(&self) -> IssueRef {
        IssueRef {
            number: self.number,
            url: self.html_url.clone(),
        }
    }
}

/// GitHub client for source-control probing and issue filing
pub struct GitHubClient {
    config: ProbeConfig,
    http: reqwest::Client,
    limiter: RateLimiter,
    repo_access: Mutex<HashMap<String, Arc<OnceCell<bool>>>>,
    workflows: Mutex<HashMap<String, Arc<OnceCell<Arc<Vec<WorkflowFile>>>>>>,
}

/// The per-repository cell for `repo`; concurrent callers share one cell
/// and therefore one fetch.
async fn cell_for<T>(
    map: &Mutex<HashMap<String, Arc<OnceCell<T>>>>,
    repo: &str,
) -> Arc<OnceCell<T>> {
    let mut map = map.lock().await;
    Arc::clone(map.entry(repo.to_string()).or_default())
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(config: ProbeConfig) -> ProbeResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| ProbeError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(GitHubClient {
            limiter: RateLimiter::new(config.min_request_interval()),
            config,
            http,
            repo_access: Mutex::new(HashMap::new()),
            workflows: Mutex::new(HashMap::new()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.github_api_url.trim_end_matches('/'), path)
    }

    fn host(&self) -> String {
        self.config
            .github_api_url
            .split("://")
            .nth(1)
            .unwrap_or(&self.config.github_api_url)
            .trim_end_matches('/')
            .to_string()
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> ProbeError {
        if err.is_timeout() {
            ProbeError::Timeout {
                url: url.to_string(),
                secs: self.config.http_timeout_secs,
            }
        } else {
            ProbeError::Http(err.to_string())
        }
    }

    fn is_rate_limited(resp: &Response) -> bool {
        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => true,
            StatusCode::FORBIDDEN => {
                resp.headers().contains_key(RETRY_AFTER)
                    || resp
                        .headers()
                        .get("x-ratelimit-remaining")
                        .and_then(|v| v.to_str().ok())
                        == Some("0")
            }
            _ => false,
        }
    }

    fn retry_after(resp: &Response) -> Option<Duration> {
        resp.headers()
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(|secs| Duration::from_secs(secs).min(MAX_BACKOFF))
    }

    /// Send one request through the limiter, retrying rate-limited responses.
    async fn send(
        &self,
        method: Method,
        url: &str,
        accept: &str,
        body: Option<&Value>,
    ) -> ProbeResult<Response> {
        let mut attempt = 0u32;
        loop {
            self.limiter.acquire().await;

            let mut req = self
                .http
                .request(method.clone(), url)
                .header(ACCEPT, accept)
                .header("X-GitHub-Api-Version", API_VERSION);
            if let Some(token) = &self.config.github_token {
                req = req.bearer_auth(token);
            }
            if let Some(body) = body {
                req = req.json(body);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| self.transport_error(url, e))?;

            if !Self::is_rate_limited(&resp) {
                debug!(%url, status = resp.status().as_u16(), "github request");
                return Ok(resp);
            }

            if attempt >= self.config.max_retries {
                return Err(ProbeError::RateLimited {
                    host: self.host(),
                    attempts: attempt + 1,
                });
            }
            let delay = Self::retry_after(&resp)
                .unwrap_or_else(|| backoff_delay(INITIAL_BACKOFF, attempt, MAX_BACKOFF));
            warn!(%url, attempt, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn get(&self, url: &str, accept: &str) -> ProbeResult<Response> {
        self.send(Method::GET, url, accept, None).await
    }

    /// Map a response status: `Ok(true)` on success, `Ok(false)` on 404.
    fn found(repo: &str, url: &str, resp: &Response) -> ProbeResult<bool> {
        let status = resp.status();
        if status.is_success() {
            return Ok(true);
        }
        match status {
            StatusCode::NOT_FOUND => Ok(false),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProbeError::AccessDenied {
                repo: repo.to_string(),
            }),
            other => Err(ProbeError::Status {
                status: other.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    /// Confirm the repository itself is reachable; cached per repository.
    async fn ensure_repo(&self, repo: &str) -> ProbeResult<()> {
        let cell = cell_for(&self.repo_access, repo).await;
        let reachable = *cell
            .get_or_try_init(|| async {
                let url = self.url(&format!("/repos/{repo}"));
                let resp = self.get(&url, ACCEPT_JSON).await?;
                match Self::found(repo, &url, &resp) {
                    Ok(found) => Ok(found),
                    Err(ProbeError::AccessDenied { .. }) => Ok(false),
                    Err(other) => Err(other),
                }
            })
            .await?;

        if reachable {
            Ok(())
        } else {
            Err(ProbeError::AccessDenied {
                repo: repo.to_string(),
            })
        }
    }

    async fn raw_content(&self, repo: &str, path: &str) -> ProbeResult<Option<String>> {
        let url = self.url(&format!("/repos/{repo}/contents/{path}"));
        let resp = self.get(&url, ACCEPT_RAW).await?;
        if !Self::found(repo, &url, &resp)? {
            return Ok(None);
        }
        let text = resp
            .text()
            .await
            .map_err(|e| ProbeError::Decode(e.to_string()))?;
        Ok(Some(text))
    }

    async fn workflow_files(&self, repo: &str) -> ProbeResult<Arc<Vec<WorkflowFile>>> {
        let cell = cell_for(&self.workflows, repo).await;
        let files = cell
            .get_or_try_init(|| self.fetch_workflow_files(repo))
            .await?;
        Ok(Arc::clone(files))
    }

    async fn fetch_workflow_files(&self, repo: &str) -> ProbeResult<Arc<Vec<WorkflowFile>>> {
        let url = self.url(&format!("/repos/{repo}/contents/{WORKFLOW_DIR}"));
        let resp = self.get(&url, ACCEPT_JSON).await?;
        let mut files = Vec::new();
        if Self::found(repo, &url, &resp)? {
            let entries: Vec<ContentEntry> = resp
                .json()
                .await
                .map_err(|e| ProbeError::Decode(e.to_string()))?;
            for entry in entries.into_iter().filter(|e| e.kind == "file") {
                if let Some(content) = self.raw_content(repo, &entry.path).await? {
                    files.push(WorkflowFile {
                        path: entry.path,
                        content,
                    });
                }
            }
        }
        debug!(%repo, files = files.len(), "workflow files cached");
        Ok(Arc::new(files))
    }
}

/// Whether `manifest` (named `file_name`) declares `package`.
fn manifest_declares(file_name: &str, manifest: &str, package: &str) -> bool {
    if file_name == "package.json" {
        let Ok(parsed) = serde_json::from_str::<Value>(manifest) else {
            return false;
        };
        return [
            "dependencies",
            "devDependencies",
            "peerDependencies",
            "optionalDependencies",
        ]
        .iter()
        .any(|section| parsed.get(section).and_then(|s| s.get(package)).is_some());
    }
    manifest.contains(package)
}

#[async_trait]
impl SourceControlProbe for GitHubClient {
    async fn file_exists(&self, repo: &str, path: &str) -> ProbeResult<bool> {
        self.ensure_repo(repo).await?;
        let url = self.url(&format!("/repos/{repo}/contents/{path}"));
        let resp = self.get(&url, ACCEPT_JSON).await?;
        Self::found(repo, &url, &resp)
    }

    async fn has_dependency(&self, repo: &str, package: &str) -> ProbeResult<DependencyPresence> {
        self.ensure_repo(repo).await?;
        let mut presence = DependencyPresence::default();
        for manifest in MANIFESTS {
            if let Some(content) = self.raw_content(repo, manifest).await? {
                presence.has_manifest = true;
                if manifest_declares(manifest, &content, package) {
                    presence.exists = true;
                    break;
                }
            }
        }
        Ok(presence)
    }

    async fn has_workflow_matching(&self, repo: &str, patterns: &[Regex]) -> ProbeResult<bool> {
        self.ensure_repo(repo).await?;
        let files = self.workflow_files(repo).await?;
        Ok(files.iter().any(|file| {
            patterns
                .iter()
                .any(|re| re.is_match(&file.path) || re.is_match(&file.content))
        }))
    }

    async fn get_file_content(&self, repo: &str, path: &str) -> ProbeResult<Option<String>> {
        self.ensure_repo(repo).await?;
        self.raw_content(repo, path).await
    }

    async fn get_branch_protection(
        &self,
        repo: &str,
        branch: &str,
    ) -> ProbeResult<BranchProtection> {
        self.ensure_repo(repo).await?;
        let url = self.url(&format!("/repos/{repo}/branches/{branch}/protection"));
        let resp = self.get(&url, ACCEPT_JSON).await?;
        match resp.status() {
            StatusCode::NOT_FOUND => return Ok(BranchProtection::default()),
            status if !status.is_success() => {
                // Reading protection needs admin rights; the repository itself is reachable.
                return Err(ProbeError::Status {
                    status: status.as_u16(),
                    url,
                });
            }
            _ => {}
        }

        let payload: ProtectionPayload = resp
            .json()
            .await
            .map_err(|e| ProbeError::Decode(e.to_string()))?;
        Ok(BranchProtection {
            enabled: true,
            required_reviews: payload
                .required_pull_request_reviews
                .map(|r| r.required_approving_review_count > 0)
                .unwrap_or(false),
            no_force_push: payload
                .allow_force_pushes
                .map(|f| !f.enabled)
                .unwrap_or(true),
        })
    }
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn find_open_issue(&self, repo: &str, marker: &str) -> ProbeResult<Option<OpenIssue>> {
        for page in 1..=MAX_ISSUE_PAGES {
            let url = self.url(&format!(
                "/repos/{repo}/issues?state=open&per_page={ISSUE_PAGE_SIZE}&page={page}"
            ));
            let resp = self.get(&url, ACCEPT_JSON).await?;
            if !Self::found(repo, &url, &resp)? {
                return Ok(None);
            }
            let issues: Vec<IssuePayload> = resp
                .json()
                .await
                .map_err(|e| ProbeError::Decode(e.to_string()))?;
            let page_len = issues.len();

            let hit = issues.into_iter().find(|issue| {
                issue.pull_request.is_none()
                    && issue.body.as_deref().is_some_and(|b| b.contains(marker))
            });
            if let Some(issue) = hit {
                return Ok(Some(OpenIssue {
                    issue: issue.issue_ref(),
                    title: issue.title,
                    body: issue.body.unwrap_or_default(),
                }));
            }
            if page_len < ISSUE_PAGE_SIZE {
                break;
            }
        }
        Ok(None)
    }

    async fn create_issue(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> ProbeResult<IssueRef> {
        let url = self.url(&format!("/repos/{repo}/issues"));
        let payload = json!({ "title": title, "body": body, "labels": labels });
        let resp = self
            .send(Method::POST, &url, ACCEPT_JSON, Some(&payload))
            .await?;
        if !Self::found(repo, &url, &resp)? {
            return Err(ProbeError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                url,
            });
        }
        let issue: IssuePayload = resp
            .json()
            .await
            .map_err(|e| ProbeError::Decode(e.to_string()))?;
        Ok(issue.issue_ref())
    }

    async fn update_issue(
        &self,
        repo: &str,
        number: u64,
        title: &str,
        body: &str,
    ) -> ProbeResult<IssueRef> {
        let url = self.url(&format!("/repos/{repo}/issues/{number}"));
        let payload = json!({ "title": title, "body": body });
        let resp = self
            .send(Method::PATCH, &url, ACCEPT_JSON, Some(&payload))
            .await?;
        if !Self::found(repo, &url, &resp)? {
            return Err(ProbeError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                url,
            });
        }
        let issue: IssuePayload = resp
            .json()
            .await
            .map_err(|e| ProbeError::Decode(e.to_string()))?;
        Ok(issue.issue_ref())
    }
}
