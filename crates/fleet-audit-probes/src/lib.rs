//! Fleet-Audit Probes: boundary collaborators for the compliance engine
//!
//! This crate provides the two external probes the audit engine talks to:
//! a source-control probe (GitHub REST) and a runtime probe (live HTTP
//! checks against deployed services). Both own their own timeout and
//! rate-limit policy; the engine only ever sees the traits in [`traits`].
//!
//! ## Layer 0 - Boundary
//!
//! Focus: bounded, rate-limited calls that never panic and always map
//! transport failures to a [`ProbeError`] or a failing [`CheckResult`].

pub mod config;
pub mod error;
pub mod fakes;
pub mod github;
pub mod outcome;
pub mod rate_limit;
pub mod runtime;
pub mod traits;

pub use config::ProbeConfig;
pub use error::{ProbeError, ProbeResult};
pub use github::GitHubClient;
pub use outcome::{CheckResult, CheckStatus};
pub use rate_limit::RateLimiter;
pub use runtime::{recognized_health_body, HttpRuntimeProbe};
pub use traits::{
    BranchProtection, DependencyPresence, IssueRef, IssueTracker, OpenIssue, RuntimeProbe,
    SourceControlProbe,
};
