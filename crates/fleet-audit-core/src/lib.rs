//! Fleet-Audit Core: the compliance audit engine
//!
//! Loads the service registry and its compliance profiles, evaluates every
//! service across seven dimensions through the probes in
//! [`fleet_audit_probes`], classifies and aggregates the results into an
//! [`AuditReport`], renders it as JSON and Markdown, and turns failing
//! services into tracking issues.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use fleet_audit_core::{AuditConfig, AuditFilter, AuditOrchestrator, Registry};
//!
//! let registry = Registry::load(Path::new("services.yml"))?;
//! let orchestrator = AuditOrchestrator::new(registry, source, runtime, AuditConfig::default())?;
//! let report = orchestrator.run(&AuditFilter::all()).await?;
//! ```

pub mod applicability;
pub mod checks;
pub mod config;
pub mod dimension;
pub mod error;
pub mod evaluators;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod registry;
pub mod remediation;
pub mod render;
pub mod report;
pub mod rules;
pub mod telemetry;

pub use applicability::{apply, resolve, Evaluated, OPTIONAL_NOT_CONFIGURED};
pub use checks::{CheckDefinition, CheckDefinitions};
pub use config::AuditConfig;
pub use dimension::{Applicability, Dimension};
pub use error::{AuditError, AuditResult, ConfigError};
pub use evaluators::{
    DimensionEvaluator, EvaluationContext, EvaluatorRegistry, NO_DOMAIN, RUNTIME_SKIPPED,
};
pub use orchestrator::{AuditFilter, AuditOrchestrator, AuditPhase};
pub use registry::{ComplianceProfile, Registry, ServiceDescriptor, ServiceType};
pub use remediation::{
    plan_issues, IssueAction, IssueDraft, RemediationEngine, RemediationMode, RemediationOutcome,
    RemediationSummary,
};
pub use render::{render, RenderedReport};
pub use report::{
    compliance_rate, AuditReport, AuditSummary, Classification, DimensionStats,
    OrganizationReport, PartialRunWarning, ServiceReport, INACTIVE_REASON,
};
pub use rules::{CompiledRules, DimensionRules, ProtectionWeights};
pub use telemetry::init_tracing;

pub use fleet_audit_probes::{CheckResult, CheckStatus, ProbeConfig, ProbeError};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
