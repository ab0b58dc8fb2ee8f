//! Dimension evaluators.
//!
//! One evaluator per [`Dimension`], registered in an [`EvaluatorRegistry`]
//! and invoked generically by the orchestrator. Each evaluator gathers
//! evidence through the probes and hands it to a pure `judge` function, so
//! the pass/fail rules are testable without any probe at all.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use fleet_audit_core::evaluators::{EvaluationContext, EvaluatorRegistry};
//!
//! let evaluators = EvaluatorRegistry::standard();
//! let evaluated = evaluators.evaluate(Dimension::Routing, Applicability::Required, &ctx).await;
//! ```

pub mod canonical_files;
pub mod health_endpoint;
pub mod monitoring;
pub mod registry_heartbeat;
pub mod routing;
pub mod source_control;
pub mod trust_chain;

use std::collections::BTreeMap;

use async_trait::async_trait;
use fleet_audit_probes::{CheckResult, ProbeResult, RuntimeProbe, SourceControlProbe};
use tracing::debug;

use crate::applicability::{resolve, Evaluated};
use crate::dimension::{Applicability, Dimension};
use crate::metrics::METRICS;
use crate::registry::ServiceDescriptor;
use crate::report::PartialRunWarning;
use crate::rules::CompiledRules;

pub use canonical_files::CanonicalFilesEvaluator;
pub use health_endpoint::HealthEndpointEvaluator;
pub use monitoring::MonitoringEvaluator;
pub use registry_heartbeat::RegistryHeartbeatEvaluator;
pub use routing::RoutingEvaluator;
pub use source_control::SourceControlEvaluator;
pub use trust_chain::TrustChainEvaluator;

pub const RUNTIME_SKIPPED: &str = "runtime checks skipped";
pub const NO_DOMAIN: &str = "no domain configured";

/// Everything an evaluator may look at for one service.
pub struct EvaluationContext<'a> {
    pub service: &'a ServiceDescriptor,
    pub source: &'a dyn SourceControlProbe,
    pub runtime: &'a dyn RuntimeProbe,
    pub rules: &'a CompiledRules,
    pub skip_runtime: bool,
    /// Branch inspected for protection settings.
    pub default_branch: &'a str,
}

impl EvaluationContext<'_> {
    pub fn repo(&self) -> &str {
        &self.service.repo
    }

    /// Pre-flight for domain-bound runtime checks: the domain to probe, or
    /// the `skip` result when no network call may be made.
    pub fn runtime_gate(&self) -> Result<&str, CheckResult> {
        if self.skip_runtime {
            return Err(CheckResult::skip(RUNTIME_SKIPPED));
        }
        self.service
            .domain
            .as_deref()
            .ok_or_else(|| CheckResult::skip(NO_DOMAIN))
    }
}

/// Evaluates one compliance dimension for one service.
#[async_trait]
pub trait DimensionEvaluator: Send + Sync {
    fn dimension(&self) -> Dimension;

    /// Probe failures are returned as errors; the registry turns them into
    /// a failing result.
    async fn evaluate(&self, ctx: &EvaluationContext<'_>) -> ProbeResult<CheckResult>;
}

/// Evaluators keyed by dimension.
#[derive(Default)]
pub struct EvaluatorRegistry {
    evaluators: BTreeMap<Dimension, Box<dyn DimensionEvaluator>>,
}

impl EvaluatorRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All seven built-in evaluators.
    pub fn standard() -> Self {
        Self::empty()
            .register(SourceControlEvaluator)
            .register(MonitoringEvaluator)
            .register(CanonicalFilesEvaluator)
            .register(RegistryHeartbeatEvaluator)
            .register(RoutingEvaluator)
            .register(TrustChainEvaluator)
            .register(HealthEndpointEvaluator)
    }

    /// Register (or replace) the evaluator for its dimension.
    pub fn register(mut self, evaluator: impl DimensionEvaluator + 'static) -> Self {
        self.evaluators
            .insert(evaluator.dimension(), Box::new(evaluator));
        self
    }

    pub fn get(&self, dimension: Dimension) -> Option<&dyn DimensionEvaluator> {
        self.evaluators.get(&dimension).map(|e| e.as_ref())
    }

    /// Evaluate `dimension` under `applicability`.
    ///
    /// Never fails: probe errors become a `fail` with the error as reason,
    /// and an inaccessible repository also yields a [`PartialRunWarning`].
    pub async fn evaluate(
        &self,
        dimension: Dimension,
        applicability: Applicability,
        ctx: &EvaluationContext<'_>,
    ) -> Evaluated {
        resolve(applicability, || async {
            let Some(evaluator) = self.get(dimension) else {
                return Evaluated::from(CheckResult::fail(format!(
                    "no evaluator registered for {dimension}"
                )));
            };
            METRICS.inc_checks_evaluated();
            match evaluator.evaluate(ctx).await {
                Ok(result) => Evaluated::from(result),
                Err(err) => {
                    METRICS.inc_probe_failures();
                    debug!(
                        service = %ctx.service.qualified_name(),
                        %dimension,
                        error = %err,
                        "probe failed"
                    );
                    let warning = err.is_access_denied().then(|| PartialRunWarning {
                        dimension,
                        message: err.to_string(),
                    });
                    Evaluated {
                        result: CheckResult::fail(err.to_string()),
                        warning,
                    }
                }
            }
        })
        .await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::registry::ServiceType;
    use crate::rules::DimensionRules;

    pub fn service(service_type: ServiceType, domain: Option<&str>) -> ServiceDescriptor {
        ServiceDescriptor {
            organization: "acme".to_string(),
            name: "gateway".to_string(),
            repo: "acme/gateway".to_string(),
            tier: 1,
            service_type,
            domain: domain.map(str::to_string),
            active: true,
        }
    }

    pub fn rules() -> CompiledRules {
        DimensionRules::default().compile().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::registry::ServiceType;
    use fleet_audit_probes::fakes::{FakeRuntime, FakeSourceControl};
    use fleet_audit_probes::CheckStatus;

    #[test]
    fn test_standard_registry_covers_every_dimension() {
        let registry = EvaluatorRegistry::standard();
        for dim in Dimension::ALL {
            let evaluator = registry.get(dim).expect("registered");
            assert_eq!(evaluator.dimension(), dim);
        }
    }

    #[tokio::test]
    async fn test_denied_repo_becomes_fail_with_warning() {
        let service = service(ServiceType::Tool, None);
        let source = FakeSourceControl::new().deny("acme/gateway");
        let runtime = FakeRuntime::new();
        let rules = rules();
        let ctx = EvaluationContext {
            service: &service,
            source: &source,
            runtime: &runtime,
            rules: &rules,
            skip_runtime: false,
            default_branch: "main",
        };
        let out = EvaluatorRegistry::standard()
            .evaluate(Dimension::SourceControl, Applicability::Required, &ctx)
            .await;
        assert_eq!(out.result.status, CheckStatus::Fail);
        assert!(out.result.reason.unwrap().contains("access denied"));
        assert_eq!(out.warning.unwrap().dimension, Dimension::SourceControl);
    }

    #[tokio::test]
    async fn test_missing_evaluator_fails_check() {
        let service = service(ServiceType::Tool, None);
        let source = FakeSourceControl::new();
        let runtime = FakeRuntime::new();
        let rules = rules();
        let ctx = EvaluationContext {
            service: &service,
            source: &source,
            runtime: &runtime,
            rules: &rules,
            skip_runtime: false,
            default_branch: "main",
        };
        let out = EvaluatorRegistry::empty()
            .evaluate(Dimension::Routing, Applicability::Required, &ctx)
            .await;
        assert!(out.result.is_fail());
        assert!(out.result.reason.unwrap().contains("no evaluator"));
    }

    #[test]
    fn test_runtime_gate_prefers_skip_runtime() {
        let service = service(ServiceType::CloudflareWorker, None);
        let source = FakeSourceControl::new();
        let runtime = FakeRuntime::new();
        let rules = rules();
        let mut ctx = EvaluationContext {
            service: &service,
            source: &source,
            runtime: &runtime,
            rules: &rules,
            skip_runtime: true,
            default_branch: "main",
        };
        assert_eq!(
            ctx.runtime_gate().unwrap_err().reason.as_deref(),
            Some(RUNTIME_SKIPPED)
        );
        ctx.skip_runtime = false;
        assert_eq!(
            ctx.runtime_gate().unwrap_err().reason.as_deref(),
            Some(NO_DOMAIN)
        );
    }
}
