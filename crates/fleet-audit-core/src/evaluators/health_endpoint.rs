//! Health endpoint on the service's public domain.

use async_trait::async_trait;
use fleet_audit_probes::{CheckResult, ProbeResult};

use super::{DimensionEvaluator, EvaluationContext};
use crate::dimension::Dimension;

pub struct HealthEndpointEvaluator;

#[async_trait]
impl DimensionEvaluator for HealthEndpointEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::HealthEndpoint
    }

    async fn evaluate(&self, ctx: &EvaluationContext<'_>) -> ProbeResult<CheckResult> {
        let domain = match ctx.runtime_gate() {
            Ok(domain) => domain,
            Err(skipped) => return Ok(skipped),
        };
        Ok(ctx.runtime.check_health(domain).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::test_support::{rules, service};
    use crate::evaluators::RUNTIME_SKIPPED;
    use crate::registry::ServiceType;
    use fleet_audit_probes::fakes::{FakeRuntime, FakeSourceControl};
    use fleet_audit_probes::CheckStatus;

    #[tokio::test]
    async fn test_skip_runtime_skips_health() {
        let service = service(ServiceType::CloudflareWorker, Some("api.acme.dev"));
        let source = FakeSourceControl::new();
        let runtime = FakeRuntime::new().with_health("api.acme.dev", CheckResult::pass());
        let rules = rules();
        let ctx = EvaluationContext {
            service: &service,
            source: &source,
            runtime: &runtime,
            rules: &rules,
            skip_runtime: true,
            default_branch: "main",
        };
        let result = HealthEndpointEvaluator.evaluate(&ctx).await.unwrap();
        assert_eq!(result.status, CheckStatus::Skip);
        assert_eq!(result.reason.as_deref(), Some(RUNTIME_SKIPPED));
        assert_eq!(runtime.calls(), 0);
    }

    #[tokio::test]
    async fn test_health_probed_on_domain() {
        let service = service(ServiceType::CloudflareWorker, Some("api.acme.dev"));
        let source = FakeSourceControl::new();
        let runtime = FakeRuntime::new().with_health("api.acme.dev", CheckResult::pass());
        let rules = rules();
        let ctx = EvaluationContext {
            service: &service,
            source: &source,
            runtime: &runtime,
            rules: &rules,
            skip_runtime: false,
            default_branch: "main",
        };
        assert!(HealthEndpointEvaluator.evaluate(&ctx).await.unwrap().is_pass());
    }
}
