//! Routing: the service's public domain answers through the edge router.

use async_trait::async_trait;
use fleet_audit_probes::{CheckResult, ProbeResult};

use super::{DimensionEvaluator, EvaluationContext};
use crate::dimension::Dimension;

pub struct RoutingEvaluator;

#[async_trait]
impl DimensionEvaluator for RoutingEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::Routing
    }

    async fn evaluate(&self, ctx: &EvaluationContext<'_>) -> ProbeResult<CheckResult> {
        let domain = match ctx.runtime_gate() {
            Ok(domain) => domain,
            Err(skipped) => return Ok(skipped),
        };
        Ok(ctx.runtime.check_router(domain).await)
    }
}
