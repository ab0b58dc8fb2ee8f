//! Registry heartbeat: a deploy workflow that reports to the service
//! registry, plus a live registry lookup unless runtime checks are off.

use async_trait::async_trait;
use fleet_audit_probes::{CheckResult, ProbeResult};

use super::{DimensionEvaluator, EvaluationContext};
use crate::dimension::Dimension;

pub const MISSING_WORKFLOW: &str = "no deploy workflow references the service registry";

#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatEvidence {
    pub workflow_present: bool,
    /// `None` when the live probe was not run.
    pub live: Option<CheckResult>,
}

pub fn judge(evidence: &HeartbeatEvidence) -> CheckResult {
    if !evidence.workflow_present {
        return CheckResult::fail(MISSING_WORKFLOW);
    }
    match &evidence.live {
        Some(live) if !live.is_pass() => {
            let reason = live
                .reason
                .clone()
                .unwrap_or_else(|| "registry probe failed".to_string());
            CheckResult::fail(format!("registry heartbeat: {reason}"))
                .with_details(live.details.clone())
        }
        _ => CheckResult::pass(),
    }
}

pub struct RegistryHeartbeatEvaluator;

#[async_trait]
impl DimensionEvaluator for RegistryHeartbeatEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::RegistryHeartbeat
    }

    async fn evaluate(&self, ctx: &EvaluationContext<'_>) -> ProbeResult<CheckResult> {
        let workflow_present = ctx
            .source
            .has_workflow_matching(ctx.repo(), &ctx.rules.registry_workflows)
            .await?;
        let live = if workflow_present && !ctx.skip_runtime {
            Some(ctx.runtime.check_registry(&ctx.service.name).await)
        } else {
            None
        };
        Ok(judge(&HeartbeatEvidence {
            workflow_present,
            live,
        }))
    }
}
