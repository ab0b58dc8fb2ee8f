//! Source-control integration: fleet config file plus a sync workflow.

use async_trait::async_trait;
use fleet_audit_probes::{CheckResult, ProbeResult};

use super::{DimensionEvaluator, EvaluationContext};
use crate::dimension::Dimension;
use crate::rules::DimensionRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceControlEvidence {
    pub config_file_present: bool,
    pub sync_workflow_present: bool,
}

pub fn judge(rules: &DimensionRules, evidence: &SourceControlEvidence) -> CheckResult {
    let mut missing = Vec::new();
    if !evidence.config_file_present {
        missing.push(format!("missing {}", rules.config_file));
    }
    if !evidence.sync_workflow_present {
        missing.push("missing sync workflow".to_string());
    }
    if missing.is_empty() {
        CheckResult::pass()
    } else {
        CheckResult::fail(missing.join("; ")).with_details(missing)
    }
}

pub struct SourceControlEvaluator;

#[async_trait]
impl DimensionEvaluator for SourceControlEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::SourceControl
    }

    async fn evaluate(&self, ctx: &EvaluationContext<'_>) -> ProbeResult<CheckResult> {
        let (config_file_present, sync_workflow_present) = tokio::try_join!(
            ctx.source
                .file_exists(ctx.repo(), &ctx.rules.rules.config_file),
            ctx.source
                .has_workflow_matching(ctx.repo(), &ctx.rules.sync_workflows),
        )?;
        Ok(judge(
            &ctx.rules.rules,
            &SourceControlEvidence {
                config_file_present,
                sync_workflow_present,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_present_passes() {
        let result = judge(
            &DimensionRules::default(),
            &SourceControlEvidence {
                config_file_present: true,
                sync_workflow_present: true,
            },
        );
        assert!(result.is_pass());
    }

    #[test]
    fn test_both_missing_concatenated() {
        let result = judge(
            &DimensionRules::default(),
            &SourceControlEvidence {
                config_file_present: false,
                sync_workflow_present: false,
            },
        );
        assert_eq!(
            result.reason.as_deref(),
            Some("missing .github/fleet.yml; missing sync workflow")
        );
        assert_eq!(result.details.len(), 2);
    }
}
