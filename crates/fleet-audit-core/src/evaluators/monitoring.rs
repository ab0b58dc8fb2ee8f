//! Monitoring-agent integration.
//!
//! Any one signal passes: the monitoring package is a declared dependency,
//! a language-specific monitoring module exists, or (only when the
//! repository has no dependency manifest at all) a workflow references
//! monitoring.

use async_trait::async_trait;
use fleet_audit_probes::{CheckResult, DependencyPresence, ProbeResult};

use super::{DimensionEvaluator, EvaluationContext};
use crate::dimension::Dimension;
use crate::rules::DimensionRules;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitoringEvidence {
    pub dependency: DependencyPresence,
    /// First monitoring module file found, if any was looked for and found.
    pub module_file: Option<String>,
    /// `None` when the workflow signal was not consulted.
    pub workflow_reference: Option<bool>,
}

pub fn judge(rules: &DimensionRules, evidence: &MonitoringEvidence) -> CheckResult {
    if evidence.dependency.exists {
        return CheckResult::pass();
    }
    if evidence.module_file.is_some() {
        return CheckResult::pass();
    }
    if !evidence.dependency.has_manifest && evidence.workflow_reference == Some(true) {
        return CheckResult::pass();
    }

    let mut details = Vec::new();
    if evidence.dependency.has_manifest {
        details.push(format!("{} is not a declared dependency", rules.monitoring_package));
    } else {
        details.push("no dependency manifest".to_string());
    }
    details.push("no monitoring module file".to_string());
    if !evidence.dependency.has_manifest {
        details.push("no workflow references monitoring".to_string());
    }
    CheckResult::fail("monitoring agent not integrated").with_details(details)
}

pub struct MonitoringEvaluator;

impl MonitoringEvaluator {
    async fn collect(&self, ctx: &EvaluationContext<'_>) -> ProbeResult<MonitoringEvidence> {
        let rules = &ctx.rules.rules;
        let mut evidence = MonitoringEvidence {
            dependency: ctx
                .source
                .has_dependency(ctx.repo(), &rules.monitoring_package)
                .await?,
            ..MonitoringEvidence::default()
        };
        if evidence.dependency.exists {
            return Ok(evidence);
        }

        for path in &rules.monitoring_module_files {
            if ctx.source.file_exists(ctx.repo(), path).await? {
                evidence.module_file = Some(path.clone());
                return Ok(evidence);
            }
        }

        if !evidence.dependency.has_manifest {
            evidence.workflow_reference = Some(
                ctx.source
                    .has_workflow_matching(ctx.repo(), &ctx.rules.monitoring_workflows)
                    .await?,
            );
        }
        Ok(evidence)
    }
}

#[async_trait]
impl DimensionEvaluator for MonitoringEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::Monitoring
    }

    async fn evaluate(&self, ctx: &EvaluationContext<'_>) -> ProbeResult<CheckResult> {
        let evidence = self.collect(ctx).await?;
        Ok(judge(&ctx.rules.rules, &evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::test_support::{rules, service};
    use crate::registry::ServiceType;
    use fleet_audit_probes::fakes::{FakeRuntime, FakeSourceControl};

    #[test]
    fn test_dependency_passes() {
        let evidence = MonitoringEvidence {
            dependency: DependencyPresence {
                exists: true,
                has_manifest: true,
            },
            ..MonitoringEvidence::default()
        };
        assert!(judge(&DimensionRules::default(), &evidence).is_pass());
    }

    #[test]
    fn test_workflow_ignored_when_manifest_exists() {
        let evidence = MonitoringEvidence {
            dependency: DependencyPresence {
                exists: false,
                has_manifest: true,
            },
            module_file: None,
            workflow_reference: Some(true),
        };
        let result = judge(&DimensionRules::default(), &evidence);
        assert!(result.is_fail());
        assert!(result.details[0].contains("@fleet/monitor"));
    }

    #[test]
    fn test_workflow_counts_without_manifest() {
        let evidence = MonitoringEvidence {
            workflow_reference: Some(true),
            ..MonitoringEvidence::default()
        };
        assert!(judge(&DimensionRules::default(), &evidence).is_pass());
    }

    #[tokio::test]
    async fn test_module_file_short_circuits_workflow_scan() {
        let service = service(ServiceType::Tool, None);
        let source = FakeSourceControl::new().with_file("acme/gateway", "monitoring.py", "");
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
        let evidence = MonitoringEvaluator.collect(&ctx).await.unwrap();
        assert_eq!(evidence.module_file.as_deref(), Some("monitoring.py"));
        assert_eq!(evidence.workflow_reference, None);
    }
}
