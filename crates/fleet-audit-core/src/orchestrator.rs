//! Audit orchestration.
//!
//! [`AuditOrchestrator`] fans out across the selected services, evaluates
//! the seven dimensions of each against its compliance profile, and
//! assembles an [`AuditReport`]. Services run as independent tasks bounded
//! by a semaphore; the dimensions of one service run concurrently. The
//! report is keyed by organization and service name, so its order never
//! depends on completion order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use fleet_audit_probes::{RuntimeProbe, SourceControlProbe};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::config::AuditConfig;
use crate::dimension::Dimension;
use crate::error::{AuditResult, ConfigError};
use crate::evaluators::{EvaluationContext, EvaluatorRegistry};
use crate::metrics::METRICS;
use crate::obs;
use crate::registry::{ComplianceProfile, Registry, ServiceDescriptor};
use crate::report::{AuditReport, OrganizationReport, ServiceReport};
use crate::rules::CompiledRules;

/// Lifecycle of one run, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditPhase {
    Idle,
    Loading,
    Evaluating,
    Aggregating,
    Done,
}

/// Narrows which services a run visits. `None` means every value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub org: Option<String>,
    pub service: Option<String>,
}

impl AuditFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Build from CLI values; an org of `all` selects every organization.
    pub fn from_cli(org: Option<&str>, service: Option<&str>) -> Self {
        Self {
            org: org
                .filter(|o| !o.eq_ignore_ascii_case("all"))
                .map(str::to_string),
            service: service.map(str::to_string),
        }
    }

    pub fn matches(&self, service: &ServiceDescriptor) -> bool {
        self.org.as_deref().map_or(true, |o| o == service.organization)
            && self.service.as_deref().map_or(true, |s| s == service.name)
    }
}

/// Everything one service task needs, shared across tasks.
struct Shared {
    evaluators: Arc<EvaluatorRegistry>,
    source: Arc<dyn SourceControlProbe>,
    runtime: Arc<dyn RuntimeProbe>,
    rules: Arc<CompiledRules>,
    skip_runtime: bool,
    default_branch: String,
}

pub struct AuditOrchestrator {
    registry: Arc<Registry>,
    evaluators: Arc<EvaluatorRegistry>,
    source: Arc<dyn SourceControlProbe>,
    runtime: Arc<dyn RuntimeProbe>,
    rules: Arc<CompiledRules>,
    config: AuditConfig,
}

impl AuditOrchestrator {
    /// Validates the registry and config up front; nothing is probed when
    /// either is broken.
    pub fn new(
        registry: Registry,
        source: Arc<dyn SourceControlProbe>,
        runtime: Arc<dyn RuntimeProbe>,
        config: AuditConfig,
    ) -> Result<Self, ConfigError> {
        registry.validate()?;
        config.validate()?;
        let rules = config.rules.compile()?;
        Ok(Self {
            registry: Arc::new(registry),
            evaluators: Arc::new(EvaluatorRegistry::standard()),
            source,
            runtime,
            rules: Arc::new(rules),
            config,
        })
    }

    /// Replace the evaluator set.
    pub fn with_evaluators(mut self, evaluators: EvaluatorRegistry) -> Self {
        self.evaluators = Arc::new(evaluators);
        self
    }

    /// Run one audit pass over the services selected by `filter`.
    ///
    /// Probe failures never abort the run; they end up as failing checks.
    /// A service task that panics fails that service alone.
    pub async fn run(&self, filter: &AuditFilter) -> AuditResult<AuditReport> {
        let run_id = Uuid::new_v4();
        let span = obs::audit_span(&run_id.to_string());
        self.run_inner(run_id, filter).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, filter: &AuditFilter) -> AuditResult<AuditReport> {
        let started = Instant::now();
        let mut phase = AuditPhase::Idle;
        debug!(?phase, "audit run created");

        phase = AuditPhase::Loading;
        debug!(?phase, "selecting services");
        let selected = self.select(filter)?;
        if selected.is_empty() {
            warn!(org = ?filter.org, service = ?filter.service, "filter matched no services");
        }
        let org_count = selected
            .iter()
            .map(|(s, _)| s.organization.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        obs::emit_audit_started(
            &run_id.to_string(),
            org_count,
            selected.len(),
            self.config.skip_runtime,
        );

        phase = AuditPhase::Evaluating;
        debug!(?phase, services = selected.len(), "evaluating services");
        let shared = Arc::new(Shared {
            evaluators: Arc::clone(&self.evaluators),
            source: Arc::clone(&self.source),
            runtime: Arc::clone(&self.runtime),
            rules: Arc::clone(&self.rules),
            skip_runtime: self.config.skip_runtime,
            default_branch: self.config.probe.default_branch.clone(),
        });
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_services.max(1)));
        let mut join_set = JoinSet::new();
        let mut in_flight: HashMap<Id, (ServiceDescriptor, Option<ComplianceProfile>)> =
            HashMap::new();
        for (service, profile) in selected {
            let shared = Arc::clone(&shared);
            let semaphore = Arc::clone(&semaphore);
            let task_service = service.clone();
            let task_profile = profile.clone();
            let handle = join_set.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    audit_service(&shared, &task_service, task_profile.as_ref()).await
                }
                .in_current_span(),
            );
            in_flight.insert(handle.id(), (service, profile));
        }

        let mut organizations: BTreeMap<String, OrganizationReport> = BTreeMap::new();
        while let Some(joined) = join_set.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, report)) => (id, Ok(report)),
                Err(err) => (err.id(), Err(err)),
            };
            let Some((service, profile)) = in_flight.remove(&id) else {
                continue;
            };
            let report = match outcome {
                Ok(report) => report,
                Err(err) => {
                    let reason = task_failure_reason(err);
                    warn!(service = %service.qualified_name(), %reason, "service evaluation aborted");
                    match profile {
                        Some(profile) => ServiceReport::aborted(&service, &profile, &reason),
                        None => ServiceReport::inactive(&service),
                    }
                }
            };
            obs::emit_service_classified(
                &service.qualified_name(),
                report.classification.as_str(),
                report.warnings.len(),
            );
            organizations
                .entry(service.organization)
                .or_default()
                .services
                .insert(service.name, report);
        }

        phase = AuditPhase::Aggregating;
        debug!(?phase, "aggregating report");
        let report = AuditReport::assemble(
            self.registry.schema_version.clone(),
            run_id,
            self.config.skip_runtime,
            organizations,
        );

        phase = AuditPhase::Done;
        debug!(?phase, "audit run complete");
        obs::emit_audit_finished(
            &run_id.to_string(),
            started.elapsed().as_millis() as u64,
            report.summary.total,
            report.summary.compliance_rate,
        );
        METRICS.flush();
        Ok(report)
    }

    /// Services matching `filter`, each with its profile. Inactive services
    /// carry no profile since nothing is evaluated for them.
    fn select(
        &self,
        filter: &AuditFilter,
    ) -> Result<Vec<(ServiceDescriptor, Option<ComplianceProfile>)>, ConfigError> {
        self.registry
            .services()
            .filter(|s| filter.matches(s))
            .map(|service| {
                if !service.active {
                    return Ok((service.clone(), None));
                }
                let profile = self.registry.profile(service.service_type).ok_or_else(|| {
                    ConfigError::MissingProfile {
                        service_type: service.service_type.to_string(),
                        services: vec![service.qualified_name()],
                    }
                })?;
                Ok((service.clone(), Some(profile.clone())))
            })
            .collect()
    }
}

/// Reason recorded on every check of a service whose task died.
fn task_failure_reason(err: JoinError) -> String {
    if !err.is_panic() {
        return format!("service evaluation cancelled: {err}");
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("service evaluation panicked: {message}")
}

async fn audit_service(
    shared: &Shared,
    service: &ServiceDescriptor,
    profile: Option<&ComplianceProfile>,
) -> ServiceReport {
    let Some(profile) = profile else {
        debug!(service = %service.qualified_name(), "inactive service skipped");
        return ServiceReport::inactive(service);
    };

    let ctx = EvaluationContext {
        service,
        source: shared.source.as_ref(),
        runtime: shared.runtime.as_ref(),
        rules: shared.rules.as_ref(),
        skip_runtime: shared.skip_runtime,
        default_branch: &shared.default_branch,
    };
    let evaluators = shared.evaluators.as_ref();
    let ctx = &ctx;
    let outcomes = join_all(Dimension::ALL.into_iter().map(|dimension| async move {
        let evaluated = evaluators
            .evaluate(dimension, profile.get(dimension), ctx)
            .await;
        (dimension, evaluated)
    }))
    .await;

    let mut checks = BTreeMap::new();
    let mut warnings = Vec::new();
    for (dimension, evaluated) in outcomes {
        checks.insert(dimension, evaluated.result);
        warnings.extend(evaluated.warning);
    }
    METRICS.inc_services_audited();
    ServiceReport::audited(service, checks, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServiceType;

    fn descriptor(org: &str, name: &str) -> ServiceDescriptor {
        ServiceDescriptor {
            organization: org.to_string(),
            name: name.to_string(),
            repo: format!("{org}/{name}"),
            tier: 2,
            service_type: ServiceType::Library,
            domain: None,
            active: true,
        }
    }

    #[test]
    fn test_filter_all_org_selects_everything() {
        let filter = AuditFilter::from_cli(Some("all"), None);
        assert_eq!(filter, AuditFilter::all());
        assert!(filter.matches(&descriptor("acme", "api")));
        assert!(filter.matches(&descriptor("labs", "tool")));
    }

    #[test]
    fn test_filter_org_and_service() {
        let filter = AuditFilter::from_cli(Some("acme"), Some("api"));
        assert!(filter.matches(&descriptor("acme", "api")));
        assert!(!filter.matches(&descriptor("acme", "web")));
        assert!(!filter.matches(&descriptor("labs", "api")));
    }
}
