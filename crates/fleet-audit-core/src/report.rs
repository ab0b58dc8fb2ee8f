//! Audit report model.
//!
//! Pure data: built once per run, serialized losslessly, and read back by
//! the remediation step. Maps are ordered so output never depends on the
//! order in which services finished.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use fleet_audit_probes::{CheckResult, CheckStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dimension::Dimension;
use crate::error::AuditResult;
use crate::registry::{ComplianceProfile, ServiceDescriptor, ServiceType};

pub const INACTIVE_REASON: &str = "inactive/archived";

/// Aggregate per-service outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    FullPass,
    Partial,
    Fail,
    Skipped,
}

impl Classification {
    /// Derive the classification from a service's check results.
    ///
    /// Only `pass`/`fail` results count: full pass needs at least one of
    /// them and no failures, fail means none of them passed.
    pub fn from_checks<'a>(checks: impl IntoIterator<Item = &'a CheckResult>) -> Self {
        let mut evaluated = 0usize;
        let mut passed = 0usize;
        for check in checks {
            match check.status {
                CheckStatus::Pass => {
                    evaluated += 1;
                    passed += 1;
                }
                CheckStatus::Fail => evaluated += 1,
                CheckStatus::Skip | CheckStatus::NotApplicable => {}
            }
        }
        if evaluated > 0 && passed == evaluated {
            Classification::FullPass
        } else if passed == 0 {
            Classification::Fail
        } else {
            Classification::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::FullPass => "full_pass",
            Classification::Partial => "partial",
            Classification::Fail => "fail",
            Classification::Skipped => "skipped",
        }
    }

    pub fn needs_remediation(&self) -> bool {
        matches!(self, Classification::Partial | Classification::Fail)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service that could only be partly evaluated (e.g. repository access
/// denied). Recorded on the service; never fails the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialRunWarning {
    pub dimension: Dimension,
    pub message: String,
}

/// One service's entry in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceReport {
    pub repo: String,
    pub tier: u32,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub active: bool,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub classification: Classification,
    #[serde(default)]
    pub checks: BTreeMap<Dimension, CheckResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PartialRunWarning>,
}

impl ServiceReport {
    /// Entry for an inactive service: skipped, no checks.
    pub fn inactive(service: &ServiceDescriptor) -> Self {
        Self {
            skipped: true,
            skip_reason: Some(INACTIVE_REASON.to_string()),
            classification: Classification::Skipped,
            ..Self::audited(service, BTreeMap::new(), Vec::new())
        }
    }

    /// Entry for an evaluated service; classification is derived.
    pub fn audited(
        service: &ServiceDescriptor,
        checks: BTreeMap<Dimension, CheckResult>,
        warnings: Vec<PartialRunWarning>,
    ) -> Self {
        Self {
            repo: service.repo.clone(),
            tier: service.tier,
            service_type: service.service_type,
            domain: service.domain.clone(),
            active: service.active,
            skipped: false,
            skip_reason: None,
            classification: Classification::from_checks(checks.values()),
            checks,
            warnings,
        }
    }

    /// Entry for a service whose evaluation died before producing results:
    /// every applicable dimension fails with `reason`, each with a warning.
    pub fn aborted(service: &ServiceDescriptor, profile: &ComplianceProfile, reason: &str) -> Self {
        let mut checks = BTreeMap::new();
        let mut warnings = Vec::new();
        for dimension in Dimension::ALL {
            if profile.get(dimension).is_applicable() {
                checks.insert(dimension, CheckResult::fail(reason));
                warnings.push(PartialRunWarning {
                    dimension,
                    message: reason.to_string(),
                });
            } else {
                checks.insert(dimension, CheckResult::not_applicable());
            }
        }
        Self::audited(service, checks, warnings)
    }

    /// Checks that ended in `fail`, in dimension order.
    pub fn failing_checks(&self) -> impl Iterator<Item = (Dimension, &CheckResult)> {
        self.checks
            .iter()
            .filter(|(_, c)| c.is_fail())
            .map(|(d, c)| (*d, c))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationReport {
    pub services: BTreeMap<String, ServiceReport>,
}

/// Run-level counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub total: usize,
    pub full_pass: usize,
    pub partial: usize,
    pub fail: usize,
    pub skipped: usize,
    pub org_count: usize,
    /// Percentage of non-skipped services that fully pass.
    pub compliance_rate: u32,
}

impl AuditSummary {
    pub fn from_organizations(organizations: &BTreeMap<String, OrganizationReport>) -> Self {
        let mut summary = AuditSummary {
            org_count: organizations.len(),
            ..AuditSummary::default()
        };
        for service in organizations.values().flat_map(|o| o.services.values()) {
            summary.total += 1;
            match service.classification {
                Classification::FullPass => summary.full_pass += 1,
                Classification::Partial => summary.partial += 1,
                Classification::Fail => summary.fail += 1,
                Classification::Skipped => summary.skipped += 1,
            }
        }
        summary.compliance_rate = compliance_rate(summary.full_pass, summary.total, summary.skipped);
        summary
    }
}

/// `round(100 * full_pass / (total - skipped))`, 0 when nothing was audited.
pub fn compliance_rate(full_pass: usize, total: usize, skipped: usize) -> u32 {
    let audited = total.saturating_sub(skipped);
    if audited == 0 {
        return 0;
    }
    (100.0 * full_pass as f64 / audited as f64).round() as u32
}

/// Per-dimension status counts across the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionStats {
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
    pub not_applicable: usize,
}

pub fn dimension_stats(
    organizations: &BTreeMap<String, OrganizationReport>,
) -> BTreeMap<Dimension, DimensionStats> {
    let mut stats: BTreeMap<Dimension, DimensionStats> = Dimension::ALL
        .iter()
        .map(|d| (*d, DimensionStats::default()))
        .collect();
    for service in organizations.values().flat_map(|o| o.services.values()) {
        for (dimension, check) in &service.checks {
            let entry = stats.entry(*dimension).or_default();
            match check.status {
                CheckStatus::Pass => entry.pass += 1,
                CheckStatus::Fail => entry.fail += 1,
                CheckStatus::Skip => entry.skip += 1,
                CheckStatus::NotApplicable => entry.not_applicable += 1,
            }
        }
    }
    stats
}

/// Root aggregate of one audit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub timestamp: DateTime<Utc>,
    /// Copied from the registry so the report is self-describing.
    pub schema_version: String,
    pub run_id: Uuid,
    pub runtime_checks_skipped: bool,
    pub organizations: BTreeMap<String, OrganizationReport>,
    pub summary: AuditSummary,
    pub dimension_stats: BTreeMap<Dimension, DimensionStats>,
}

impl AuditReport {
    /// Assemble a report; summary and stats are derived from `organizations`.
    pub fn assemble(
        schema_version: impl Into<String>,
        run_id: Uuid,
        runtime_checks_skipped: bool,
        organizations: BTreeMap<String, OrganizationReport>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            schema_version: schema_version.into(),
            run_id,
            runtime_checks_skipped,
            summary: AuditSummary::from_organizations(&organizations),
            dimension_stats: dimension_stats(&organizations),
            organizations,
        }
    }

    /// All services as `(org, name, entry)`, ordered by org then name.
    pub fn services(&self) -> impl Iterator<Item = (&str, &str, &ServiceReport)> {
        self.organizations.iter().flat_map(|(org, o)| {
            o.services
                .iter()
                .map(move |(name, s)| (org.as_str(), name.as_str(), s))
        })
    }

    pub fn from_json(raw: &str) -> AuditResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> AuditResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn to_json_pretty(&self) -> AuditResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> AuditResult<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}
