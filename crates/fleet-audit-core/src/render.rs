//! Report rendering.
//!
//! [`render`] is a pure function of the report and the check definitions:
//! identical input gives byte-identical JSON and Markdown, ordered by
//! organization, then service name, then dimension.

use std::path::Path;

use fleet_audit_probes::{CheckResult, CheckStatus};

use crate::checks::CheckDefinitions;
use crate::dimension::Dimension;
use crate::error::AuditResult;
use crate::report::{AuditReport, Classification, ServiceReport};

/// Both renderings of one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub json: String,
    pub markdown: String,
}

impl RenderedReport {
    pub fn write_json(&self, path: &Path) -> AuditResult<()> {
        std::fs::write(path, &self.json)?;
        Ok(())
    }

    pub fn write_markdown(&self, path: &Path) -> AuditResult<()> {
        std::fs::write(path, &self.markdown)?;
        Ok(())
    }
}

pub fn render(report: &AuditReport, definitions: &CheckDefinitions) -> AuditResult<RenderedReport> {
    Ok(RenderedReport {
        json: report.to_json_pretty()?,
        markdown: render_markdown(report, definitions),
    })
}

fn status_cell(check: Option<&CheckResult>) -> &'static str {
    match check.map(|c| c.status) {
        Some(CheckStatus::Pass) => "pass",
        Some(CheckStatus::Fail) => "**fail**",
        Some(CheckStatus::Skip) => "skip",
        Some(CheckStatus::NotApplicable) | None => "n/a",
    }
}

fn classification_label(classification: Classification) -> &'static str {
    match classification {
        Classification::FullPass => "full pass",
        Classification::Partial => "partial",
        Classification::Fail => "fail",
        Classification::Skipped => "skipped",
    }
}

/// Escape characters that would break a table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

pub fn render_markdown(report: &AuditReport, definitions: &CheckDefinitions) -> String {
    let summary = &report.summary;
    let mut out = String::new();
    out.push_str("# Fleet Compliance Audit\n\n");
    out.push_str(&format!(
        "- Generated: {}\n- Run: `{}`\n- Schema version: {}\n",
        report.timestamp.to_rfc3339(),
        report.run_id,
        report.schema_version
    ));
    if report.runtime_checks_skipped {
        out.push_str("- Runtime checks: skipped\n");
    }
    out.push('\n');

    out.push_str("## Summary\n\n");
    out.push_str("| Organizations | Services | Full pass | Partial | Fail | Skipped | Compliance |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    out.push_str(&format!(
        "| {} | {} | {} | {} | {} | {} | {}% |\n\n",
        summary.org_count,
        summary.total,
        summary.full_pass,
        summary.partial,
        summary.fail,
        summary.skipped,
        summary.compliance_rate
    ));

    out.push_str("## Dimensions\n\n");
    out.push_str("| Check | Pass | Fail | Skip | N/A |\n");
    out.push_str("|---|---|---|---|---|\n");
    for (dimension, stats) in &report.dimension_stats {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            cell(definitions.name(*dimension)),
            stats.pass,
            stats.fail,
            stats.skip,
            stats.not_applicable
        ));
    }
    out.push('\n');

    for (org, organization) in &report.organizations {
        out.push_str(&format!("## {org}\n\n"));
        out.push_str("| Service | Tier | Type | Result |");
        for dimension in Dimension::ALL {
            out.push_str(&format!(" {} |", cell(definitions.name(dimension))));
        }
        out.push('\n');
        out.push_str("|---|---|---|---|");
        for _ in Dimension::ALL {
            out.push_str("---|");
        }
        out.push('\n');
        for (name, service) in &organization.services {
            out.push_str(&format!(
                "| {} | {} | {} | {} |",
                cell(name),
                service.tier,
                service.service_type,
                classification_label(service.classification)
            ));
            for dimension in Dimension::ALL {
                out.push_str(&format!(" {} |", status_cell(service.checks.get(&dimension))));
            }
            out.push('\n');
        }
        out.push('\n');

        for (name, service) in &organization.services {
            render_findings(&mut out, org, name, service, definitions);
        }
    }
    out
}

fn render_findings(
    out: &mut String,
    org: &str,
    name: &str,
    service: &ServiceReport,
    definitions: &CheckDefinitions,
) {
    if service.classification == Classification::FullPass {
        return;
    }
    if service.skipped {
        out.push_str(&format!(
            "- `{org}/{name}` skipped: {}\n\n",
            service.skip_reason.as_deref().unwrap_or("skipped")
        ));
        return;
    }

    let failing: Vec<_> = service.failing_checks().collect();
    if failing.is_empty() && service.warnings.is_empty() {
        return;
    }
    out.push_str(&format!("### {org}/{name}\n\n"));
    for (dimension, check) in failing {
        out.push_str(&format!(
            "- **{}**: {}\n",
            definitions.name(dimension),
            check.reason.as_deref().unwrap_or("failed")
        ));
        for detail in &check.details {
            out.push_str(&format!("  - {detail}\n"));
        }
    }
    for warning in &service.warnings {
        out.push_str(&format!(
            "- warning ({}): {}\n",
            definitions.name(warning.dimension),
            warning.message
        ));
    }
    out.push('\n');
}
