//! Canonical governance files plus branch protection.
//!
//! Each canonical file is worth one point and branch protection is worth one
//! more, split by [`ProtectionWeights`]. Only missing files fail the check;
//! protection only moves the `score`.

use async_trait::async_trait;
use fleet_audit_probes::{BranchProtection, CheckResult, ProbeError, ProbeResult};
use tracing::debug;

use super::{DimensionEvaluator, EvaluationContext};
use crate::dimension::Dimension;
use crate::rules::{DimensionRules, ProtectionWeights};

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFilesEvidence {
    pub present: Vec<String>,
    pub missing: Vec<String>,
    /// `Err` carries a display string when protection could not be read.
    pub protection: Result<BranchProtection, String>,
}

impl Default for CanonicalFilesEvidence {
    fn default() -> Self {
        Self {
            present: Vec::new(),
            missing: Vec::new(),
            protection: Ok(BranchProtection::default()),
        }
    }
}

/// Protection points in `[0, 1]`.
pub fn protection_points(weights: &ProtectionWeights, protection: &BranchProtection) -> f64 {
    if !protection.enabled {
        return 0.0;
    }
    let mut points = weights.enabled;
    if protection.required_reviews {
        points += weights.required_reviews;
    }
    if protection.no_force_push {
        points += weights.no_force_push;
    }
    points
}

pub fn judge(rules: &DimensionRules, evidence: &CanonicalFilesEvidence) -> CheckResult {
    let file_points = evidence.present.len() as f64;
    let max_points = (rules.canonical_files.len() + 1) as f64;

    let mut details = Vec::new();
    let protection_points = match &evidence.protection {
        Ok(protection) => {
            if !protection.enabled {
                details.push("branch protection disabled".to_string());
            } else {
                if !protection.required_reviews {
                    details.push("required reviews not enforced".to_string());
                }
                if !protection.no_force_push {
                    details.push("force push allowed".to_string());
                }
            }
            protection_points(&rules.protection_weights, protection)
        }
        Err(detail) => {
            details.push(format!("branch protection unavailable: {detail}"));
            0.0
        }
    };
    let score = (file_points + protection_points) / max_points;

    let result = if evidence.missing.is_empty() {
        CheckResult::pass()
    } else {
        details.splice(
            0..0,
            evidence.missing.iter().map(|file| format!("missing {file}")),
        );
        CheckResult::fail(format!(
            "missing canonical files: {}",
            evidence.missing.join(", ")
        ))
    };
    result.with_details(details).with_score(score)
}

pub struct CanonicalFilesEvaluator;

#[async_trait]
impl DimensionEvaluator for CanonicalFilesEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::CanonicalFiles
    }

    async fn evaluate(&self, ctx: &EvaluationContext<'_>) -> ProbeResult<CheckResult> {
        let rules = &ctx.rules.rules;
        let mut evidence = CanonicalFilesEvidence::default();
        for file in &rules.canonical_files {
            if ctx.source.file_exists(ctx.repo(), file).await? {
                evidence.present.push(file.clone());
            } else {
                evidence.missing.push(file.clone());
            }
        }

        evidence.protection = match ctx
            .source
            .get_branch_protection(ctx.repo(), ctx.default_branch)
            .await
        {
            Ok(protection) => Ok(protection),
            Err(err @ ProbeError::AccessDenied { .. }) => return Err(err),
            Err(err) => {
                debug!(repo = ctx.repo(), error = %err, "branch protection lookup failed");
                Err(err.to_string())
            }
        };

        Ok(judge(rules, &evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(missing: &[&str], protection: BranchProtection) -> CanonicalFilesEvidence {
        let rules = DimensionRules::default();
        let (missing, present): (Vec<String>, Vec<String>) = rules
            .canonical_files
            .iter()
            .cloned()
            .partition(|f| missing.contains(&f.as_str()));
        CanonicalFilesEvidence {
            present,
            missing,
            protection: Ok(protection),
        }
    }

    #[test]
    fn test_missing_file_fails_with_exact_name() {
        let result = judge(
            &DimensionRules::default(),
            &evidence(&["SECURITY.md"], BranchProtection::default()),
        );
        assert!(result.is_fail());
        assert_eq!(
            result.reason.as_deref(),
            Some("missing canonical files: SECURITY.md")
        );
        assert_eq!(result.details[0], "missing SECURITY.md");
    }

    #[test]
    fn test_missing_files_listed_in_reason_order() {
        let rules = DimensionRules::default();
        let missing: Vec<&str> = rules.canonical_files.iter().take(2).map(String::as_str).collect();
        let result = judge(&rules, &evidence(&missing, BranchProtection::default()));
        assert_eq!(
            result.reason.as_deref(),
            Some(format!("missing canonical files: {}", missing.join(", ")).as_str())
        );
        assert_eq!(result.details[0], format!("missing {}", missing[0]));
        assert_eq!(result.details[1], format!("missing {}", missing[1]));
        assert_eq!(result.details[2], "branch protection disabled");
    }

    #[test]
    fn test_protection_only_moves_score() {
        let rules = DimensionRules::default();
        let unprotected = judge(&rules, &evidence(&[], BranchProtection::default()));
        assert!(unprotected.is_pass());
        assert_eq!(unprotected.score, Some(0.75));

        let full = judge(
            &rules,
            &evidence(
                &[],
                BranchProtection {
                    enabled: true,
                    required_reviews: true,
                    no_force_push: true,
                },
            ),
        );
        assert!(full.is_pass());
        assert_eq!(full.score, Some(1.0));
        assert!(full.details.is_empty());
    }

    #[test]
    fn test_partial_protection_points() {
        let weights = ProtectionWeights::default();
        let points = protection_points(
            &weights,
            &BranchProtection {
                enabled: true,
                required_reviews: true,
                no_force_push: false,
            },
        );
        assert_eq!(points, 0.75);
    }

    #[test]
    fn test_unreadable_protection_is_a_detail() {
        let mut ev = evidence(&[], BranchProtection::default());
        ev.protection = Err("GitHub returned 500".to_string());
        let result = judge(&DimensionRules::default(), &ev);
        assert!(result.is_pass());
        assert!(result.details[0].starts_with("branch protection unavailable"));
    }
}
