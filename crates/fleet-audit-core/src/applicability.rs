//! Applicability resolution shared by every evaluator invocation.
//!
//! - `not_applicable`: the evaluator never runs.
//! - `required`: the evaluator's result stands.
//! - `optional`: a `fail` is downgraded to `skip`; optional dimensions never
//!   count against compliance.

use std::future::Future;

use fleet_audit_probes::{CheckResult, CheckStatus};

use crate::dimension::Applicability;
use crate::report::PartialRunWarning;

pub const OPTIONAL_NOT_CONFIGURED: &str = "optional, not configured";

/// An evaluator's result plus any partial-run warning it raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub result: CheckResult,
    pub warning: Option<PartialRunWarning>,
}

impl From<CheckResult> for Evaluated {
    fn from(result: CheckResult) -> Self {
        Self {
            result,
            warning: None,
        }
    }
}

/// Apply `applicability` to an already computed result.
pub fn apply(applicability: Applicability, result: CheckResult) -> CheckResult {
    match applicability {
        Applicability::NotApplicable => CheckResult::not_applicable(),
        Applicability::Required => result,
        Applicability::Optional if result.status == CheckStatus::Fail => {
            let mut details = result.details;
            if let Some(reason) = result.reason {
                details.insert(0, reason);
            }
            CheckResult {
                status: CheckStatus::Skip,
                reason: Some(OPTIONAL_NOT_CONFIGURED.to_string()),
                details,
                score: result.score,
            }
        }
        Applicability::Optional => result,
    }
}

/// Run `evaluate` only when the dimension applies, then apply the
/// optional downgrade.
pub async fn resolve<F, Fut>(applicability: Applicability, evaluate: F) -> Evaluated
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Evaluated>,
{
    if !applicability.is_applicable() {
        return CheckResult::not_applicable().into();
    }
    let evaluated = evaluate().await;
    Evaluated {
        result: apply(applicability, evaluated.result),
        warning: evaluated.warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_optional_fail_downgraded_to_skip() {
        let result = apply(
            Applicability::Optional,
            CheckResult::fail("missing .github/fleet.yml"),
        );
        assert_eq!(result.status, CheckStatus::Skip);
        assert_eq!(result.reason.as_deref(), Some(OPTIONAL_NOT_CONFIGURED));
        assert_eq!(result.details, vec!["missing .github/fleet.yml".to_string()]);
    }

    #[test]
    fn test_optional_pass_and_skip_unchanged() {
        assert_eq!(
            apply(Applicability::Optional, CheckResult::pass()),
            CheckResult::pass()
        );
        let skipped = CheckResult::skip("runtime checks skipped");
        assert_eq!(apply(Applicability::Optional, skipped.clone()), skipped);
    }

    #[test]
    fn test_required_fail_stands() {
        let fail = CheckResult::fail("boom");
        assert_eq!(apply(Applicability::Required, fail.clone()), fail);
    }

    #[tokio::test]
    async fn test_not_applicable_never_evaluates() {
        let calls = AtomicUsize::new(0);
        let out = resolve(Applicability::NotApplicable, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Evaluated::from(CheckResult::fail("should not run"))
        })
        .await;
        assert_eq!(out.result.status, CheckStatus::NotApplicable);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_keeps_warning_on_downgrade() {
        let out = resolve(Applicability::Optional, || async {
            Evaluated {
                result: CheckResult::fail("access denied to repository acme/x"),
                warning: Some(PartialRunWarning {
                    dimension: crate::dimension::Dimension::Monitoring,
                    message: "access denied".to_string(),
                }),
            }
        })
        .await;
        assert_eq!(out.result.status, CheckStatus::Skip);
        assert!(out.warning.is_some());
    }
}
