//! Check outcome vocabulary shared by probes and the audit engine.

use serde::{Deserialize, Serialize};

/// Status of a single (service, dimension) check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
    NotApplicable,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Skip => "skip",
            CheckStatus::NotApplicable => "not_applicable",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating one compliance dimension for one service.
///
/// `reason` is populated on `fail` and `skip`; `details` carries diagnostic
/// sub-findings; `score` is only set by dimensions that grant partial credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl CheckResult {
    fn with_status(status: CheckStatus, reason: Option<String>) -> Self {
        Self {
            status,
            reason,
            details: Vec::new(),
            score: None,
        }
    }

    pub fn pass() -> Self {
        Self::with_status(CheckStatus::Pass, None)
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self::with_status(CheckStatus::Fail, Some(reason.into()))
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Self::with_status(CheckStatus::Skip, Some(reason.into()))
    }

    pub fn not_applicable() -> Self {
        Self::with_status(CheckStatus::NotApplicable, None)
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn is_pass(&self) -> bool {
        self.status == CheckStatus::Pass
    }

    pub fn is_fail(&self) -> bool {
        self.status == CheckStatus::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&CheckStatus::NotApplicable).unwrap();
        assert_eq!(json, "\"not_applicable\"");
        let back: CheckStatus = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(back, CheckStatus::Skip);
    }

    #[test]
    fn test_pass_omits_empty_fields() {
        let v = serde_json::to_value(CheckResult::pass()).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["status"], "pass");
    }

    #[test]
    fn test_fail_carries_reason_and_score() {
        let r = CheckResult::fail("missing SECURITY.md")
            .with_details(vec!["SECURITY.md".to_string()])
            .with_score(0.5);
        assert!(r.is_fail());
        assert_eq!(r.reason.as_deref(), Some("missing SECURITY.md"));
        assert_eq!(r.score, Some(0.5));
        assert_eq!(r.details.len(), 1);
    }
}
