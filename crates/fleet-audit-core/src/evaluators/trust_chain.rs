//! Trust-chain provisioning declared in the fleet config file.

use async_trait::async_trait;
use fleet_audit_probes::{CheckResult, ProbeResult};

use super::{DimensionEvaluator, EvaluationContext};
use crate::dimension::Dimension;
use crate::rules::DimensionRules;

/// Keywords are matched literally, case-sensitive.
pub fn judge(rules: &DimensionRules, config: Option<&str>) -> CheckResult {
    let Some(content) = config else {
        return CheckResult::fail(format!("missing {}", rules.config_file));
    };

    let mut missing: Vec<String> = rules
        .trust_chain_keywords
        .iter()
        .filter(|keyword| !content.contains(keyword.as_str()))
        .map(|keyword| format!("keyword `{keyword}`"))
        .collect();
    if !content.contains(rules.auth_provider.as_str()) {
        missing.push(format!("auth provider `{}`", rules.auth_provider));
    }

    if missing.is_empty() {
        CheckResult::pass()
    } else {
        CheckResult::fail(format!(
            "{} does not declare {}",
            rules.config_file,
            missing.join(", ")
        ))
        .with_details(missing)
    }
}

pub struct TrustChainEvaluator;

#[async_trait]
impl DimensionEvaluator for TrustChainEvaluator {
    fn dimension(&self) -> Dimension {
        Dimension::TrustChain
    }

    async fn evaluate(&self, ctx: &EvaluationContext<'_>) -> ProbeResult<CheckResult> {
        let rules = &ctx.rules.rules;
        let content = ctx
            .source
            .get_file_content(ctx.repo(), &rules.config_file)
            .await?;
        Ok(judge(rules, content.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVISIONED: &str = "\
trust_chain:
  provider: fleet-auth
  oidc_issuer: https://auth.acme.dev
  audience: gateway
  token_exchange: true
";

    #[test]
    fn test_fully_provisioned_passes() {
        assert!(judge(&DimensionRules::default(), Some(PROVISIONED)).is_pass());
    }

    #[test]
    fn test_enumerates_missing_keywords_and_provider() {
        let result = judge(
            &DimensionRules::default(),
            Some("trust_chain:\n  audience: gateway\n"),
        );
        assert!(result.is_fail());
        assert_eq!(
            result.details,
            vec![
                "keyword `oidc_issuer`".to_string(),
                "keyword `token_exchange`".to_string(),
                "auth provider `fleet-auth`".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_config_file_fails() {
        let result = judge(&DimensionRules::default(), None);
        assert_eq!(result.reason.as_deref(), Some("missing .github/fleet.yml"));
    }
}
