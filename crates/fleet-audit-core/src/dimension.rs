//! Compliance dimension vocabulary.

use serde::{Deserialize, Serialize};

/// One of the seven independent compliance axes.
///
/// Declaration order is the canonical ordering used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    SourceControl,
    Monitoring,
    CanonicalFiles,
    RegistryHeartbeat,
    Routing,
    TrustChain,
    HealthEndpoint,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::SourceControl,
        Dimension::Monitoring,
        Dimension::CanonicalFiles,
        Dimension::RegistryHeartbeat,
        Dimension::Routing,
        Dimension::TrustChain,
        Dimension::HealthEndpoint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::SourceControl => "source_control",
            Dimension::Monitoring => "monitoring",
            Dimension::CanonicalFiles => "canonical_files",
            Dimension::RegistryHeartbeat => "registry_heartbeat",
            Dimension::Routing => "routing",
            Dimension::TrustChain => "trust_chain",
            Dimension::HealthEndpoint => "health_endpoint",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a dimension applies to a service type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Applicability {
    Required,
    Optional,
    NotApplicable,
}

impl Applicability {
    pub fn is_applicable(&self) -> bool {
        !matches!(self, Applicability::NotApplicable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_as_str_matches_serde_name() {
        for dim in Dimension::ALL {
            let json = serde_json::to_string(&dim).unwrap();
            assert_eq!(json, format!("\"{}\"", dim.as_str()));
        }
    }

    #[test]
    fn test_dimension_as_map_key_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert(Dimension::TrustChain, Applicability::Optional);
        map.insert(Dimension::SourceControl, Applicability::Required);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"source_control":"required","trust_chain":"optional"}"#);
        let back: BTreeMap<Dimension, Applicability> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_unknown_dimension_rejected() {
        let res: Result<Dimension, _> = serde_json::from_str("\"uptime\"");
        assert!(res.is_err());
    }

    #[test]
    fn test_not_applicable_is_not_applicable() {
        assert!(!Applicability::NotApplicable.is_applicable());
        assert!(Applicability::Optional.is_applicable());
        assert!(Applicability::Required.is_applicable());
    }
}
