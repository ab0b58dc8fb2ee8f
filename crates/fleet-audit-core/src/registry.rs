//! Registry store: organizations, services and compliance profiles.
//!
//! The registry is loaded once per run and never mutated. [`Registry::load`]
//! validates it before returning; an invalid registry is a fatal
//! [`ConfigError`], never a partially audited fleet.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::dimension::{Applicability, Dimension};
use crate::error::ConfigError;

const REQUIRED_KEYS: [&str; 2] = ["compliance_profiles", "organizations"];

/// Kind of service; selects the compliance profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    CloudflareWorker,
    NpmPackage,
    Tool,
    Documentation,
    ClientSdk,
    McpServer,
    WebApp,
    Library,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::CloudflareWorker => "cloudflare-worker",
            ServiceType::NpmPackage => "npm-package",
            ServiceType::Tool => "tool",
            ServiceType::Documentation => "documentation",
            ServiceType::ClientSdk => "client-sdk",
            ServiceType::McpServer => "mcp-server",
            ServiceType::WebApp => "web-app",
            ServiceType::Library => "library",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dimension -> applicability mapping for one service type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplianceProfile(BTreeMap<Dimension, Applicability>);

impl ComplianceProfile {
    pub fn new(entries: impl IntoIterator<Item = (Dimension, Applicability)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Applicability of `dimension`; validated profiles define all of them.
    pub fn get(&self, dimension: Dimension) -> Applicability {
        self.0
            .get(&dimension)
            .copied()
            .unwrap_or(Applicability::NotApplicable)
    }

    fn missing(&self) -> Vec<String> {
        Dimension::ALL
            .iter()
            .filter(|d| !self.0.contains_key(d))
            .map(|d| d.to_string())
            .collect()
    }
}

/// A registered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub organization: String,
    pub name: String,
    /// `owner/name` coordinate of the source repository.
    pub repo: String,
    /// Lower is more critical.
    pub tier: u32,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub domain: Option<String>,
    /// Inactive services stay registered but are never scored.
    pub active: bool,
}

impl ServiceDescriptor {
    /// `org/name` label used in logs and errors.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.organization, self.name)
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default = "default_schema_version", deserialize_with = "version_string")]
    schema_version: String,
    compliance_profiles: BTreeMap<ServiceType, ComplianceProfile>,
    organizations: BTreeMap<String, OrganizationEntry>,
}

#[derive(Debug, Deserialize)]
struct OrganizationEntry {
    #[serde(default)]
    services: BTreeMap<String, ServiceEntry>,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    repo: String,
    tier: u32,
    #[serde(rename = "type")]
    service_type: ServiceType,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_active() -> bool {
    true
}

fn version_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "schema_version must be a string or number, got {other:?}"
        ))),
    }
}

fn is_repo_coordinate(repo: &str) -> bool {
    let mut parts = repo.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) => {
            !owner.is_empty()
                && !name.is_empty()
                && !repo.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

/// Validated, read-only service inventory.
#[derive(Debug, Clone)]
pub struct Registry {
    pub schema_version: String,
    profiles: BTreeMap<ServiceType, ComplianceProfile>,
    organizations: BTreeMap<String, BTreeMap<String, ServiceDescriptor>>,
}

impl Registry {
    /// Load and validate a registry file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::RegistryLoad {
            path: origin.clone(),
            detail: e.to_string(),
        })?;
        Self::parse(&raw, &origin)
    }

    /// Parse and validate registry YAML (or JSON) from a string.
    pub fn parse(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let load_err = |detail: String| ConfigError::RegistryLoad {
            path: origin.to_string(),
            detail,
        };

        let value: serde_yaml::Value =
            serde_yaml::from_str(raw).map_err(|e| load_err(e.to_string()))?;
        let mapping = value
            .as_mapping()
            .ok_or_else(|| load_err("top level is not a mapping".to_string()))?;
        for key in REQUIRED_KEYS {
            if !mapping.contains_key(key) {
                return Err(ConfigError::MissingKey {
                    path: origin.to_string(),
                    key,
                });
            }
        }

        let file: RegistryFile =
            serde_yaml::from_value(value).map_err(|e| load_err(e.to_string()))?;

        let organizations = file
            .organizations
            .into_iter()
            .map(|(org, entry)| {
                let services = entry
                    .services
                    .into_iter()
                    .map(|(name, s)| {
                        let descriptor = ServiceDescriptor {
                            organization: org.clone(),
                            name: name.clone(),
                            repo: s.repo,
                            tier: s.tier,
                            service_type: s.service_type,
                            domain: s.domain.filter(|d| !d.trim().is_empty()),
                            active: s.active,
                        };
                        (name, descriptor)
                    })
                    .collect();
                (org, services)
            })
            .collect();

        let registry = Registry {
            schema_version: file.schema_version,
            profiles: file.compliance_profiles,
            organizations,
        };
        registry.validate()?;
        debug!(
            origin,
            organizations = registry.organizations.len(),
            services = registry.service_count(),
            "registry loaded"
        );
        Ok(registry)
    }

    /// Check the registry invariants: well-formed and unique repositories,
    /// a profile for every service type in use, and complete profiles.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut owners: HashMap<String, String> = HashMap::new();
        for service in self.services() {
            if !is_repo_coordinate(&service.repo) {
                return Err(ConfigError::InvalidRepository {
                    org: service.organization.clone(),
                    service: service.name.clone(),
                    repo: service.repo.clone(),
                });
            }
            let key = service.repo.to_ascii_lowercase();
            if let Some(first) = owners.get(&key) {
                return Err(ConfigError::DuplicateRepository {
                    repo: service.repo.clone(),
                    first: first.clone(),
                    second: service.qualified_name(),
                });
            }
            owners.insert(key, service.qualified_name());
        }

        let mut unmapped: BTreeMap<ServiceType, Vec<String>> = BTreeMap::new();
        for service in self.services() {
            if !self.profiles.contains_key(&service.service_type) {
                unmapped
                    .entry(service.service_type)
                    .or_default()
                    .push(service.qualified_name());
            }
        }
        if let Some((service_type, services)) = unmapped.into_iter().next() {
            return Err(ConfigError::MissingProfile {
                service_type: service_type.to_string(),
                services,
            });
        }

        for (service_type, profile) in &self.profiles {
            let missing = profile.missing();
            if !missing.is_empty() {
                return Err(ConfigError::IncompleteProfile {
                    service_type: service_type.to_string(),
                    missing,
                });
            }
        }
        Ok(())
    }

    pub fn profile(&self, service_type: ServiceType) -> Option<&ComplianceProfile> {
        self.profiles.get(&service_type)
    }

    /// All services ordered by organization, then name.
    pub fn services(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.organizations.values().flat_map(|services| services.values())
    }

    pub fn service_count(&self) -> usize {
        self.organizations.values().map(BTreeMap::len).sum()
    }
}
