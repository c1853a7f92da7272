//! Datacenter policy.
//!
//! Datacenters are static configuration: which providers they serve, which
//! email domains may see them and whether audit logging is mandatory.
//! A datacenter hidden from a user is indistinguishable from one that does
//! not exist.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crd::{AuditLoggingSettings, ClusterSettings, ProviderKind};
use crate::error::{AdmissionError, Result};

/// Static configuration of a single datacenter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Datacenter {
    pub name: String,

    /// Providers served by this datacenter; empty means any.
    #[serde(default)]
    pub providers: Vec<ProviderKind>,

    /// Legacy single-domain restriction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_email_domain: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_email_domains: Vec<String>,

    #[serde(default)]
    pub enforce_audit_logging: bool,
}

impl Datacenter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Union of the legacy and set-form domain restrictions.
    pub fn restricted_domains(&self) -> impl Iterator<Item = &str> {
        self.required_email_domain
            .iter()
            .map(String::as_str)
            .chain(self.required_email_domains.iter().map(String::as_str))
            .map(str::trim)
            .filter(|domain| !domain.is_empty())
    }

    /// Whether a user with `email` may see this datacenter.
    pub fn is_visible(&self, email: &str) -> bool {
        let mut domains = self.restricted_domains().peekable();
        if domains.peek().is_none() {
            return true;
        }
        let Some(user_domain) = email_domain(email) else {
            return false;
        };
        domains.any(|domain| domain.eq_ignore_ascii_case(user_domain))
    }

    pub fn supports(&self, provider: ProviderKind) -> bool {
        self.providers.is_empty() || self.providers.contains(&provider)
    }

    /// Reject providers this datacenter does not serve.
    pub fn check_provider(&self, provider: ProviderKind) -> Result<()> {
        if self.supports(provider) {
            return Ok(());
        }
        Err(AdmissionError::PolicyViolation(format!(
            "datacenter {:?} does not support the {} provider",
            self.name, provider
        )))
    }

    /// Apply datacenter-mandated defaults to cluster settings.
    ///
    /// With enforced audit logging an omitted toggle becomes `enabled: true`
    /// and an explicit `enabled: false` is rejected.
    pub fn apply_defaults(&self, settings: &mut ClusterSettings) -> Result<()> {
        if !self.enforce_audit_logging {
            return Ok(());
        }
        match &settings.audit_logging {
            Some(audit) if !audit.enabled => Err(AdmissionError::PolicyViolation(format!(
                "datacenter {:?} enforces audit logging, it cannot be disabled",
                self.name
            ))),
            Some(_) => Ok(()),
            None => {
                debug!(datacenter = %self.name, "Enforcing audit logging");
                settings.audit_logging = Some(AuditLoggingSettings { enabled: true });
                Ok(())
            }
        }
    }
}

/// Domain part after the last `@`, if any.
pub fn email_domain(email: &str) -> Option<&str> {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim())
        .filter(|domain| !domain.is_empty())
}

/// Look up a datacenter the user is allowed to see.
///
/// Hidden datacenters are reported exactly like missing ones.
pub fn resolve(datacenter: Option<Datacenter>, name: &str, email: &str) -> Result<Datacenter> {
    match datacenter {
        Some(dc) if dc.is_visible(email) => Ok(dc),
        Some(_) => {
            debug!(datacenter = %name, email = %email, "Datacenter hidden by email domain restriction");
            Err(AdmissionError::not_found("datacenter", name))
        }
        None => Err(AdmissionError::not_found("datacenter", name)),
    }
}

/// Datacenter snapshot keyed by name, loadable from JSON configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct DatacenterCatalog {
    datacenters: BTreeMap<String, Datacenter>,
}

impl DatacenterCatalog {
    pub fn new(datacenters: impl IntoIterator<Item = Datacenter>) -> Self {
        Self {
            datacenters: datacenters
                .into_iter()
                .map(|dc| (dc.name.clone(), dc))
                .collect(),
        }
    }

    /// Parse a JSON array of datacenters.
    pub fn from_json(input: &str) -> std::result::Result<Self, serde_json::Error> {
        let datacenters: Vec<Datacenter> = serde_json::from_str(input)?;
        Ok(Self::new(datacenters))
    }

    pub fn get(&self, name: &str) -> Option<&Datacenter> {
        self.datacenters.get(name)
    }

    pub fn insert(&mut self, datacenter: Datacenter) {
        self.datacenters.insert(datacenter.name.clone(), datacenter);
    }

    pub fn len(&self) -> usize {
        self.datacenters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datacenters.is_empty()
    }
}
