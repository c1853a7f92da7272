//! Admission configuration.
//!
//! Everything here has a default, so an empty document (or no document at
//! all) yields a working configuration.

use std::collections::BTreeMap;
use std::env;
use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::authz::Operation;
use crate::crd::ProjectRole;
use crate::version::KubernetesVersion;

/// Environment variable naming the configuration file read by [`AdmissionConfig::from_env`].
pub const CONFIG_ENV_VAR: &str = "CLUSTER_ADMISSION_CONFIG";

/// Default maximum minor-version distance between control plane and kubelets.
pub const DEFAULT_MAX_MINOR_SKEW: u64 = 2;

/// Default length of generated cluster ids.
pub const DEFAULT_CLUSTER_ID_LENGTH: usize = 10;

// Simple-format UUIDs are 32 hex characters.
const MAX_CLUSTER_ID_LENGTH: usize = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse admission config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid admission config: {0}")]
    Invalid(String),
}

/// Tunables for admission decisions.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionConfig {
    /// Minimum project role per operation.
    pub minimum_roles: RoleTable,

    /// Maximum minor versions the control plane may run ahead of kubelets.
    pub max_minor_skew: u64,

    /// Versions accepted on create; empty accepts any valid version.
    pub supported_versions: Vec<KubernetesVersion>,

    pub cluster_id_length: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            minimum_roles: RoleTable::default(),
            max_minor_skew: DEFAULT_MAX_MINOR_SKEW,
            supported_versions: Vec::new(),
            cluster_id_length: DEFAULT_CLUSTER_ID_LENGTH,
        }
    }
}

impl AdmissionConfig {
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        Self::parse(input, "<inline>")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(?path, "Loading admission config");
        let contents = read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Load from the file named by `CLUSTER_ADMISSION_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => {
                debug!("{} not set, using default admission config", CONFIG_ENV_VAR);
                Ok(Self::default())
            }
        }
    }

    fn parse(input: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster_id_length == 0 || self.cluster_id_length > MAX_CLUSTER_ID_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "clusterIdLength must be between 1 and {}, got {}",
                MAX_CLUSTER_ID_LENGTH, self.cluster_id_length
            )));
        }
        Ok(())
    }

    pub fn is_supported(&self, version: &KubernetesVersion) -> bool {
        self.supported_versions.is_empty() || self.supported_versions.contains(version)
    }
}

/// Minimum role required per operation.
///
/// Partial tables are merged over the defaults when deserialized.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "BTreeMap<Operation, ProjectRole>", into = "BTreeMap<Operation, ProjectRole>")]
pub struct RoleTable {
    roles: BTreeMap<Operation, ProjectRole>,
}

impl RoleTable {
    pub fn required(&self, operation: Operation) -> ProjectRole {
        self.roles
            .get(&operation)
            .copied()
            .unwrap_or_else(|| default_role(operation))
    }

    pub fn with(mut self, operation: Operation, role: ProjectRole) -> Self {
        self.roles.insert(operation, role);
        self
    }
}

fn default_role(operation: Operation) -> ProjectRole {
    match operation {
        Operation::Create | Operation::Patch | Operation::Delete => ProjectRole::Editors,
        Operation::Get | Operation::List | Operation::Health | Operation::Events => {
            ProjectRole::Viewers
        }
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        Self {
            roles: Operation::ALL
                .iter()
                .map(|op| (*op, default_role(*op)))
                .collect(),
        }
    }
}

impl From<BTreeMap<Operation, ProjectRole>> for RoleTable {
    fn from(overrides: BTreeMap<Operation, ProjectRole>) -> Self {
        let mut table = Self::default();
        table.roles.extend(overrides);
        table
    }
}

impl From<RoleTable> for BTreeMap<Operation, ProjectRole> {
    fn from(table: RoleTable) -> Self {
        table.roles
    }
}
