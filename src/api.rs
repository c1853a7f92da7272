//! Request and response representations.
//!
//! Responses never carry provider credentials, the OIDC client secret or the
//! OpenShift pull secret.

use std::fmt;
use std::str::FromStr;

use k8s_openapi::api::core::v1::Event;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use serde::{Deserialize, Deserializer, Serialize};

use crate::crd::{Cluster, ClusterSettings, ClusterType, ExtendedClusterHealth};
use crate::error::{AdmissionError, Result};
use crate::version::{self, KubernetesVersion};

/// Body of a create request.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterRequest {
    pub cluster: NewCluster,
    /// Ids of project SSH keys to deploy to the new cluster.
    #[serde(default)]
    pub ssh_keys: Vec<String>,
}

impl CreateClusterRequest {
    /// Decode a request body; malformed bodies are invalid specs.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| AdmissionError::InvalidSpec(e.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCluster {
    #[serde(default, alias = "humanReadableName")]
    pub name: String,

    #[serde(default, rename = "type")]
    pub cluster_type: ClusterType,

    /// Name of a credential preset to resolve provider credentials from.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub credential: Option<String>,

    pub spec: ClusterSettings,
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|value| !value.trim().is_empty()))
}

/// The document a patch is applied to.
///
/// Holds unredacted settings; it is internal and never returned.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub(crate) struct PatchTarget {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub cluster_type: ClusterType,
    pub spec: ClusterSettings,
}

/// Cluster as returned to callers.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterView {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<Time>,
    #[serde(rename = "type")]
    pub cluster_type: ClusterType,
    pub spec: ClusterSettings,
    pub status: ClusterStatusView,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ClusterStatusView {
    #[serde(
        default,
        deserialize_with = "version::deserialize_optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<KubernetesVersion>,
    #[serde(default)]
    pub url: String,
}

impl From<&Cluster> for ClusterView {
    fn from(cluster: &Cluster) -> Self {
        ClusterView {
            id: cluster.id().to_string(),
            name: cluster.spec.human_readable_name.clone(),
            creation_timestamp: cluster.metadata.creation_timestamp.clone(),
            cluster_type: cluster.spec.cluster_type,
            spec: cluster.spec.settings.redacted(),
            status: ClusterStatusView {
                // Reported version follows the desired version.
                version: cluster.spec.settings.version.clone(),
                url: cluster
                    .status
                    .as_ref()
                    .map(|status| status.url.clone())
                    .unwrap_or_default(),
            },
        }
    }
}

/// Component health of a cluster.
pub type ClusterHealth = ExtendedClusterHealth;

/// Event type filter for event listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    Normal,
    Warning,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Normal => "Normal",
            EventType::Warning => "Warning",
        }
    }

    pub fn matches(&self, event_type: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(event_type)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = AdmissionError;

    fn from_str(s: &str) -> Result<Self> {
        if EventType::Normal.matches(s) {
            Ok(EventType::Normal)
        } else if EventType::Warning.matches(s) {
            Ok(EventType::Warning)
        } else {
            Err(AdmissionError::InvalidSpec(format!(
                "wrong query parameter, unsupported type: {}",
                s
            )))
        }
    }
}

/// Event as returned to callers.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<Time>,
    pub message: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub involved_object: InvolvedObjectView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<Time>,
    pub count: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct InvolvedObjectView {
    #[serde(rename = "type")]
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl From<&Event> for EventView {
    fn from(event: &Event) -> Self {
        EventView {
            name: event.metadata.name.clone().unwrap_or_default(),
            creation_timestamp: event.metadata.creation_timestamp.clone(),
            message: event.message.clone().unwrap_or_default(),
            event_type: event.type_.clone().unwrap_or_default(),
            involved_object: InvolvedObjectView {
                kind: event.involved_object.kind.clone().unwrap_or_default(),
                namespace: event.involved_object.namespace.clone().unwrap_or_default(),
                name: event.involved_object.name.clone().unwrap_or_default(),
            },
            last_timestamp: event.last_timestamp.clone(),
            count: event.count.unwrap_or(1),
        }
    }
}
