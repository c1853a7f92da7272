//! UserSSHKey Custom Resource Definition.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An SSH public key owned by a project and assigned to some of its clusters.
#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kubermatic.k8s.io",
    version = "v1",
    kind = "UserSSHKey",
    plural = "usersshkeies",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct UserSSHKeySpec {
    /// Email of the user who uploaded the key.
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub public_key: String,
    /// Ids of the clusters this key is deployed to.
    #[serde(default)]
    pub clusters: Vec<String>,
}

impl UserSSHKey {
    /// Whether a project owner reference points at `project_id`.
    pub fn is_owned_by(&self, project_id: &str) -> bool {
        self.metadata
            .owner_references
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|owner| owner.kind == "Project" && owner.name == project_id)
    }

    /// Attach a cluster; returns false when it was already attached.
    pub fn add_to_cluster(&mut self, cluster_id: &str) -> bool {
        if self.is_used_by_cluster(cluster_id) {
            return false;
        }
        self.spec.clusters.push(cluster_id.to_string());
        true
    }

    /// Detach a cluster; returns false when it was not attached.
    pub fn remove_from_cluster(&mut self, cluster_id: &str) -> bool {
        let before = self.spec.clusters.len();
        self.spec.clusters.retain(|id| id != cluster_id);
        self.spec.clusters.len() != before
    }

    pub fn is_used_by_cluster(&self, cluster_id: &str) -> bool {
        self.spec.clusters.iter().any(|id| id == cluster_id)
    }

    pub fn id(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}
