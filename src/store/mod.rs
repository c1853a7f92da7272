//! Collaborator interfaces.
//!
//! The admission layer reads snapshots and persists admitted objects
//! through these traits. [`MemoryBackend`] implements all of them.

mod memory;

pub use memory::{MemoryBackend, WriteOp};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Event;

use crate::crd::{
    Cluster, ConstraintTemplate, Preset, Project, ProviderKind, UserProjectBinding, UserSSHKey,
};
use crate::datacenter::Datacenter;
use crate::error::StoreError;
use crate::version::KubernetesVersion;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get_project(&self, project_id: &str) -> StoreResult<Option<Project>>;

    /// Bindings of every user to `project_id`.
    async fn project_bindings(&self, project_id: &str) -> StoreResult<Vec<UserProjectBinding>>;
}

#[async_trait]
pub trait DatacenterStore: Send + Sync {
    async fn get_datacenter(&self, name: &str) -> StoreResult<Option<Datacenter>>;
}

#[async_trait]
pub trait PresetStore: Send + Sync {
    /// Look up a preset by name on behalf of a user.
    ///
    /// Implementations may pre-filter by `email` and `provider`; domain
    /// scoping and provider blocks are checked again during resolution.
    async fn get_preset(
        &self,
        email: &str,
        provider: ProviderKind,
        name: &str,
    ) -> StoreResult<Option<Preset>>;
}

#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get_cluster(&self, cluster_id: &str) -> StoreResult<Option<Cluster>>;

    /// Clusters labelled with `project_id`.
    async fn list_clusters(&self, project_id: &str) -> StoreResult<Vec<Cluster>>;

    async fn create_cluster(&self, cluster: Cluster) -> StoreResult<Cluster>;

    async fn update_cluster(&self, cluster: Cluster) -> StoreResult<Cluster>;

    async fn delete_cluster(&self, cluster_id: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait NodeInventory: Send + Sync {
    /// Kubelet versions reported by the cluster's nodes; empty for a fresh cluster.
    async fn kubelet_versions(&self, cluster_id: &str) -> StoreResult<Vec<KubernetesVersion>>;
}

#[async_trait]
pub trait SshKeyStore: Send + Sync {
    async fn list_ssh_keys(&self, project_id: &str) -> StoreResult<Vec<UserSSHKey>>;

    async fn update_ssh_key(&self, key: UserSSHKey) -> StoreResult<UserSSHKey>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events whose involved object is the cluster.
    async fn cluster_events(&self, cluster_id: &str) -> StoreResult<Vec<Event>>;
}

#[async_trait]
pub trait ConstraintTemplateStore: Send + Sync {
    async fn list_constraint_templates(&self) -> StoreResult<Vec<ConstraintTemplate>>;

    async fn get_constraint_template(&self, name: &str) -> StoreResult<Option<ConstraintTemplate>>;
}

/// Every collaborator the cluster service needs.
pub trait Backend:
    ProjectStore
    + DatacenterStore
    + PresetStore
    + ClusterStore
    + NodeInventory
    + SshKeyStore
    + EventStore
    + ConstraintTemplateStore
{
}

impl<T> Backend for T where
    T: ProjectStore
        + DatacenterStore
        + PresetStore
        + ClusterStore
        + NodeInventory
        + SshKeyStore
        + EventStore
        + ConstraintTemplateStore
{
}
