//! In-memory implementation of every store trait.
//!
//! Intended for embedding and tests. Objects are kept in ordered maps so
//! listings are deterministic.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Event;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    ClusterStore, ConstraintTemplateStore, DatacenterStore, EventStore, NodeInventory,
    PresetStore, ProjectStore, SshKeyStore, StoreResult,
};
use crate::crd::{
    Cluster, ConstraintTemplate, Preset, Project, ProviderKind, UserProjectBinding, UserSSHKey,
};
use crate::datacenter::{Datacenter, DatacenterCatalog};
use crate::error::StoreError;
use crate::version::KubernetesVersion;

#[derive(Default)]
struct MemoryState {
    projects: BTreeMap<String, Project>,
    bindings: Vec<UserProjectBinding>,
    datacenters: DatacenterCatalog,
    presets: BTreeMap<String, Preset>,
    clusters: BTreeMap<String, Cluster>,
    kubelets: BTreeMap<String, Vec<KubernetesVersion>>,
    ssh_keys: BTreeMap<String, UserSSHKey>,
    events: BTreeMap<String, Vec<Event>>,
    constraint_templates: BTreeMap<String, ConstraintTemplate>,
}

/// Write operations whose failure can be injected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOp {
    CreateCluster,
    UpdateCluster,
    DeleteCluster,
    UpdateSshKey,
}

impl WriteOp {
    const ALL: [WriteOp; 4] = [
        WriteOp::CreateCluster,
        WriteOp::UpdateCluster,
        WriteOp::DeleteCluster,
        WriteOp::UpdateSshKey,
    ];

    fn bit(self) -> u8 {
        match self {
            WriteOp::CreateCluster => 1,
            WriteOp::UpdateCluster => 1 << 1,
            WriteOp::DeleteCluster => 1 << 2,
            WriteOp::UpdateSshKey => 1 << 3,
        }
    }
}

/// Store backend holding everything in process memory.
#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
    failing: AtomicU8,
}

fn object_name(name: Option<&String>) -> String {
    name.cloned().unwrap_or_default()
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: Project) -> Self {
        let id = project.id().to_string();
        self.state.get_mut().projects.insert(id, project);
        self
    }

    pub fn with_binding(mut self, binding: UserProjectBinding) -> Self {
        self.state.get_mut().bindings.push(binding);
        self
    }

    pub fn with_datacenter(mut self, datacenter: Datacenter) -> Self {
        self.state.get_mut().datacenters.insert(datacenter);
        self
    }

    pub fn with_datacenters(mut self, catalog: DatacenterCatalog) -> Self {
        self.state.get_mut().datacenters = catalog;
        self
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        let name = object_name(preset.metadata.name.as_ref());
        self.state.get_mut().presets.insert(name, preset);
        self
    }

    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        let id = cluster.id().to_string();
        self.state.get_mut().clusters.insert(id, cluster);
        self
    }

    /// Register the kubelet versions a cluster's nodes report.
    pub fn with_kubelets(
        mut self,
        cluster_id: &str,
        versions: impl IntoIterator<Item = KubernetesVersion>,
    ) -> Self {
        self.state
            .get_mut()
            .kubelets
            .insert(cluster_id.to_string(), versions.into_iter().collect());
        self
    }

    pub fn with_ssh_key(mut self, key: UserSSHKey) -> Self {
        let id = key.id().to_string();
        self.state.get_mut().ssh_keys.insert(id, key);
        self
    }

    pub fn with_event(mut self, cluster_id: &str, event: Event) -> Self {
        self.state
            .get_mut()
            .events
            .entry(cluster_id.to_string())
            .or_default()
            .push(event);
        self
    }

    pub fn with_constraint_template(mut self, template: ConstraintTemplate) -> Self {
        let name = object_name(template.metadata.name.as_ref());
        self.state
            .get_mut()
            .constraint_templates
            .insert(name, template);
        self
    }

    /// Make every subsequent write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        for op in WriteOp::ALL {
            self.fail_on(op, fail);
        }
    }

    /// Make subsequent `op` writes fail, or succeed again.
    pub fn fail_on(&self, op: WriteOp, fail: bool) {
        if fail {
            self.failing.fetch_or(op.bit(), Ordering::SeqCst);
        } else {
            self.failing.fetch_and(!op.bit(), Ordering::SeqCst);
        }
    }

    fn check_writable(&self, op: WriteOp) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) & op.bit() != 0 {
            return Err(StoreError::Backend(format!(
                "memory backend rejected {:?}",
                op
            )));
        }
        Ok(())
    }

    pub async fn cluster_count(&self) -> usize {
        self.state.read().await.clusters.len()
    }

    pub async fn get_ssh_key(&self, key_id: &str) -> Option<UserSSHKey> {
        self.state.read().await.ssh_keys.get(key_id).cloned()
    }
}

#[async_trait]
impl ProjectStore for MemoryBackend {
    async fn get_project(&self, project_id: &str) -> StoreResult<Option<Project>> {
        Ok(self.state.read().await.projects.get(project_id).cloned())
    }

    async fn project_bindings(&self, project_id: &str) -> StoreResult<Vec<UserProjectBinding>> {
        Ok(self
            .state
            .read()
            .await
            .bindings
            .iter()
            .filter(|b| b.spec.project_id == project_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DatacenterStore for MemoryBackend {
    async fn get_datacenter(&self, name: &str) -> StoreResult<Option<Datacenter>> {
        Ok(self.state.read().await.datacenters.get(name).cloned())
    }
}

#[async_trait]
impl PresetStore for MemoryBackend {
    async fn get_preset(
        &self,
        _email: &str,
        _provider: ProviderKind,
        name: &str,
    ) -> StoreResult<Option<Preset>> {
        Ok(self.state.read().await.presets.get(name).cloned())
    }
}

#[async_trait]
impl ClusterStore for MemoryBackend {
    async fn get_cluster(&self, cluster_id: &str) -> StoreResult<Option<Cluster>> {
        Ok(self.state.read().await.clusters.get(cluster_id).cloned())
    }

    async fn list_clusters(&self, project_id: &str) -> StoreResult<Vec<Cluster>> {
        Ok(self
            .state
            .read()
            .await
            .clusters
            .values()
            .filter(|c| c.belongs_to(project_id))
            .cloned()
            .collect())
    }

    async fn create_cluster(&self, cluster: Cluster) -> StoreResult<Cluster> {
        self.check_writable(WriteOp::CreateCluster)?;
        let id = cluster.id().to_string();
        let mut state = self.state.write().await;
        if state.clusters.contains_key(&id) {
            return Err(StoreError::AlreadyExists {
                kind: "cluster",
                name: id,
            });
        }
        debug!(cluster = %id, "Storing cluster");
        state.clusters.insert(id, cluster.clone());
        Ok(cluster)
    }

    async fn update_cluster(&self, cluster: Cluster) -> StoreResult<Cluster> {
        self.check_writable(WriteOp::UpdateCluster)?;
        let id = cluster.id().to_string();
        let mut state = self.state.write().await;
        match state.clusters.get_mut(&id) {
            Some(existing) => {
                *existing = cluster.clone();
                Ok(cluster)
            }
            None => Err(StoreError::Missing {
                kind: "cluster",
                name: id,
            }),
        }
    }

    async fn delete_cluster(&self, cluster_id: &str) -> StoreResult<()> {
        self.check_writable(WriteOp::DeleteCluster)?;
        let mut state = self.state.write().await;
        match state.clusters.remove(cluster_id) {
            Some(_) => {
                state.kubelets.remove(cluster_id);
                Ok(())
            }
            None => Err(StoreError::Missing {
                kind: "cluster",
                name: cluster_id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl NodeInventory for MemoryBackend {
    async fn kubelet_versions(&self, cluster_id: &str) -> StoreResult<Vec<KubernetesVersion>> {
        Ok(self
            .state
            .read()
            .await
            .kubelets
            .get(cluster_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl SshKeyStore for MemoryBackend {
    async fn list_ssh_keys(&self, project_id: &str) -> StoreResult<Vec<UserSSHKey>> {
        Ok(self
            .state
            .read()
            .await
            .ssh_keys
            .values()
            .filter(|k| k.is_owned_by(project_id))
            .cloned()
            .collect())
    }

    async fn update_ssh_key(&self, key: UserSSHKey) -> StoreResult<UserSSHKey> {
        self.check_writable(WriteOp::UpdateSshKey)?;
        let id = key.id().to_string();
        let mut state = self.state.write().await;
        match state.ssh_keys.get_mut(&id) {
            Some(existing) => {
                *existing = key.clone();
                Ok(key)
            }
            None => Err(StoreError::Missing {
                kind: "ssh key",
                name: id,
            }),
        }
    }
}

#[async_trait]
impl EventStore for MemoryBackend {
    async fn cluster_events(&self, cluster_id: &str) -> StoreResult<Vec<Event>> {
        Ok(self
            .state
            .read()
            .await
            .events
            .get(cluster_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ConstraintTemplateStore for MemoryBackend {
    async fn list_constraint_templates(&self) -> StoreResult<Vec<ConstraintTemplate>> {
        Ok(self
            .state
            .read()
            .await
            .constraint_templates
            .values()
            .cloned()
            .collect())
    }

    async fn get_constraint_template(&self, name: &str) -> StoreResult<Option<ConstraintTemplate>> {
        Ok(self
            .state
            .read()
            .await
            .constraint_templates
            .get(name)
            .cloned())
    }
}
