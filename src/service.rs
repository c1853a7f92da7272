//! Cluster service.
//!
//! The operation surface exposed to the transport layer. Each operation
//! gathers snapshots from the backend, asks [`ClusterAdmission`] for a
//! decision and persists only what was admitted.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::admission::{ClusterAdmission, ProjectAccess};
use crate::api::{ClusterHealth, ClusterView, CreateClusterRequest, EventType, EventView};
use crate::authz::{Operation, Principal};
use crate::config::{AdmissionConfig, ConfigError};
use crate::crd::{
    Cluster, ClusterStatus, ConstraintTemplate, PROJECT_ID_LABEL, Project, UserProjectBinding,
    UserSSHKey,
};
use crate::error::{AdmissionError, Result};
use crate::metrics::Metrics;
use crate::store::Backend;

/// Cluster operations guarded by admission.
pub struct ClusterService<B> {
    backend: Arc<B>,
    admission: ClusterAdmission,
    metrics: Arc<Metrics>,
}

/// Project snapshot used for authorization.
struct ProjectSnapshot {
    project: Project,
    bindings: Vec<UserProjectBinding>,
}

impl ProjectSnapshot {
    fn access<'a>(&'a self, principal: &'a Principal) -> ProjectAccess<'a> {
        ProjectAccess {
            principal,
            project: &self.project,
            bindings: &self.bindings,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum KeyChange {
    Attach,
    Detach,
}

impl KeyChange {
    /// Returns false when the key already has the desired state.
    fn apply(self, key: &mut UserSSHKey, cluster_id: &str) -> bool {
        match self {
            KeyChange::Attach => key.add_to_cluster(cluster_id),
            KeyChange::Detach => key.remove_from_cluster(cluster_id),
        }
    }

    fn reverse(self) -> Self {
        match self {
            KeyChange::Attach => KeyChange::Detach,
            KeyChange::Detach => KeyChange::Attach,
        }
    }
}

impl<B: Backend> ClusterService<B> {
    /// Build a service; `config` is validated first.
    pub fn new(
        backend: Arc<B>,
        config: AdmissionConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            backend,
            admission: ClusterAdmission::new(config),
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Share an existing metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Create a cluster in `project_id`.
    pub async fn create_cluster(
        &self,
        principal: &Principal,
        project_id: &str,
        request: CreateClusterRequest,
    ) -> Result<ClusterView> {
        self.observe(Operation::Create, project_id, None, async {
            let snapshot = self.project_snapshot(project_id).await?;
            let settings = &request.cluster.spec;
            let datacenter = self
                .backend
                .get_datacenter(&settings.cloud.datacenter_name)
                .await?;
            let preset = match request.cluster.credential.as_deref() {
                Some(name) => {
                    self.backend
                        .get_preset(&principal.email, settings.cloud.provider.kind(), name)
                        .await?
                }
                None => None,
            };

            let CreateClusterRequest { cluster, ssh_keys } = request;
            let admitted = self.admission.admit_create(
                snapshot.access(principal),
                cluster,
                datacenter,
                preset.as_ref(),
            )?;

            // Requested keys must exist before anything is persisted.
            let project_keys = self.backend.list_ssh_keys(project_id).await?;
            let mut keys = Vec::with_capacity(ssh_keys.len());
            for key_id in &ssh_keys {
                let key = project_keys
                    .iter()
                    .find(|k| k.id() == key_id)
                    .cloned()
                    .ok_or_else(|| AdmissionError::not_found("ssh key", key_id))?;
                keys.push(key);
            }

            let id = self.generate_cluster_id();
            let mut spec = admitted.into_inner();
            if spec.human_readable_name.trim().is_empty() {
                spec.human_readable_name = id.clone();
            }
            let cluster = Cluster {
                metadata: ObjectMeta {
                    name: Some(id.clone()),
                    labels: Some(BTreeMap::from([(
                        PROJECT_ID_LABEL.to_string(),
                        project_id.to_string(),
                    )])),
                    creation_timestamp: Some(Time(jiff::Timestamp::now())),
                    ..Default::default()
                },
                spec,
                status: Some(ClusterStatus::default()),
            };
            let created = self.backend.create_cluster(cluster).await?;

            if let Err(error) = self.update_ssh_keys(keys, &id, KeyChange::Attach).await {
                if let Err(cleanup) = self.backend.delete_cluster(&id).await {
                    warn!(
                        cluster = %id,
                        error = %cleanup,
                        "Failed to remove partially created cluster"
                    );
                }
                return Err(error);
            }

            info!(project = %project_id, cluster = %id, "Cluster created");
            Ok(ClusterView::from(&created))
        })
        .await
    }

    /// Apply a merge patch or JSON patch to a cluster.
    pub async fn patch_cluster(
        &self,
        principal: &Principal,
        project_id: &str,
        cluster_id: &str,
        patch: &[u8],
    ) -> Result<ClusterView> {
        self.observe(Operation::Patch, project_id, Some(cluster_id), async {
            let snapshot = self.project_snapshot(project_id).await?;
            let authorized = self.admission.authorize_patch(snapshot.access(principal))?;
            let current = self
                .backend
                .get_cluster(cluster_id)
                .await?
                .filter(|c| c.belongs_to(project_id));
            let Some(current) = current else {
                return Err(authorized.reject(AdmissionError::not_found("cluster", cluster_id)));
            };

            let candidate = self.admission.prepare_patch(authorized, &current, patch)?;
            let datacenter = self
                .backend
                .get_datacenter(&current.spec.settings.cloud.datacenter_name)
                .await?;
            let kubelets = if candidate.version_changed() {
                self.backend.kubelet_versions(cluster_id).await?
            } else {
                Vec::new()
            };

            let admitted = self
                .admission
                .admit_patch(candidate, datacenter.as_ref(), &kubelets)?;

            let mut updated = current;
            updated.spec = admitted.into_inner();
            let stored = self.backend.update_cluster(updated).await?;
            info!(project = %project_id, cluster = %cluster_id, "Cluster patched");
            Ok(ClusterView::from(&stored))
        })
        .await
    }

    /// Delete a cluster and detach it from the project's SSH keys.
    pub async fn delete_cluster(
        &self,
        principal: &Principal,
        project_id: &str,
        cluster_id: &str,
    ) -> Result<()> {
        self.observe(Operation::Delete, project_id, Some(cluster_id), async {
            let snapshot = self.project_snapshot(project_id).await?;
            self.admission
                .admit_access(snapshot.access(principal), Operation::Delete)?;
            let cluster = self.project_cluster(project_id, cluster_id).await?;

            let keys = self.backend.list_ssh_keys(project_id).await?;
            let detached = self
                .update_ssh_keys(keys, cluster.id(), KeyChange::Detach)
                .await?;
            if let Err(error) = self.backend.delete_cluster(cluster.id()).await {
                let reattached = self
                    .update_ssh_keys(detached, cluster.id(), KeyChange::Attach)
                    .await;
                if let Err(revert) = reattached {
                    warn!(cluster = %cluster_id, error = %revert, "Failed to re-attach SSH keys");
                }
                return Err(error.into());
            }
            info!(project = %project_id, cluster = %cluster_id, "Cluster deleted");
            Ok(())
        })
        .await
    }

    pub async fn get_cluster(
        &self,
        principal: &Principal,
        project_id: &str,
        cluster_id: &str,
    ) -> Result<ClusterView> {
        self.observe(Operation::Get, project_id, Some(cluster_id), async {
            let snapshot = self.project_snapshot(project_id).await?;
            self.admission
                .admit_access(snapshot.access(principal), Operation::Get)?;
            let cluster = self.project_cluster(project_id, cluster_id).await?;
            Ok(ClusterView::from(&cluster))
        })
        .await
    }

    /// Clusters of a project, ordered by id.
    pub async fn list_clusters(
        &self,
        principal: &Principal,
        project_id: &str,
    ) -> Result<Vec<ClusterView>> {
        self.observe(Operation::List, project_id, None, async {
            let snapshot = self.project_snapshot(project_id).await?;
            self.admission
                .admit_access(snapshot.access(principal), Operation::List)?;
            let mut views: Vec<ClusterView> = self
                .backend
                .list_clusters(project_id)
                .await?
                .iter()
                .filter(|c| c.belongs_to(project_id))
                .map(ClusterView::from)
                .collect();
            views.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(views)
        })
        .await
    }

    pub async fn get_cluster_health(
        &self,
        principal: &Principal,
        project_id: &str,
        cluster_id: &str,
    ) -> Result<ClusterHealth> {
        self.observe(Operation::Health, project_id, Some(cluster_id), async {
            let snapshot = self.project_snapshot(project_id).await?;
            self.admission
                .admit_access(snapshot.access(principal), Operation::Health)?;
            let cluster = self.project_cluster(project_id, cluster_id).await?;
            Ok(cluster
                .status
                .map(|status| status.extended_health)
                .unwrap_or_default())
        })
        .await
    }

    /// Events involving a cluster, optionally restricted to one type.
    pub async fn list_cluster_events(
        &self,
        principal: &Principal,
        project_id: &str,
        cluster_id: &str,
        event_type: Option<EventType>,
    ) -> Result<Vec<EventView>> {
        self.observe(Operation::Events, project_id, Some(cluster_id), async {
            let snapshot = self.project_snapshot(project_id).await?;
            self.admission
                .admit_access(snapshot.access(principal), Operation::Events)?;
            let cluster = self.project_cluster(project_id, cluster_id).await?;
            let events = self.backend.cluster_events(cluster.id()).await?;
            Ok(events
                .iter()
                .filter(|event| match event_type {
                    Some(filter) => filter.matches(event.type_.as_deref().unwrap_or_default()),
                    None => true,
                })
                .map(EventView::from)
                .collect())
        })
        .await
    }

    /// All constraint templates; readable by any authenticated user.
    pub async fn list_constraint_templates(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ConstraintTemplate>> {
        debug!(user = %principal.email, "Listing constraint templates");
        Ok(self.backend.list_constraint_templates().await?)
    }

    pub async fn get_constraint_template(
        &self,
        principal: &Principal,
        name: &str,
    ) -> Result<ConstraintTemplate> {
        if name.trim().is_empty() {
            return Err(AdmissionError::InvalidSpec(
                "the constraint template name cannot be empty".to_string(),
            ));
        }
        debug!(user = %principal.email, template = %name, "Getting constraint template");
        self.backend
            .get_constraint_template(name)
            .await?
            .ok_or_else(|| AdmissionError::not_found("constraint template", name))
    }

    /// Attach or detach `cluster_id` on each key that needs it.
    ///
    /// Returns the keys that were written. When a write fails, the keys
    /// already written are changed back before the error is returned.
    async fn update_ssh_keys(
        &self,
        keys: Vec<UserSSHKey>,
        cluster_id: &str,
        change: KeyChange,
    ) -> Result<Vec<UserSSHKey>> {
        let mut written: Vec<UserSSHKey> = Vec::new();
        for mut key in keys {
            if !change.apply(&mut key, cluster_id) {
                continue;
            }
            debug!(key = %key.id(), cluster = %cluster_id, ?change, "Updating SSH key");
            match self.backend.update_ssh_key(key).await {
                Ok(stored) => written.push(stored),
                Err(error) => {
                    for mut key in written {
                        change.reverse().apply(&mut key, cluster_id);
                        if let Err(revert) = self.backend.update_ssh_key(key).await {
                            warn!(
                                cluster = %cluster_id,
                                error = %revert,
                                "Failed to revert SSH key"
                            );
                        }
                    }
                    return Err(error.into());
                }
            }
        }
        Ok(written)
    }

    async fn project_snapshot(&self, project_id: &str) -> Result<ProjectSnapshot> {
        let project = self
            .backend
            .get_project(project_id)
            .await?
            .ok_or_else(|| AdmissionError::not_found("project", project_id))?;
        let bindings = self.backend.project_bindings(project_id).await?;
        Ok(ProjectSnapshot { project, bindings })
    }

    /// A cluster that exists and belongs to the project.
    async fn project_cluster(&self, project_id: &str, cluster_id: &str) -> Result<Cluster> {
        self.backend
            .get_cluster(cluster_id)
            .await?
            .filter(|c| c.belongs_to(project_id))
            .ok_or_else(|| AdmissionError::not_found("cluster", cluster_id))
    }

    fn generate_cluster_id(&self) -> String {
        Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(self.admission.config().cluster_id_length)
            .collect()
    }

    /// Run an operation, recording its outcome and latency.
    async fn observe<T, F>(
        &self,
        operation: Operation,
        project_id: &str,
        cluster_id: Option<&str>,
        fut: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let result = fut.await;
        let elapsed = start.elapsed().as_secs_f64();
        match &result {
            Ok(_) => self.metrics.record_admitted(operation, elapsed),
            Err(error) => {
                warn!(
                    operation = %operation,
                    project = %project_id,
                    cluster = cluster_id.unwrap_or_default(),
                    kind = %error.kind(),
                    error = %error,
                    "Request rejected"
                );
                self.metrics.record_rejected(operation, error, elapsed);
            }
        }
        result
    }
}
