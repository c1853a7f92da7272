//! Test fixtures and builder patterns for admission tests.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Event, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};

use cluster_admission::crd::{
    Cluster, ClusterSettings, ClusterSpec, ClusterStatus, ClusterType, CloudProvider, CloudSpec,
    ExtendedClusterHealth, FakeCloudSpec, FakePreset, OidcSettings, OpenstackCloudSpec,
    PROJECT_ID_LABEL, Preset, PresetSpec, Project, ProjectPhase, ProjectSpec, ProjectStatus,
    UserProjectBinding, UserProjectBindingSpec, UserSSHKey, UserSSHKeySpec,
};
use cluster_admission::{Datacenter, KubernetesVersion, MemoryBackend, Principal};

pub const PROJECT_ID: &str = "my-first-project-ID";
pub const CLUSTER_URL: &str = "https://w225mx4z66.asia-east1-a-1.cloud.kubermatic.io:31885";

/// 2013-02-03T19:54:00Z
pub fn creation_time() -> Time {
    Time(jiff::Timestamp::from_second(1_359_921_240).unwrap())
}

pub fn bob() -> Principal {
    Principal::new("1233", "Bob", "bob@acme.com")
}

pub fn john() -> Principal {
    Principal::new("4567", "John", "john@acme.com")
}

pub fn admin_john() -> Principal {
    john().admin()
}

/// A project in the given phase.
pub fn project(id: &str, phase: ProjectPhase) -> Project {
    let mut project = Project::new(
        id,
        ProjectSpec {
            name: "my-first-project".to_string(),
        },
    );
    project.status = Some(ProjectStatus { phase });
    project
}

/// Binding of `email` to `project_id` with a `<role>-<project>` group.
pub fn binding(email: &str, project_id: &str, role: &str) -> UserProjectBinding {
    UserProjectBinding::new(
        &format!("{}-{}", role, email),
        UserProjectBindingSpec {
            user_email: email.to_string(),
            project_id: project_id.to_string(),
            group: format!("{}-{}", role, project_id),
        },
    )
}

/// Datacenters used across tests.
pub fn datacenters() -> Vec<Datacenter> {
    vec![
        Datacenter::new("fake-dc"),
        Datacenter {
            required_email_domain: Some("example.com".to_string()),
            ..Datacenter::new("restricted-fake-dc")
        },
        Datacenter {
            required_email_domains: vec!["23f67weuc.com".to_string(), "example.com".to_string()],
            ..Datacenter::new("restricted-fake-dc2")
        },
        Datacenter {
            enforce_audit_logging: true,
            ..Datacenter::new("audited-dc")
        },
    ]
}

pub fn fake_preset() -> Preset {
    Preset::new(
        "fake",
        PresetSpec {
            fake: Some(FakePreset {
                token: "dummy_pluton_token".to_string(),
            }),
            ..Default::default()
        },
    )
}

/// Active default project, Bob as owner, every datacenter and the fake preset.
pub fn default_backend() -> MemoryBackend {
    let mut backend = MemoryBackend::new()
        .with_project(project(PROJECT_ID, ProjectPhase::Active))
        .with_binding(binding("bob@acme.com", PROJECT_ID, "owners"))
        .with_preset(fake_preset());
    for dc in datacenters() {
        backend = backend.with_datacenter(dc);
    }
    backend
}

/// Builder for creating Cluster test fixtures.
#[derive(Clone, Debug)]
pub struct ClusterBuilder {
    id: String,
    name: String,
    project_id: String,
    cluster_type: ClusterType,
    datacenter: String,
    provider: CloudProvider,
    version: KubernetesVersion,
    url: String,
    health: ExtendedClusterHealth,
}

impl ClusterBuilder {
    /// A fake-provider cluster in the default project running 9.9.9.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            project_id: PROJECT_ID.to_string(),
            cluster_type: ClusterType::Kubernetes,
            datacenter: "fake-dc".to_string(),
            provider: CloudProvider::Fake(FakeCloudSpec {
                token: "SecretToken".to_string(),
            }),
            version: KubernetesVersion::new(9, 9, 9),
            url: CLUSTER_URL.to_string(),
            health: ExtendedClusterHealth::default(),
        }
    }

    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = datacenter.into();
        self
    }

    pub fn version(mut self, version: KubernetesVersion) -> Self {
        self.version = version;
        self
    }

    /// Use an OpenStack provider with credentials and topology set.
    pub fn openstack(mut self) -> Self {
        self.datacenter = "OpenstackDatacenter".to_string();
        self.provider = CloudProvider::Openstack(OpenstackCloudSpec {
            username: "username".to_string(),
            password: "password".to_string(),
            floating_ip_pool: "floatingIPPool".to_string(),
            tenant: "tenant".to_string(),
            domain: "domain".to_string(),
            network: "network".to_string(),
            security_groups: "securityGroups".to_string(),
            router_id: "routerID".to_string(),
            subnet_id: "subnetID".to_string(),
        });
        self
    }

    pub fn health(mut self, health: ExtendedClusterHealth) -> Self {
        self.health = health;
        self
    }

    pub fn build(self) -> Cluster {
        let version = self.version;
        Cluster {
            metadata: ObjectMeta {
                name: Some(self.id),
                labels: Some(BTreeMap::from([(
                    PROJECT_ID_LABEL.to_string(),
                    self.project_id,
                )])),
                creation_timestamp: Some(creation_time()),
                ..Default::default()
            },
            spec: ClusterSpec {
                human_readable_name: self.name,
                cluster_type: self.cluster_type,
                settings: ClusterSettings {
                    cloud: CloudSpec::new(self.datacenter, self.provider),
                    version: Some(version.clone()),
                    openshift: None,
                    audit_logging: None,
                    oidc: OidcSettings::default(),
                },
            },
            status: Some(ClusterStatus {
                version: Some(version),
                url: self.url,
                extended_health: self.health,
            }),
        }
    }
}

/// An SSH key owned by `project_id` and attached to `clusters`.
pub fn ssh_key(id: &str, project_id: &str, clusters: &[&str]) -> UserSSHKey {
    let mut key = UserSSHKey::new(
        id,
        UserSSHKeySpec {
            owner: "bob@acme.com".to_string(),
            name: id.to_string(),
            fingerprint: String::new(),
            public_key: String::new(),
            clusters: clusters.iter().map(|c| c.to_string()).collect(),
        },
    );
    key.metadata.owner_references = Some(vec![OwnerReference {
        api_version: "kubermatic.k8s.io/v1".to_string(),
        kind: "Project".to_string(),
        name: project_id.to_string(),
        uid: String::new(),
        ..Default::default()
    }]);
    key
}

/// A cluster event of the given type.
pub fn event(name: &str, event_type: &str, message: &str) -> Event {
    Event {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("kube-system".to_string()),
            creation_timestamp: Some(creation_time()),
            ..Default::default()
        },
        involved_object: ObjectReference {
            kind: Some("Cluster".to_string()),
            namespace: Some("kube-system".to_string()),
            name: Some("testMachine".to_string()),
            ..Default::default()
        },
        message: Some(message.to_string()),
        type_: Some(event_type.to_string()),
        last_timestamp: Some(creation_time()),
        ..Default::default()
    }
}
