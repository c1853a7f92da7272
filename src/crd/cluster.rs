//! Cluster Custom Resource Definition.
//!
//! A `Cluster` is the persisted form of a managed user cluster. Its cloud
//! configuration is a closed set of provider variants; exactly one is active
//! per cluster and validation is keyed on that variant.

use std::fmt;

use kube::CustomResource;
use schemars::JsonSchema;
use schemars::SchemaGenerator;
use schemars::Schema;
use serde::{Deserialize, Serialize};

use super::preset::ProviderCredentials;
use crate::version::{self, KubernetesVersion};

/// Label carrying the id of the project a cluster belongs to.
pub const PROJECT_ID_LABEL: &str = "project-id";

/// Cluster describes a managed Kubernetes cluster owned by a project.
///
/// Example:
/// ```yaml
/// apiVersion: kubermatic.k8s.io/v1
/// kind: Cluster
/// metadata:
///   name: w225mx4z66
///   labels:
///     project-id: my-first-project-ID
/// spec:
///   humanReadableName: keen-snyder
///   type: kubernetes
///   version: 1.15.0
///   cloud:
///     dc: fake-dc
///     fake:
///       token: dummy_token
/// ```
#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kubermatic.k8s.io",
    version = "v1",
    kind = "Cluster",
    plural = "clusters",
    status = "ClusterStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Name", "type":"string", "jsonPath":".spec.humanReadableName"}"#,
    printcolumn = r#"{"name":"Version", "type":"string", "jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Datacenter", "type":"string", "jsonPath":".spec.cloud.dc"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Name shown to users; the object name is a generated id.
    #[serde(default)]
    pub human_readable_name: String,

    /// Distribution running in the control plane.
    #[serde(default, rename = "type")]
    pub cluster_type: ClusterType,

    /// User-editable settings, shared with the request representation.
    #[serde(flatten)]
    pub settings: ClusterSettings,
}

/// Cluster settings as they appear under `spec` in API requests.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSettings {
    /// Cloud provider configuration and datacenter reference.
    pub cloud: CloudSpec,

    /// Control-plane Kubernetes version.
    #[serde(
        default,
        deserialize_with = "version::deserialize_optional",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub version: Option<KubernetesVersion>,

    /// OpenShift-specific settings; required when the cluster type is openshift.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openshift: Option<OpenshiftSettings>,

    /// Kubernetes audit logging toggle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_logging: Option<AuditLoggingSettings>,

    /// OIDC settings for the user cluster API server.
    #[serde(default)]
    pub oidc: OidcSettings,
}

impl ClusterSettings {
    /// Copy safe to return to callers: credentials and secrets removed.
    pub fn redacted(&self) -> ClusterSettings {
        ClusterSettings {
            cloud: CloudSpec::new(
                self.cloud.datacenter_name.clone(),
                self.cloud.provider.redacted(),
            ),
            version: self.version.clone(),
            openshift: None,
            audit_logging: self.audit_logging.clone(),
            oidc: OidcSettings {
                client_secret: String::new(),
                ..self.oidc.clone()
            },
        }
    }

    /// Fill the write-only fields that [`redacted`](Self::redacted) clears
    /// with the values from `stored`. Fields already set here win.
    pub fn restore_secrets(&mut self, stored: &ClusterSettings) {
        self.cloud
            .provider
            .restore_credentials(&stored.cloud.provider);

        let has_pull_secret = self
            .openshift
            .as_ref()
            .is_some_and(|openshift| !openshift.image_pull_secret.is_empty());
        if !has_pull_secret && stored.openshift.is_some() {
            self.openshift = stored.openshift.clone();
        }

        if self.oidc.client_secret.is_empty() {
            self.oidc.client_secret = stored.oidc.client_secret.clone();
        }
    }
}

/// Control-plane distribution.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClusterType {
    #[default]
    Kubernetes,
    Openshift,
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterType::Kubernetes => write!(f, "kubernetes"),
            ClusterType::Openshift => write!(f, "openshift"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenshiftSettings {
    /// Pull secret for the OpenShift release images.
    #[serde(default)]
    pub image_pull_secret: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct AuditLoggingSettings {
    pub enabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OidcSettings {
    #[serde(default, rename = "issuerURL", skip_serializing_if = "String::is_empty")]
    pub issuer_url: String,
    #[serde(default, rename = "clientID", skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username_claim: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub groups_claim: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub required_claim: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extra_scopes: String,
}

// ============================================================================
// Cloud providers
// ============================================================================

/// Supported cloud providers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Fake,
    Openstack,
    Aws,
    Azure,
    Digitalocean,
    Hetzner,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Fake => "fake",
            ProviderKind::Openstack => "openstack",
            ProviderKind::Aws => "aws",
            ProviderKind::Azure => "azure",
            ProviderKind::Digitalocean => "digitalocean",
            ProviderKind::Hetzner => "hetzner",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloud configuration: the datacenter plus exactly one provider block.
///
/// On the wire this is `{"dc": "...", "<provider>": {...}}`; decoding fails
/// unless exactly one provider key is present.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "CloudSpecFields", into = "CloudSpecFields")]
pub struct CloudSpec {
    pub datacenter_name: String,
    pub provider: CloudProvider,
}

impl CloudSpec {
    pub fn new(datacenter_name: impl Into<String>, provider: CloudProvider) -> Self {
        Self {
            datacenter_name: datacenter_name.into(),
            provider,
        }
    }
}

impl JsonSchema for CloudSpec {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "CloudSpec".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        CloudSpecFields::json_schema(generator)
    }
}

/// The active provider and its settings.
#[derive(Clone, Debug, PartialEq)]
pub enum CloudProvider {
    Fake(FakeCloudSpec),
    Openstack(OpenstackCloudSpec),
    Aws(AwsCloudSpec),
    Azure(AzureCloudSpec),
    Digitalocean(DigitaloceanCloudSpec),
    Hetzner(HetznerCloudSpec),
}

impl CloudProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            CloudProvider::Fake(_) => ProviderKind::Fake,
            CloudProvider::Openstack(_) => ProviderKind::Openstack,
            CloudProvider::Aws(_) => ProviderKind::Aws,
            CloudProvider::Azure(_) => ProviderKind::Azure,
            CloudProvider::Digitalocean(_) => ProviderKind::Digitalocean,
            CloudProvider::Hetzner(_) => ProviderKind::Hetzner,
        }
    }

    /// Field paths of required credentials that are empty.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let required: Vec<(&'static str, &str)> = match self {
            CloudProvider::Fake(spec) => vec![("cloud.fake.token", &spec.token)],
            CloudProvider::Openstack(spec) => vec![
                ("cloud.openstack.username", &spec.username),
                ("cloud.openstack.password", &spec.password),
                ("cloud.openstack.tenant", &spec.tenant),
                ("cloud.openstack.domain", &spec.domain),
            ],
            CloudProvider::Aws(spec) => vec![
                ("cloud.aws.accessKeyId", &spec.access_key_id),
                ("cloud.aws.secretAccessKey", &spec.secret_access_key),
            ],
            CloudProvider::Azure(spec) => vec![
                ("cloud.azure.tenantID", &spec.tenant_id),
                ("cloud.azure.subscriptionID", &spec.subscription_id),
                ("cloud.azure.clientID", &spec.client_id),
                ("cloud.azure.clientSecret", &spec.client_secret),
            ],
            CloudProvider::Digitalocean(spec) => vec![("cloud.digitalocean.token", &spec.token)],
            CloudProvider::Hetzner(spec) => vec![("cloud.hetzner.token", &spec.token)],
        };
        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(path, _)| path)
            .collect()
    }

    /// Overwrite credential fields with the ones resolved from a preset.
    ///
    /// Returns the provider the credentials were meant for when it does not
    /// match the active variant.
    pub fn apply_credentials(
        &mut self,
        credentials: &ProviderCredentials,
    ) -> Result<(), ProviderKind> {
        match (self, credentials) {
            (CloudProvider::Fake(spec), ProviderCredentials::Fake(creds)) => {
                spec.token = creds.token.clone();
            }
            (CloudProvider::Openstack(spec), ProviderCredentials::Openstack(creds)) => {
                spec.username = creds.username.clone();
                spec.password = creds.password.clone();
                spec.tenant = creds.tenant.clone();
                spec.domain = creds.domain.clone();
            }
            (CloudProvider::Aws(spec), ProviderCredentials::Aws(creds)) => {
                spec.access_key_id = creds.access_key_id.clone();
                spec.secret_access_key = creds.secret_access_key.clone();
            }
            (CloudProvider::Azure(spec), ProviderCredentials::Azure(creds)) => {
                spec.tenant_id = creds.tenant_id.clone();
                spec.subscription_id = creds.subscription_id.clone();
                spec.client_id = creds.client_id.clone();
                spec.client_secret = creds.client_secret.clone();
            }
            (CloudProvider::Digitalocean(spec), ProviderCredentials::Digitalocean(creds)) => {
                spec.token = creds.token.clone();
            }
            (CloudProvider::Hetzner(spec), ProviderCredentials::Hetzner(creds)) => {
                spec.token = creds.token.clone();
            }
            (_, other) => return Err(other.kind()),
        }
        Ok(())
    }

    /// Fill empty credential fields from `stored`.
    ///
    /// A different variant in `stored` is ignored; immutability is checked
    /// elsewhere.
    pub fn restore_credentials(&mut self, stored: &CloudProvider) {
        fn keep(field: &mut String, stored: &str) {
            if field.is_empty() {
                *field = stored.to_string();
            }
        }

        match (self, stored) {
            (CloudProvider::Fake(spec), CloudProvider::Fake(old)) => {
                keep(&mut spec.token, &old.token);
            }
            (CloudProvider::Openstack(spec), CloudProvider::Openstack(old)) => {
                keep(&mut spec.username, &old.username);
                keep(&mut spec.password, &old.password);
            }
            (CloudProvider::Aws(spec), CloudProvider::Aws(old)) => {
                keep(&mut spec.access_key_id, &old.access_key_id);
                keep(&mut spec.secret_access_key, &old.secret_access_key);
            }
            (CloudProvider::Azure(spec), CloudProvider::Azure(old)) => {
                keep(&mut spec.client_id, &old.client_id);
                keep(&mut spec.client_secret, &old.client_secret);
                keep(&mut spec.subscription_id, &old.subscription_id);
                keep(&mut spec.tenant_id, &old.tenant_id);
            }
            (CloudProvider::Digitalocean(spec), CloudProvider::Digitalocean(old)) => {
                keep(&mut spec.token, &old.token);
            }
            (CloudProvider::Hetzner(spec), CloudProvider::Hetzner(old)) => {
                keep(&mut spec.token, &old.token);
            }
            _ => {}
        }
    }

    /// Copy of this provider block with every credential field cleared.
    pub fn redacted(&self) -> CloudProvider {
        match self {
            CloudProvider::Fake(_) => CloudProvider::Fake(FakeCloudSpec::default()),
            CloudProvider::Openstack(spec) => CloudProvider::Openstack(OpenstackCloudSpec {
                username: String::new(),
                password: String::new(),
                ..spec.clone()
            }),
            CloudProvider::Aws(spec) => CloudProvider::Aws(AwsCloudSpec {
                access_key_id: String::new(),
                secret_access_key: String::new(),
                ..spec.clone()
            }),
            CloudProvider::Azure(spec) => CloudProvider::Azure(AzureCloudSpec {
                client_id: String::new(),
                client_secret: String::new(),
                subscription_id: String::new(),
                tenant_id: String::new(),
                ..spec.clone()
            }),
            CloudProvider::Digitalocean(_) => {
                CloudProvider::Digitalocean(DigitaloceanCloudSpec::default())
            }
            CloudProvider::Hetzner(_) => CloudProvider::Hetzner(HetznerCloudSpec::default()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct FakeCloudSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenstackCloudSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub floating_ip_pool: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenant: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub security_groups: String,
    #[serde(default, rename = "routerID", skip_serializing_if = "String::is_empty")]
    pub router_id: String,
    #[serde(default, rename = "subnetID", skip_serializing_if = "String::is_empty")]
    pub subnet_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsCloudSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_key_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_access_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vpc_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub route_table_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_profile_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub security_group_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AzureCloudSpec {
    #[serde(default, rename = "tenantID", skip_serializing_if = "String::is_empty")]
    pub tenant_id: String,
    #[serde(default, rename = "subscriptionID", skip_serializing_if = "String::is_empty")]
    pub subscription_id: String,
    #[serde(default, rename = "clientID", skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_group: String,
    #[serde(default, rename = "vnet", skip_serializing_if = "String::is_empty")]
    pub vnet_name: String,
    #[serde(default, rename = "subnet", skip_serializing_if = "String::is_empty")]
    pub subnet_name: String,
    #[serde(default, rename = "routeTable", skip_serializing_if = "String::is_empty")]
    pub route_table_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub security_group: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct DigitaloceanCloudSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct HetznerCloudSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

/// Wire shape of [`CloudSpec`] with one optional block per provider.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
struct CloudSpecFields {
    #[serde(default, rename = "dc")]
    datacenter_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fake: Option<FakeCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    openstack: Option<OpenstackCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aws: Option<AwsCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    azure: Option<AzureCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digitalocean: Option<DigitaloceanCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hetzner: Option<HetznerCloudSpec>,
}

impl TryFrom<CloudSpecFields> for CloudSpec {
    type Error = String;

    fn try_from(fields: CloudSpecFields) -> Result<Self, Self::Error> {
        let mut providers: Vec<CloudProvider> = Vec::new();
        providers.extend(fields.fake.map(CloudProvider::Fake));
        providers.extend(fields.openstack.map(CloudProvider::Openstack));
        providers.extend(fields.aws.map(CloudProvider::Aws));
        providers.extend(fields.azure.map(CloudProvider::Azure));
        providers.extend(fields.digitalocean.map(CloudProvider::Digitalocean));
        providers.extend(fields.hetzner.map(CloudProvider::Hetzner));

        let count = providers.len();
        match providers.pop() {
            Some(provider) if count == 1 => Ok(CloudSpec {
                datacenter_name: fields.datacenter_name,
                provider,
            }),
            Some(_) => Err(format!(
                "invalid cloud spec: exactly one cloud provider must be configured, got {}",
                count
            )),
            None => Err("invalid cloud spec: no cloud provider configured".to_string()),
        }
    }
}

impl From<CloudSpec> for CloudSpecFields {
    fn from(spec: CloudSpec) -> Self {
        let mut fields = CloudSpecFields {
            datacenter_name: spec.datacenter_name,
            ..Default::default()
        };
        match spec.provider {
            CloudProvider::Fake(p) => fields.fake = Some(p),
            CloudProvider::Openstack(p) => fields.openstack = Some(p),
            CloudProvider::Aws(p) => fields.aws = Some(p),
            CloudProvider::Azure(p) => fields.azure = Some(p),
            CloudProvider::Digitalocean(p) => fields.digitalocean = Some(p),
            CloudProvider::Hetzner(p) => fields.hetzner = Some(p),
        }
        fields
    }
}

// ============================================================================
// Cluster Status
// ============================================================================

/// Observed state of a cluster, written by the reconciliation layer.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Control-plane version currently running.
    #[serde(
        default,
        deserialize_with = "version::deserialize_optional",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub version: Option<KubernetesVersion>,

    /// Address of the user cluster API server.
    #[serde(default)]
    pub url: String,

    /// Per-component health.
    #[serde(default)]
    pub extended_health: ExtendedClusterHealth,
}

/// Health of a single control-plane component.
///
/// Encoded as an integer on the wire: down = 0, up = 1, unknown = 2.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum HealthStatus {
    Down,
    Up,
    #[default]
    Unknown,
}

impl From<HealthStatus> for u8 {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Down => 0,
            HealthStatus::Up => 1,
            HealthStatus::Unknown => 2,
        }
    }
}

impl TryFrom<u8> for HealthStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HealthStatus::Down),
            1 => Ok(HealthStatus::Up),
            2 => Ok(HealthStatus::Unknown),
            other => Err(format!("unknown health status {}", other)),
        }
    }
}

impl JsonSchema for HealthStatus {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "HealthStatus".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        u8::json_schema(generator)
    }
}

/// Health vector for the components that make up a user cluster.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedClusterHealth {
    #[serde(default)]
    pub apiserver: HealthStatus,
    #[serde(default)]
    pub scheduler: HealthStatus,
    #[serde(default)]
    pub controller: HealthStatus,
    #[serde(default)]
    pub machine_controller: HealthStatus,
    #[serde(default)]
    pub etcd: HealthStatus,
    #[serde(default)]
    pub cloud_provider_infrastructure: HealthStatus,
    #[serde(default)]
    pub user_cluster_controller_manager: HealthStatus,
}

impl ExtendedClusterHealth {
    /// Every component reports up.
    pub fn all_healthy(&self) -> bool {
        [
            self.apiserver,
            self.scheduler,
            self.controller,
            self.machine_controller,
            self.etcd,
            self.cloud_provider_infrastructure,
            self.user_cluster_controller_manager,
        ]
        .iter()
        .all(|status| *status == HealthStatus::Up)
    }
}

impl Cluster {
    /// Id of the owning project, from the project label.
    pub fn project_id(&self) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(PROJECT_ID_LABEL))
            .map(String::as_str)
    }

    pub fn belongs_to(&self, project_id: &str) -> bool {
        self.project_id() == Some(project_id)
    }

    /// Cluster id (the object name).
    pub fn id(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}
