//! Preset Custom Resource Definition.
//!
//! A preset is a named bundle of cloud credentials an administrator shares
//! with users, optionally scoped to a single email domain.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::cluster::ProviderKind;

/// Preset holds one optional credential block per cloud provider.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kubermatic.k8s.io",
    version = "v1",
    kind = "Preset",
    plural = "presets",
    derive = "PartialEq",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct PresetSpec {
    /// Only users whose email domain matches may use this preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_email_domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fake: Option<FakePreset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openstack: Option<OpenstackPreset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsPreset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzurePreset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digitalocean: Option<DigitaloceanPreset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hetzner: Option<HetznerPreset>,
}

impl PresetSpec {
    /// Credential block for `provider`, if the preset carries one.
    pub fn credentials_for(&self, provider: ProviderKind) -> Option<ProviderCredentials> {
        match provider {
            ProviderKind::Fake => self.fake.clone().map(ProviderCredentials::Fake),
            ProviderKind::Openstack => self.openstack.clone().map(ProviderCredentials::Openstack),
            ProviderKind::Aws => self.aws.clone().map(ProviderCredentials::Aws),
            ProviderKind::Azure => self.azure.clone().map(ProviderCredentials::Azure),
            ProviderKind::Digitalocean => {
                self.digitalocean.clone().map(ProviderCredentials::Digitalocean)
            }
            ProviderKind::Hetzner => self.hetzner.clone().map(ProviderCredentials::Hetzner),
        }
    }
}

/// Credentials resolved from a preset for a single provider.
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderCredentials {
    Fake(FakePreset),
    Openstack(OpenstackPreset),
    Aws(AwsPreset),
    Azure(AzurePreset),
    Digitalocean(DigitaloceanPreset),
    Hetzner(HetznerPreset),
}

impl ProviderCredentials {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderCredentials::Fake(_) => ProviderKind::Fake,
            ProviderCredentials::Openstack(_) => ProviderKind::Openstack,
            ProviderCredentials::Aws(_) => ProviderKind::Aws,
            ProviderCredentials::Azure(_) => ProviderKind::Azure,
            ProviderCredentials::Digitalocean(_) => ProviderKind::Digitalocean,
            ProviderCredentials::Hetzner(_) => ProviderKind::Hetzner,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct FakePreset {
    pub token: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct OpenstackPreset {
    pub username: String,
    pub password: String,
    pub tenant: String,
    pub domain: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsPreset {
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AzurePreset {
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    #[serde(rename = "subscriptionID")]
    pub subscription_id: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct DigitaloceanPreset {
    pub token: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct HetznerPreset {
    pub token: String,
}
