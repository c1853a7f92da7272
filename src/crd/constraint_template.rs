//! ConstraintTemplate Custom Resource Definition.
//!
//! Templates describe admission policies that can be instantiated as
//! constraints on user clusters. They are exposed read-only.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kubermatic.k8s.io",
    version = "v1",
    kind = "ConstraintTemplate",
    plural = "constrainttemplates",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintTemplateSpec {
    pub crd: ConstraintTemplateCrd,
    #[serde(default)]
    pub targets: Vec<ConstraintTarget>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ConstraintTemplateCrd {
    pub spec: ConstraintTemplateCrdSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ConstraintTemplateCrdSpec {
    pub names: ConstraintTemplateNames,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ConstraintTemplateNames {
    pub kind: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ConstraintTarget {
    pub target: String,
    /// Rego policy source.
    #[serde(default)]
    pub rego: String,
}
