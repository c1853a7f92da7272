//! Project and UserProjectBinding Custom Resource Definitions.

use std::fmt;
use std::str::FromStr;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Project groups clusters and the users allowed to manage them.
#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kubermatic.k8s.io",
    version = "v1",
    kind = "Project",
    plural = "projects",
    status = "ProjectStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Name","type":"string","jsonPath":".spec.name"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    /// Display name; the object name is the project id.
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ProjectStatus {
    #[serde(default)]
    pub phase: ProjectPhase,
}

/// Lifecycle phase of a project.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ProjectPhase {
    Active,
    /// Created but not yet initialized by the project controller.
    #[default]
    Inactive,
    Terminating,
}

impl fmt::Display for ProjectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectPhase::Active => write!(f, "Active"),
            ProjectPhase::Inactive => write!(f, "Inactive"),
            ProjectPhase::Terminating => write!(f, "Terminating"),
        }
    }
}

impl Project {
    /// Phase from status; a project without status has not been initialized.
    pub fn phase(&self) -> ProjectPhase {
        self.status
            .as_ref()
            .map(|status| status.phase)
            .unwrap_or_default()
    }

    pub fn id(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

/// Binds a user to a project with a group that encodes the role.
#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kubermatic.k8s.io",
    version = "v1",
    kind = "UserProjectBinding",
    plural = "userprojectbindings",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct UserProjectBindingSpec {
    pub user_email: String,
    #[serde(rename = "projectID")]
    pub project_id: String,
    /// `<role>-<projectID>` or the bare role name.
    pub group: String,
}

impl UserProjectBinding {
    /// Role granted by this binding, if the group names a known role.
    pub fn role(&self) -> Option<ProjectRole> {
        let group = self.spec.group.as_str();
        let bare = group
            .strip_suffix(self.spec.project_id.as_str())
            .and_then(|prefix| prefix.strip_suffix('-'))
            .unwrap_or(group);
        bare.parse().ok()
    }

    /// Whether this binding grants `email` access to `project_id`.
    pub fn matches(&self, project_id: &str, email: &str) -> bool {
        self.spec.project_id == project_id && self.spec.user_email.eq_ignore_ascii_case(email)
    }
}

/// Project role, ordered by privilege.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Viewers,
    Editors,
    Owners,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Viewers => "viewers",
            ProjectRole::Editors => "editors",
            ProjectRole::Owners => "owners",
        }
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewers" => Ok(ProjectRole::Viewers),
            "editors" => Ok(ProjectRole::Editors),
            "owners" => Ok(ProjectRole::Owners),
            other => Err(format!("unknown project role {:?}", other)),
        }
    }
}
