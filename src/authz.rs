//! Authorization gate.
//!
//! Decides whether a principal may run an operation against a project.
//! Checks run in a fixed order: membership, project phase, role.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RoleTable;
use crate::crd::{Project, ProjectPhase, ProjectRole, UserProjectBinding};
use crate::error::{AdmissionError, Result};

/// Message returned while a project is not yet Active.
pub const PROJECT_NOT_INITIALIZED: &str = "Project is not initialized yet";

/// The authenticated caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl Principal {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            is_admin: false,
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// Project-scoped operations subject to the role table.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Patch,
    Delete,
    Get,
    List,
    Health,
    Events,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::Create,
        Operation::Patch,
        Operation::Delete,
        Operation::Get,
        Operation::List,
        Operation::Health,
        Operation::Events,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Patch => "patch",
            Operation::Delete => "delete",
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Health => "health",
            Operation::Events => "events",
        }
    }

    /// Whether the operation changes stored state.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Operation::Create | Operation::Patch | Operation::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grant {
    /// Admin access; membership was not checked.
    Admin,
    Member(ProjectRole),
}

/// Authorize `principal` to run `operation` on `project`.
///
/// `bindings` may contain bindings for other projects or users; only those
/// matching the project and principal email are considered. When several
/// match, the highest role wins.
pub fn authorize(
    principal: &Principal,
    project: &Project,
    bindings: &[UserProjectBinding],
    operation: Operation,
    roles: &RoleTable,
) -> Result<Grant> {
    let project_id = project.id();

    let role = if principal.is_admin {
        None
    } else {
        let matching: Vec<&UserProjectBinding> = bindings
            .iter()
            .filter(|b| b.matches(project_id, &principal.email))
            .collect();
        if matching.is_empty() {
            return Err(AdmissionError::NotProjectMember {
                email: principal.email.clone(),
                project_id: project_id.to_string(),
            });
        }
        // A binding with an unrecognized group grants membership but no role.
        Some(matching.iter().filter_map(|b| b.role()).max())
    };

    if project.phase() != ProjectPhase::Active {
        debug!(project = %project_id, phase = %project.phase(), "Project not active");
        return Err(AdmissionError::Unavailable(PROJECT_NOT_INITIALIZED.to_string()));
    }

    let Some(role) = role else {
        return Ok(Grant::Admin);
    };

    let required = roles.required(operation);
    match role {
        Some(role) if role >= required => Ok(Grant::Member(role)),
        _ => Err(AdmissionError::InsufficientRole {
            email: principal.email.clone(),
            project_id: project_id.to_string(),
            required: required.to_string(),
            operation: operation.to_string(),
        }),
    }
}
