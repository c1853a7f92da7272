//! Error types for admission decisions.
//!
//! Every rejection carries a caller-visible [`ErrorKind`] so the transport
//! layer can map it to a status code without inspecting messages.

use std::fmt;

use thiserror::Error;

use crate::version::{KubernetesVersion, VersionError};

/// Caller-visible classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidSpec,
    InvalidPatch,
    NotFound,
    Forbidden,
    Unavailable,
    PresetNotFound,
    IncompatibleNodes,
    PolicyViolation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidSpec => "InvalidSpec",
            ErrorKind::InvalidPatch => "InvalidPatch",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Unavailable => "Unavailable",
            ErrorKind::PresetNotFound => "PresetNotFound",
            ErrorKind::IncompatibleNodes => "IncompatibleNodes",
            ErrorKind::PolicyViolation => "PolicyViolation",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a collaborator store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("{kind} {name:?} does not exist")]
    Missing { kind: &'static str, name: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Error type for admission operations
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// Malformed or incomplete request body
    #[error("invalid cluster: {0}")]
    InvalidSpec(String),

    /// Required field absent for the selected provider or cluster type
    #[error("invalid cluster: missing required field {field}")]
    MissingField { field: String },

    #[error("invalid cluster: {0}")]
    InvalidVersion(#[from] VersionError),

    #[error("openshift clusters must be configured with an imagePullSecret")]
    MissingImagePullSecret,

    /// The patch document itself could not be parsed or applied
    #[error("cannot patch cluster: {0}")]
    InvalidPatch(String),

    /// Absent, or present but hidden from the principal
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("forbidden: {email:?} doesn't belong to the given project = {project_id}")]
    NotProjectMember { email: String, project_id: String },

    #[error(
        "forbidden: {email:?} needs at least the {required} role in project {project_id} to {operation}"
    )]
    InsufficientRole {
        email: String,
        project_id: String,
        required: String,
        operation: String,
    },

    /// Project exists but is not ready for mutations; retry later
    #[error("{0}")]
    Unavailable(String),

    #[error("invalid credentials: missing preset '{preset}' for the user '{email}'")]
    PresetNotFound { preset: String, email: String },

    #[error(
        "Cluster contains nodes running the following incompatible kubelet versions: [{}]. Upgrade your nodes before you upgrade the cluster.",
        join_versions(.incompatible)
    )]
    IncompatibleNodes {
        incompatible: Vec<KubernetesVersion>,
        requested: KubernetesVersion,
    },

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("internal error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

fn join_versions(versions: &[KubernetesVersion]) -> String {
    versions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl AdmissionError {
    /// Classify this error for the caller
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdmissionError::InvalidSpec(_)
            | AdmissionError::MissingField { .. }
            | AdmissionError::InvalidVersion(_)
            | AdmissionError::MissingImagePullSecret => ErrorKind::InvalidSpec,
            AdmissionError::InvalidPatch(_) => ErrorKind::InvalidPatch,
            AdmissionError::NotFound { .. } => ErrorKind::NotFound,
            AdmissionError::NotProjectMember { .. } | AdmissionError::InsufficientRole { .. } => {
                ErrorKind::Forbidden
            }
            AdmissionError::Unavailable(_) => ErrorKind::Unavailable,
            AdmissionError::PresetNotFound { .. } => ErrorKind::PresetNotFound,
            AdmissionError::IncompatibleNodes { .. } => ErrorKind::IncompatibleNodes,
            AdmissionError::PolicyViolation(_) => ErrorKind::PolicyViolation,
            AdmissionError::Store(_) | AdmissionError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-style status code for the transport layer
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidSpec
            | ErrorKind::InvalidPatch
            | ErrorKind::PresetNotFound
            | ErrorKind::IncompatibleNodes
            | ErrorKind::PolicyViolation => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }

    /// Check if the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        match self.kind() {
            ErrorKind::Unavailable => true,
            ErrorKind::Internal => matches!(self, AdmissionError::Store(StoreError::Backend(_))),
            _ => false,
        }
    }

    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        AdmissionError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn missing_field(field: impl Into<String>) -> Self {
        AdmissionError::MissingField {
            field: field.into(),
        }
    }
}

/// Result type alias for admission operations
pub type Result<T> = std::result::Result<T, AdmissionError>;
