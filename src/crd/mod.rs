//! Custom Resource Definitions (CRDs) persisted by the control plane.
//!
//! - `Cluster`: a managed user cluster and its provider configuration
//! - `Project` / `UserProjectBinding`: tenancy and membership
//! - `Preset`: shared cloud credentials
//! - `UserSSHKey`: project SSH keys assigned to clusters
//! - `ConstraintTemplate`: read-only admission policy templates

mod cluster;
mod constraint_template;
mod preset;
mod project;
mod ssh_key;

pub use cluster::*;
pub use constraint_template::*;
pub use preset::*;
pub use project::*;
pub use ssh_key::*;
