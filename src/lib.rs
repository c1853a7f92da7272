//! cluster-admission library crate
//!
//! Admission and compatibility decisions for user-managed Kubernetes
//! clusters in a multi-tenant control plane. Requests are authorized against
//! project membership, shaped by datacenter and credential-preset policy, and
//! checked for control-plane/kubelet version skew before anything is stored.
//!
//! [`ClusterService`] is the entry point; the transport layer decodes
//! requests, calls it and maps [`AdmissionError::status_code`] onto responses.

pub mod admission;
pub mod api;
pub mod authz;
pub mod compatibility;
pub mod config;
pub mod crd;
pub mod datacenter;
pub mod error;
pub mod metrics;
pub mod preset;
pub mod service;
pub mod store;
pub mod version;

pub use admission::{AdmissionState, ClusterAdmission, ProjectAccess};
pub use api::{ClusterHealth, ClusterView, CreateClusterRequest, EventType, EventView, NewCluster};
pub use authz::{Grant, Operation, Principal};
pub use compatibility::SkewPolicy;
pub use config::{AdmissionConfig, ConfigError};
pub use datacenter::{Datacenter, DatacenterCatalog};
pub use error::{AdmissionError, ErrorKind, Result, StoreError};
pub use metrics::Metrics;
pub use service::ClusterService;
pub use store::{Backend, MemoryBackend};
pub use version::KubernetesVersion;
