// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Functional tests for the cluster service.
//!
//! These tests drive every cluster operation end to end through
//! `ClusterService` over the in-memory backend. No Kubernetes API server is
//! required.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run with log output
//! RUST_LOG=cluster_admission=debug cargo test --test functional -- --nocapture
//! ```
//!
//! ## Test Categories
//!
//! - **Create tests**: authorization order, datacenter hiding, presets, audit enforcement
//! - **Patch tests**: merge and JSON patches, kubelet skew, immutability
//! - **Read tests**: get, list and health, including credential redaction
//! - **Delete tests**: removal and SSH key detachment
//! - **Event tests**: event listing and type filters

#[path = "../common/mod.rs"]
#[allow(dead_code)]
mod common;

mod event_tests;
mod read_tests;
