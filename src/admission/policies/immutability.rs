//! Immutability validation policy.
//!
//! Tier 3 (Update): Only enforced on patches
//!
//! Validates that the datacenter, cloud provider and cluster type never
//! change after creation.

use super::ValidationContext;
use crate::error::{AdmissionError, Result};

/// Validate immutability constraints on patches
pub fn validate(ctx: &ValidationContext<'_>) -> Result<()> {
    let Some(old) = ctx.current else {
        return Ok(());
    };
    let new = ctx.settings;

    if old.settings.cloud.datacenter_name != new.cloud.datacenter_name {
        return Err(AdmissionError::InvalidSpec(format!(
            "changing the datacenter is not allowed (from {:?} to {:?})",
            old.settings.cloud.datacenter_name, new.cloud.datacenter_name
        )));
    }

    if old.settings.cloud.provider.kind() != new.cloud.provider.kind() {
        return Err(AdmissionError::InvalidSpec(format!(
            "changing the cloud provider is not allowed (from {} to {})",
            old.settings.cloud.provider.kind(),
            new.cloud.provider.kind()
        )));
    }

    if old.cluster_type != ctx.cluster_type {
        return Err(AdmissionError::InvalidSpec(format!(
            "changing the cluster type is not allowed (from {} to {})",
            old.cluster_type, ctx.cluster_type
        )));
    }

    Ok(())
}
