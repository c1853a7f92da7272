//! Spec shape validation policy.
//!
//! Tier 1 (Shape): required fields every cluster must carry.
//! Tier 2 (Extension): requirements tied to the distribution.

use tracing::debug;

use super::ValidationContext;
use crate::crd::ClusterType;
use crate::error::{AdmissionError, Result};

/// Validate fields every cluster must carry.
pub fn validate(ctx: &ValidationContext<'_>) -> Result<()> {
    if ctx.settings.version.is_none() {
        debug!("Cluster spec is missing a version");
        return Err(AdmissionError::InvalidSpec("version is required".to_string()));
    }

    if ctx.settings.cloud.datacenter_name.trim().is_empty() {
        debug!("Cluster spec is missing a datacenter");
        return Err(AdmissionError::InvalidSpec(
            "datacenter (spec.cloud.dc) is required".to_string(),
        ));
    }

    Ok(())
}

/// Validate distribution-specific requirements.
pub fn validate_extensions(ctx: &ValidationContext<'_>) -> Result<()> {
    if ctx.cluster_type == ClusterType::Openshift {
        let has_secret = ctx
            .settings
            .openshift
            .as_ref()
            .is_some_and(|openshift| !openshift.image_pull_secret.trim().is_empty());
        if !has_secret {
            debug!("Openshift cluster is missing an image pull secret");
            return Err(AdmissionError::MissingImagePullSecret);
        }
    }

    Ok(())
}
