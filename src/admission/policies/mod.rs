//! Spec validation policies.
//!
//! Policies are organized into tiers:
//! - Tier 1 (Shape): Always enforced (required fields)
//! - Tier 2 (Extension): Provider and distribution specific requirements
//! - Tier 3 (Update): Only enforced on patches (immutability)

pub mod immutability;
pub mod spec_shape;

use crate::crd::{ClusterSettings, ClusterSpec, ClusterType};
use crate::error::Result;

/// Context for validation
pub struct ValidationContext<'a> {
    /// Distribution requested
    pub cluster_type: ClusterType,
    /// Settings being validated
    pub settings: &'a ClusterSettings,
    /// The stored spec (for patches)
    pub current: Option<&'a ClusterSpec>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(cluster_type: ClusterType, settings: &'a ClusterSettings) -> Self {
        Self {
            cluster_type,
            settings,
            current: None,
        }
    }

    pub fn with_current(mut self, current: &'a ClusterSpec) -> Self {
        self.current = Some(current);
        self
    }

    /// Check if this is a patch
    pub fn is_update(&self) -> bool {
        self.current.is_some()
    }
}

/// Run all validation policies
pub fn validate_all(ctx: &ValidationContext<'_>) -> Result<()> {
    // Tier 1: Shape validations (always enforced)
    spec_shape::validate(ctx)?;

    // Tier 2: Extension validations
    spec_shape::validate_extensions(ctx)?;

    // Tier 3: Update validations (only for patches)
    if ctx.is_update() {
        immutability::validate(ctx)?;
    }

    Ok(())
}
