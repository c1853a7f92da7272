//! Control-plane / kubelet version compatibility.
//!
//! The control plane may run at most `max_minor_skew` minor versions ahead
//! of any kubelet, never behind one, and never on a different major.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{AdmissionError, Result};
use crate::version::KubernetesVersion;

/// Version skew policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkewPolicy {
    pub max_minor_skew: u64,
}

impl Default for SkewPolicy {
    fn default() -> Self {
        Self {
            max_minor_skew: crate::config::DEFAULT_MAX_MINOR_SKEW,
        }
    }
}

impl SkewPolicy {
    pub fn new(max_minor_skew: u64) -> Self {
        Self { max_minor_skew }
    }

    /// Whether a control plane at `requested` may serve a kubelet at `kubelet`.
    pub fn is_compatible(&self, requested: &KubernetesVersion, kubelet: &KubernetesVersion) -> bool {
        let max = i64::try_from(self.max_minor_skew).unwrap_or(i64::MAX);
        match requested.skew(kubelet) {
            Some(skew) => (0..=max).contains(&skew) && requested >= kubelet,
            None => false,
        }
    }

    /// Check `requested` against every kubelet version.
    ///
    /// Offenders are reported sorted and without duplicates.
    pub fn check(&self, requested: &KubernetesVersion, kubelets: &[KubernetesVersion]) -> Result<()> {
        let incompatible: BTreeSet<&KubernetesVersion> = kubelets
            .iter()
            .filter(|kubelet| !self.is_compatible(requested, kubelet))
            .collect();

        if incompatible.is_empty() {
            return Ok(());
        }

        debug!(
            requested = %requested,
            incompatible = incompatible.len(),
            "Kubelet versions outside the allowed skew"
        );
        Err(AdmissionError::IncompatibleNodes {
            incompatible: incompatible.into_iter().cloned().collect(),
            requested: requested.clone(),
        })
    }
}
