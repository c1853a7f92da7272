//! Cluster admission validator.
//!
//! Orchestrates authorization, datacenter and preset policy, and version
//! compatibility for every cluster operation. Decisions are pure functions of
//! the snapshots passed in; nothing here performs I/O or holds state.

pub mod patch;
pub mod policies;
pub mod state_machine;

use tracing::debug;

use crate::api::{NewCluster, PatchTarget};
use crate::authz::{self, Grant, Operation, Principal};
use crate::compatibility::SkewPolicy;
use crate::config::AdmissionConfig;
use crate::crd::{Cluster, ClusterSpec, Preset, Project, UserProjectBinding};
use crate::datacenter::{self, Datacenter};
use crate::error::{AdmissionError, Result};
use crate::preset;
use crate::version::KubernetesVersion;

use self::patch::PatchDocument;
use self::policies::{ValidationContext, spec_shape};
pub use self::state_machine::{AdmissionState, AdmissionWalk, Admitted};

/// Who is asking, and the project they are asking about.
#[derive(Clone, Copy, Debug)]
pub struct ProjectAccess<'a> {
    pub principal: &'a Principal,
    pub project: &'a Project,
    pub bindings: &'a [UserProjectBinding],
}

/// A patch request whose principal passed the authorization gate.
pub struct AuthorizedPatch {
    walk: AdmissionWalk,
}

impl AuthorizedPatch {
    /// End the decision with `error`.
    pub fn reject(mut self, error: AdmissionError) -> AdmissionError {
        self.walk.reject(error)
    }
}

/// An authorized, decoded and shape-validated patch.
pub struct PatchCandidate {
    walk: AdmissionWalk,
    spec: ClusterSpec,
    version_changed: bool,
}

impl PatchCandidate {
    /// Whether the patch changes the control-plane version.
    pub fn version_changed(&self) -> bool {
        self.version_changed
    }

    pub fn spec(&self) -> &ClusterSpec {
        &self.spec
    }
}

/// Admission decisions for cluster operations.
#[derive(Clone, Debug, Default)]
pub struct ClusterAdmission {
    config: AdmissionConfig,
    skew: SkewPolicy,
}

impl ClusterAdmission {
    pub fn new(config: AdmissionConfig) -> Self {
        let skew = SkewPolicy::new(config.max_minor_skew);
        Self { config, skew }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Decide a create request.
    ///
    /// `datacenter` is the stored datacenter named by the request and
    /// `preset` the preset named by its `credential`, if any. The admitted
    /// spec carries resolved credentials and datacenter defaults.
    pub fn admit_create(
        &self,
        access: ProjectAccess<'_>,
        request: NewCluster,
        datacenter: Option<Datacenter>,
        preset: Option<&Preset>,
    ) -> Result<Admitted<ClusterSpec>> {
        let mut walk = AdmissionWalk::start(Operation::Create);
        let NewCluster {
            name,
            cluster_type,
            credential,
            spec: mut settings,
        } = request;

        walk.check(spec_shape::validate(&ValidationContext::new(
            cluster_type,
            &settings,
        )))?;

        self.authorize(&mut walk, access, Operation::Create)?;

        let email = access.principal.email.as_str();
        let provider = settings.cloud.provider.kind();
        let dc = walk.check(datacenter::resolve(
            datacenter,
            &settings.cloud.datacenter_name,
            email,
        ))?;
        walk.check(dc.check_provider(provider))?;

        let credentials = match credential.as_deref() {
            Some(preset_name) => Some(walk.check(preset::resolve(
                preset,
                preset_name,
                email,
                provider,
            ))?),
            None => None,
        };
        walk.check(preset::apply(&mut settings, credentials.as_ref()))?;
        walk.check(spec_shape::validate_extensions(&ValidationContext::new(
            cluster_type,
            &settings,
        )))?;
        walk.check(dc.apply_defaults(&mut settings))?;
        walk.advance(state_machine::AdmissionEvent::PoliciesApplied)?;

        let version = walk.check(required_version(settings.version.as_ref()))?;
        walk.check(self.check_catalog(&version))?;
        walk.check(self.skew.check(&version, &[]))?;
        walk.advance(state_machine::AdmissionEvent::VersionAccepted)?;

        walk.admit(ClusterSpec {
            human_readable_name: name,
            cluster_type,
            settings,
        })
    }

    /// Authorize a patch before the cluster or the patch body is looked at.
    pub fn authorize_patch(&self, access: ProjectAccess<'_>) -> Result<AuthorizedPatch> {
        let mut walk = AdmissionWalk::start(Operation::Patch);
        self.authorize(&mut walk, access, Operation::Patch)?;
        Ok(AuthorizedPatch { walk })
    }

    /// Apply `body` to the caller's view of `current` and validate the result.
    ///
    /// The patch sees the redacted settings, so no operation can read or
    /// move a stored credential; cleared write-only fields are restored from
    /// `current` afterwards. Parse failures are `InvalidPatch`; a patched
    /// document that no longer decodes or violates shape or immutability
    /// rules is `InvalidSpec`.
    pub fn prepare_patch(
        &self,
        authorized: AuthorizedPatch,
        current: &Cluster,
        body: &[u8],
    ) -> Result<PatchCandidate> {
        let AuthorizedPatch { mut walk } = authorized;

        let document = walk.check(PatchDocument::parse(body))?;
        let target = PatchTarget {
            name: current.spec.human_readable_name.clone(),
            cluster_type: current.spec.cluster_type,
            spec: current.spec.settings.redacted(),
        };
        let mut value = walk.check(
            serde_json::to_value(&target)
                .map_err(|e| AdmissionError::Internal(format!("encode cluster: {}", e))),
        )?;
        walk.check(document.apply(&mut value))?;
        let patched: PatchTarget = walk.check(
            serde_json::from_value(value)
                .map_err(|e| AdmissionError::InvalidSpec(e.to_string())),
        )?;

        let mut spec = ClusterSpec {
            human_readable_name: patched.name,
            cluster_type: patched.cluster_type,
            settings: patched.spec,
        };
        spec.settings.restore_secrets(&current.spec.settings);
        walk.check(policies::validate_all(
            &ValidationContext::new(spec.cluster_type, &spec.settings).with_current(&current.spec),
        ))?;

        let version_changed = spec.settings.version != current.spec.settings.version;
        debug!(
            cluster = %current.id(),
            version_changed,
            "Patch candidate prepared"
        );
        Ok(PatchCandidate {
            walk,
            spec,
            version_changed,
        })
    }

    /// Decide a prepared patch.
    ///
    /// `datacenter` is the cluster's datacenter, used for audit-logging
    /// enforcement. `kubelets` only matters when the version changed.
    pub fn admit_patch(
        &self,
        candidate: PatchCandidate,
        datacenter: Option<&Datacenter>,
        kubelets: &[KubernetesVersion],
    ) -> Result<Admitted<ClusterSpec>> {
        let PatchCandidate {
            mut walk,
            mut spec,
            version_changed,
        } = candidate;

        match datacenter {
            Some(dc) => walk.check(dc.apply_defaults(&mut spec.settings))?,
            None => debug!(
                datacenter = %spec.settings.cloud.datacenter_name,
                "Datacenter not configured, skipping datacenter defaults"
            ),
        }
        walk.advance(state_machine::AdmissionEvent::PoliciesApplied)?;

        if version_changed {
            let version = walk.check(required_version(spec.settings.version.as_ref()))?;
            walk.check(self.skew.check(&version, kubelets))?;
        }
        walk.advance(state_machine::AdmissionEvent::VersionAccepted)?;

        walk.admit(spec)
    }

    /// Decide a delete, get, list, health or events request.
    pub fn admit_access(
        &self,
        access: ProjectAccess<'_>,
        operation: Operation,
    ) -> Result<Admitted<Grant>> {
        let mut walk = AdmissionWalk::start(operation);
        let grant = self.authorize(&mut walk, access, operation)?;
        walk.admit(grant)
    }

    fn authorize(
        &self,
        walk: &mut AdmissionWalk,
        access: ProjectAccess<'_>,
        operation: Operation,
    ) -> Result<Grant> {
        let grant = walk.check(authz::authorize(
            access.principal,
            access.project,
            access.bindings,
            operation,
            &self.config.minimum_roles,
        ))?;
        walk.advance(state_machine::AdmissionEvent::AccessGranted)?;
        Ok(grant)
    }

    fn check_catalog(&self, version: &KubernetesVersion) -> Result<()> {
        if self.config.is_supported(version) {
            Ok(())
        } else {
            Err(AdmissionError::InvalidSpec(format!(
                "invalid cloud spec: unsupported version {}",
                version
            )))
        }
    }
}

fn required_version(version: Option<&KubernetesVersion>) -> Result<KubernetesVersion> {
    version
        .cloned()
        .ok_or_else(|| AdmissionError::InvalidSpec("version is required".to_string()))
}
