//! Credential preset resolution.
//!
//! A create request may name a preset instead of carrying credentials. The
//! preset's block for the requested provider then replaces whatever inline
//! credentials the request had.

use tracing::debug;

use crate::crd::{ClusterSettings, Preset, ProviderCredentials, ProviderKind};
use crate::datacenter::email_domain;
use crate::error::{AdmissionError, Result};

/// Resolve the credentials a preset holds for `provider` on behalf of `email`.
///
/// Fails with `PresetNotFound` when the preset is absent, scoped to a
/// different email domain, or has no block for the provider.
pub fn resolve(
    preset: Option<&Preset>,
    preset_name: &str,
    email: &str,
    provider: ProviderKind,
) -> Result<ProviderCredentials> {
    let not_found = || AdmissionError::PresetNotFound {
        preset: preset_name.to_string(),
        email: email.to_string(),
    };

    let preset = preset.ok_or_else(not_found)?;

    if let Some(required) = preset.spec.required_email_domain.as_deref()
        && !email_domain(email).is_some_and(|domain| domain.eq_ignore_ascii_case(required))
    {
        debug!(preset = %preset_name, email = %email, "Preset scoped to another email domain");
        return Err(not_found());
    }

    preset.spec.credentials_for(provider).ok_or_else(not_found)
}

/// Merge resolved credentials into the settings and require a full set.
pub fn apply(settings: &mut ClusterSettings, credentials: Option<&ProviderCredentials>) -> Result<()> {
    if let Some(credentials) = credentials {
        settings
            .cloud
            .provider
            .apply_credentials(credentials)
            .map_err(|kind| {
                AdmissionError::Internal(format!(
                    "preset credentials for {} applied to a {} cluster",
                    kind,
                    settings.cloud.provider.kind()
                ))
            })?;
    }

    let missing = settings.cloud.provider.missing_credentials();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AdmissionError::missing_field(missing.join(", ")))
    }
}
