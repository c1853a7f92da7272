//! Kubernetes semantic versions.
//!
//! Control-plane and kubelet versions are plain `major.minor.patch` triples.
//! Ordering and parsing come from the `semver` crate; this wrapper adds the
//! optional `v` prefix Kubernetes tooling tends to emit and the minor-skew
//! distance used by the compatibility checker.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use schemars::SchemaGenerator;
use schemars::Schema;
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when a version string cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version {input:?}: {reason}")]
pub struct VersionError {
    pub input: String,
    pub reason: String,
}

/// A comparable Kubernetes version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KubernetesVersion(Version);

impl KubernetesVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
        Version::parse(bare).map(Self).map_err(|e| VersionError {
            input: input.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    /// Minor-version distance `self.minor - other.minor`.
    ///
    /// Returns `None` when the majors differ; cross-major pairs are never
    /// compatible.
    pub fn skew(&self, other: &KubernetesVersion) -> Option<i64> {
        if self.0.major != other.0.major {
            return None;
        }
        let own = i64::try_from(self.0.minor).ok()?;
        let theirs = i64::try_from(other.0.minor).ok()?;
        Some(own - theirs)
    }
}

impl fmt::Display for KubernetesVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for KubernetesVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for KubernetesVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KubernetesVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for KubernetesVersion {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "KubernetesVersion".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        String::json_schema(generator)
    }
}

/// Deserialize an optional version where an empty string means "not set".
///
/// Request bodies carry `"version": ""` when the user left the field blank;
/// that must surface as a missing version, not as a parse failure.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<KubernetesVersion>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => KubernetesVersion::parse(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
