//! Desired release descriptor, release naming and owner identity

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::values::Values;

/// Namespace used when the desired release does not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Kind of the custom resource that declares a desired release
pub const DESIRED_RELEASE_KIND: &str = "FluxHelmRelease";

/// The caller's declarative intent for a chart release
///
/// Mirrors the custom resource: `metadata.namespace`, `metadata.name` and the
/// `spec` block. Read-only to the release manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredRelease {
    /// Namespace of the custom resource (may be empty)
    #[serde(default)]
    pub namespace: String,

    /// Name of the custom resource
    pub name: String,

    /// Release specification
    #[serde(default)]
    pub spec: DesiredReleaseSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredReleaseSpec {
    /// Explicit release name, overriding the derived one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_name: Option<String>,

    /// Path of the chart inside the checked-out chart repository
    #[serde(default)]
    pub chart_git_path: String,

    /// Value overrides
    #[serde(default)]
    pub values: Values,
}

impl DesiredRelease {
    /// Create a desired release with an empty spec
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            spec: DesiredReleaseSpec::default(),
        }
    }

    /// Set an explicit release name
    pub fn with_release_name(mut self, release_name: impl Into<String>) -> Self {
        self.spec.release_name = Some(release_name.into());
        self
    }

    /// Set the chart path
    pub fn with_chart_path(mut self, path: impl Into<String>) -> Self {
        self.spec.chart_git_path = path.into();
        self
    }

    /// Set the value overrides
    pub fn with_values(mut self, values: Values) -> Self {
        self.spec.values = values;
        self
    }

    /// Namespace the release goes to, falling back to [`DEFAULT_NAMESPACE`]
    pub fn resolved_namespace(&self) -> &str {
        if self.namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            &self.namespace
        }
    }

    /// Release name in the release store, see [`release_name`]
    pub fn release_name(&self) -> String {
        release_name(self)
    }

    /// Identity written on every object produced by this release
    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(self.resolved_namespace(), DESIRED_RELEASE_KIND, &self.name)
    }
}

/// Derive the release name for a desired release
///
/// Returns `spec.releaseName` when set and non-empty, otherwise
/// `<namespace>-<name>` with the namespace defaulted.
pub fn release_name(desired: &DesiredRelease) -> String {
    match desired.spec.release_name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{}-{}", desired.resolved_namespace(), desired.name),
    }
}

/// Namespaced identity of a cluster resource, rendered as
/// `<namespace>:<kind>/<name>` with the kind lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub namespace: String,
    pub kind: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(namespace: &str, kind: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            kind: kind.to_lowercase(),
            name: name.to_string(),
        }
    }

    /// Whether this identity points at a desired release
    pub fn is_desired_release(&self) -> bool {
        self.kind.eq_ignore_ascii_case(DESIRED_RELEASE_KIND)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.namespace, self.kind, self.name)
    }
}

impl FromStr for ResourceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidResourceId { id: s.to_string() };

        let (namespace, rest) = s.split_once(':').ok_or_else(invalid)?;
        let (kind, name) = rest.split_once('/').ok_or_else(invalid)?;
        if namespace.is_empty() || kind.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self::new(namespace, kind, name))
    }
}
