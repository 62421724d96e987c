//! Release manager configuration
//!
//! Usually embedded in the operator's configuration file:
//!
//! ```yaml
//! chartsPath: charts
//! annotationTimeout: 20s
//! kubectl: kubectl
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::{ReleaseError, Result};
use crate::tagger::DEFAULT_TAG_TIMEOUT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseConfig {
    /// Sub-path inside the chart repository checkout holding the charts
    #[serde(default)]
    pub charts_path: PathBuf,

    /// Upper bound for tagging the resources of one release
    #[serde(default = "default_annotation_timeout", with = "humantime_serde")]
    pub annotation_timeout: Duration,

    /// Binary used to tag resources
    #[serde(default = "default_kubectl")]
    pub kubectl: String,
}

fn default_annotation_timeout() -> Duration {
    DEFAULT_TAG_TIMEOUT
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            charts_path: PathBuf::new(),
            annotation_timeout: default_annotation_timeout(),
            kubectl: default_kubectl(),
        }
    }
}

impl ReleaseConfig {
    /// Set the charts sub-path
    pub fn with_charts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.charts_path = path.into();
        self
    }

    /// Parse configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| ReleaseError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReleaseError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.charts_path.is_absolute() {
            return Err(ReleaseError::InvalidConfig(format!(
                "chartsPath must be relative to the chart repository, got {}",
                self.charts_path.display()
            )));
        }
        if self.annotation_timeout.is_zero() {
            return Err(ReleaseError::InvalidConfig(
                "annotationTimeout must be greater than zero".to_string(),
            ));
        }
        if self.kubectl.trim().is_empty() {
            return Err(ReleaseError::InvalidConfig(
                "kubectl must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory of a chart: `<chart root>/<chartsPath>/<chart path>`
    ///
    /// Joined lexically: a leading `/` on either part never replaces the
    /// chart root.
    pub fn chart_dir(&self, chart_root: &Path, chart_path: &str) -> PathBuf {
        let mut dir = chart_root.to_path_buf();
        for part in [self.charts_path.as_path(), Path::new(chart_path)] {
            dir.extend(
                part.components()
                    .filter(|c| matches!(c, Component::Normal(_) | Component::ParentDir)),
            );
        }
        dir
    }
}

/// Whether a chart path stays inside the chart root once joined to it
pub fn is_contained_chart_path(chart_path: &str) -> bool {
    Path::new(chart_path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
