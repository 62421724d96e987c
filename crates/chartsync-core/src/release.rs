//! Release records as reported by the release store, and the status policy
//! applied before destructive operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a release held by the release store
///
/// Only ever produced by a store query; never cached between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    /// Release name
    pub name: String,

    /// Kubernetes namespace
    pub namespace: String,

    /// Revision number (1-indexed, increments with each upgrade)
    pub version: u32,

    /// Current status
    pub status: StatusCode,

    /// Rendered manifest (all Kubernetes resources)
    pub manifest: String,

    /// When the current revision was deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deployed: Option<DateTime<Utc>>,
}

impl ReleaseRecord {
    pub fn is_deployed(&self) -> bool {
        self.status == StatusCode::Deployed
    }
}

/// Entry of the per-namespace release listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployInfo {
    pub name: String,
}

/// Release status as reported by the release store
///
/// The store speaks numeric codes; they are only converted at the boundary
/// through [`StatusCode::from_code`] and [`StatusCode::code`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusCode {
    #[default]
    Unknown,
    Deployed,
    Deleted,
    Superseded,
    Failed,
    Deleting,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
}

impl StatusCode {
    /// Decode the store's numeric status; unrecognized codes are `Unknown`
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Deployed,
            2 => Self::Deleted,
            3 => Self::Superseded,
            4 => Self::Failed,
            5 => Self::Deleting,
            6 => Self::PendingInstall,
            7 => Self::PendingUpgrade,
            8 => Self::PendingRollback,
            _ => Self::Unknown,
        }
    }

    /// Numeric code used by the store
    pub fn code(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Deployed => 1,
            Self::Deleted => 2,
            Self::Superseded => 3,
            Self::Failed => 4,
            Self::Deleting => 5,
            Self::PendingInstall => 6,
            Self::PendingUpgrade => 7,
            Self::PendingRollback => 8,
        }
    }

    /// Check if this is a transitional state
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            Self::Deleting | Self::PendingInstall | Self::PendingUpgrade | Self::PendingRollback
        )
    }

    /// What a delete request is allowed to do for a release in this status
    pub fn delete_decision(self) -> DeleteDecision {
        match self {
            Self::Deployed | Self::Failed => DeleteDecision::Delete,
            Self::Deleted => DeleteDecision::AlreadyDeleted,
            _ => DeleteDecision::Blocked,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Deployed => "deployed",
            Self::Deleted => "deleted",
            Self::Superseded => "superseded",
            Self::Failed => "failed",
            Self::Deleting => "deleting",
            Self::PendingInstall => "pending-install",
            Self::PendingUpgrade => "pending-upgrade",
            Self::PendingRollback => "pending-rollback",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the delete policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDecision {
    /// Release is live or failed and may be purged
    Delete,

    /// Release is already gone; deleting again is a no-op
    AlreadyDeleted,

    /// Release is superseded, unknown or mid-transition; retry later
    Blocked,
}
