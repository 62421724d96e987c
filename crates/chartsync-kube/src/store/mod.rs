//! Release store boundary
//!
//! The release server owns release records; this crate only talks to it
//! through [`ReleaseStore`]. Every call is a fresh round trip: nothing is
//! cached and nothing is retried here.

mod mock;

pub use mock::{MockReleaseStore, OperationCounts};

use async_trait::async_trait;
use chartsync_core::{ReleaseRecord, StatusCode};
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a release store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("release '{name}' not found")]
    NotFound { name: String },

    #[error("release '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store operations, used for error context and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Install,
    Update,
    Delete,
    Status,
    Content,
    List,
}

impl std::fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Status => write!(f, "status"),
            Self::Content => write!(f, "content"),
            Self::List => write!(f, "list"),
        }
    }
}

/// Request to create a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Chart directory on disk
    pub chart_dir: PathBuf,

    /// Target namespace
    pub namespace: String,

    /// Value overrides, as a YAML document
    pub values: String,

    /// Release name
    pub name: String,

    /// Simulate without persisting
    pub dry_run: bool,

    /// Allow reusing the name of a deleted release
    pub reuse_name: bool,
}

/// Request to update an existing release in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    /// Release name
    pub name: String,

    /// Chart directory on disk
    pub chart_dir: PathBuf,

    /// Value overrides, as a YAML document
    pub values: String,

    /// Simulate without persisting
    pub dry_run: bool,
}

/// Client for the release server
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Create a release and return the resulting record
    async fn install_release(&self, request: &InstallRequest) -> StoreResult<ReleaseRecord>;

    /// Update a release and return the new revision
    async fn update_release(&self, request: &UpgradeRequest) -> StoreResult<ReleaseRecord>;

    /// Delete a release; `purge` also drops its history
    async fn delete_release(&self, name: &str, purge: bool) -> StoreResult<()>;

    /// Current status of a release
    async fn release_status(&self, name: &str) -> StoreResult<StatusCode>;

    /// Full record of a release, manifest included
    async fn release_content(&self, name: &str) -> StoreResult<ReleaseRecord>;

    /// Every release known to the store, in store order
    async fn list_releases(&self) -> StoreResult<Vec<ReleaseRecord>>;
}
