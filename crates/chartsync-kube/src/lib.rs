//! chartsync Kube - release lifecycle management against a release server
//!
//! This crate provides:
//! - **Release Store**: The query/mutate boundary to the release server, plus an in-memory mock
//! - **Release Manager**: Install, upgrade and idempotent delete of chart releases
//! - **Status Policy**: Which release statuses allow a delete
//! - **Resource Tagging**: Owner annotations on every object a release produces
//! - **Configuration**: Chart layout and tagging settings

pub mod actions;
pub mod config;
pub mod error;
pub mod releaser;
pub mod store;
pub mod tagger;

pub use actions::{Action, InstallOptions};
pub use config::ReleaseConfig;
pub use error::{ReleaseError, Result};
pub use releaser::{Annotation, CurrentReleases, InstallOutcome, ReleaseManager, Releaser};
pub use store::{
    InstallRequest, MockReleaseStore, OperationCounts, ReleaseStore, StoreError, StoreOperation,
    StoreResult, UpgradeRequest,
};
pub use tagger::{
    ANTECEDENT_ANNOTATION, DEFAULT_TAG_TIMEOUT, KubectlTagger, MockTagger, ResourceTagger,
    TagCall, TagError,
};
