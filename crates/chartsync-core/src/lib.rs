//! chartsync Core - data model for reconciling desired chart releases
//!
//! This crate provides the I/O-free types shared by the release manager:
//! - `DesiredRelease`: The declared intent coming from the custom resource
//! - `ResourceId`: Stable identity used to tag objects back to their owner
//! - `Values`: Value overrides handed to the release store
//! - `ReleaseRecord` / `StatusCode`: The release store's view of a release
//! - `DeleteDecision`: The status policy applied before destructive operations

pub mod desired;
pub mod error;
pub mod release;
pub mod values;

pub use desired::{
    DEFAULT_NAMESPACE, DESIRED_RELEASE_KIND, DesiredRelease, DesiredReleaseSpec, ResourceId,
    release_name,
};
pub use error::{CoreError, Result};
pub use release::{DeleteDecision, DeployInfo, ReleaseRecord, StatusCode};
pub use values::Values;
