//! Error types for chartsync-kube

use chartsync_core::StatusCode;
use thiserror::Error;

use crate::store::{StoreError, StoreOperation};
use crate::tagger::TagError;

/// Result type for chartsync-kube operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Errors returned by release lifecycle operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReleaseError {
    /// The desired release does not say which chart to deploy
    #[error("chart deploy configuration ({resource}) has empty chart git path")]
    ChartPathMissing { resource: String },

    /// The chart path would leave the chart repository checkout
    #[error("chart deploy configuration ({resource}) has chart git path '{path}' outside the chart repository")]
    ChartPathInvalid { resource: String, path: String },

    /// Action string is neither CREATE nor UPDATE
    #[error("valid install options: CREATE, UPDATE. provided: {provided}")]
    InvalidAction { provided: String },

    /// Value overrides could not be rendered for the store
    #[error("problem with supplied values for release '{release}': {message}")]
    Values { release: String, message: String },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Release store call failed
    #[error("{operation} failed for release '{release}': {source}")]
    Store {
        operation: StoreOperation,
        release: String,
        #[source]
        source: StoreError,
    },

    /// Release is in a status that does not allow deletion (yet)
    #[error("release '{name}' with status {status} cannot be deleted")]
    NotDeletable { name: String, status: StatusCode },

    /// Resources of an applied release could not be tagged
    #[error("failed to annotate resources of release '{release}': {source}")]
    Annotation {
        release: String,
        #[source]
        source: TagError,
    },
}

impl ReleaseError {
    pub(crate) fn store(operation: StoreOperation, release: &str) -> impl FnOnce(StoreError) -> Self {
        let release = release.to_string();
        move |source| ReleaseError::Store {
            operation,
            release,
            source,
        }
    }

    /// Errors the caller has to fix in the desired release or configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ReleaseError::ChartPathMissing { .. }
                | ReleaseError::ChartPathInvalid { .. }
                | ReleaseError::InvalidAction { .. }
                | ReleaseError::Values { .. }
                | ReleaseError::InvalidConfig(_)
        )
    }

    /// Errors that may go away if the same call is made again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReleaseError::Store { .. }
                | ReleaseError::NotDeletable { .. }
                | ReleaseError::Annotation { .. }
        )
    }

    /// Check if the release store reported the release as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReleaseError::Store { source, .. } if source.is_not_found())
    }
}
