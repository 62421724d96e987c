//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid values: {message}")]
    InvalidValues { message: String },

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid resource id '{id}': expected <namespace>:<kind>/<name>")]
    InvalidResourceId { id: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
