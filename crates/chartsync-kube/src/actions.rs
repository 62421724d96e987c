//! Release actions and their options

use std::str::FromStr;

use crate::error::ReleaseError;

/// What to do with a desired release that has a chart to deploy
///
/// Deletion is a separate operation, never an `Action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Create a new release (`CREATE`)
    Install,

    /// Update an existing release in place (`UPDATE`)
    Upgrade,
}

impl Action {
    /// Wire form used by the reconciler
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Install => "CREATE",
            Self::Upgrade => "UPDATE",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Action {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Install),
            "UPDATE" => Ok(Self::Upgrade),
            _ => Err(ReleaseError::InvalidAction {
                provided: s.to_string(),
            }),
        }
    }
}

/// Options for install and upgrade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Dry run mode (simulate without persisting)
    pub dry_run: bool,

    /// Allow a new install to reuse the name of a deleted release
    pub reuse_name: bool,
}

impl InstallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable dry-run mode
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Enable name reuse
    pub fn reuse_name(mut self) -> Self {
        self.reuse_name = true;
        self
    }
}
