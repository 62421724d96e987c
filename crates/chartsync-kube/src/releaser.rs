//! Release lifecycle: query, delete policy, install/upgrade/delete and
//! ownership tagging of the applied resources

use async_trait::async_trait;
use chartsync_core::{DeleteDecision, DeployInfo, DesiredRelease, ReleaseRecord, ResourceId};
use indexmap::IndexMap;
use std::path::Path;

use crate::actions::{Action, InstallOptions};
use crate::config::{ReleaseConfig, is_contained_chart_path};
use crate::error::{ReleaseError, Result};
use crate::store::{InstallRequest, ReleaseStore, StoreOperation, UpgradeRequest};
use crate::tagger::{ANTECEDENT_ANNOTATION, ResourceTagger, TagError};

/// Releases grouped by namespace, in store order
pub type CurrentReleases = IndexMap<String, Vec<DeployInfo>>;

/// Result of tagging the resources of an applied release
#[derive(Debug)]
pub enum Annotation {
    /// Dry run: nothing was applied, nothing was tagged
    Skipped,

    /// Every resource carries the owner annotation
    Applied,

    /// The release is applied but its resources are not (all) tagged
    Failed(TagError),
}

/// A release that was applied (or simulated), plus the tagging outcome
///
/// The two are independent: a failed annotation does not undo the release.
#[derive(Debug)]
pub struct InstallOutcome {
    pub release: ReleaseRecord,
    pub annotation: Annotation,
}

impl InstallOutcome {
    pub fn annotation_error(&self) -> Option<&TagError> {
        match &self.annotation {
            Annotation::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Collapse into a single result, failing if tagging failed
    pub fn into_result(self) -> Result<ReleaseRecord> {
        match self.annotation {
            Annotation::Failed(source) => Err(ReleaseError::Annotation {
                release: self.release.name,
                source,
            }),
            _ => Ok(self.release),
        }
    }
}

/// Operations a reconciliation loop needs from the release manager
#[async_trait]
pub trait Releaser: Send + Sync {
    /// All releases known to the store, grouped by namespace
    async fn list_current_releases(&self) -> Result<CurrentReleases>;

    /// The release if, and only if, it is currently deployed
    async fn get_deployed_release(&self, name: &str) -> Result<Option<ReleaseRecord>>;

    /// Install or upgrade the release for a desired release
    async fn install(
        &self,
        chart_root: &Path,
        release_name: &str,
        desired: &DesiredRelease,
        action: Action,
        options: &InstallOptions,
    ) -> Result<InstallOutcome>;

    /// Purge a release; deleting an already deleted release succeeds
    ///
    /// A purged release disappears from the store instead of turning
    /// `deleted`, so repeating a delete that already succeeded fails with an
    /// error whose [`ReleaseError::is_not_found`] is true. Reconcilers should
    /// treat that as already gone.
    async fn delete(&self, name: &str) -> Result<()>;
}

/// Release manager over a release store and a resource tagger
pub struct ReleaseManager<S: ReleaseStore, T: ResourceTagger> {
    store: S,
    tagger: T,
    config: ReleaseConfig,
}

impl<S: ReleaseStore, T: ResourceTagger> ReleaseManager<S, T> {
    /// Create a manager; fails if the configuration is invalid
    pub fn new(store: S, tagger: T, config: ReleaseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            tagger,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tagger(&self) -> &T {
        &self.tagger
    }

    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    // ========== Status policy ==========

    /// Whether the release may be purged right now
    ///
    /// `Ok(false)` means it is already deleted; a release in any other
    /// non-deletable status is reported as [`ReleaseError::NotDeletable`].
    pub async fn can_delete(&self, name: &str) -> Result<bool> {
        let status = self
            .store
            .release_status(name)
            .await
            .map_err(ReleaseError::store(StoreOperation::Status, name))
            .inspect_err(|e| tracing::error!(release = name, error = %e, "cannot read release status"))?;

        tracing::info!(release = name, %status, "release status");

        match status.delete_decision() {
            DeleteDecision::Delete => Ok(true),
            DeleteDecision::AlreadyDeleted => {
                tracing::info!(release = name, "release already deleted");
                Ok(false)
            }
            DeleteDecision::Blocked => {
                tracing::warn!(release = name, %status, "release cannot be deleted");
                Err(ReleaseError::NotDeletable {
                    name: name.to_string(),
                    status,
                })
            }
        }
    }

    /// Install or upgrade from the action's wire form (`CREATE` / `UPDATE`)
    ///
    /// Anything else is rejected before the store is called.
    pub async fn install_action(
        &self,
        chart_root: &Path,
        release_name: &str,
        desired: &DesiredRelease,
        action: &str,
        options: &InstallOptions,
    ) -> Result<InstallOutcome> {
        let action: Action = action.parse().inspect_err(|e| {
            tracing::error!(release = release_name, error = %e, "invalid release action")
        })?;
        Releaser::install(self, chart_root, release_name, desired, action, options).await
    }

    // ========== Annotation ==========

    /// Tag every resource of a manifest with the owner identity
    pub async fn annotate_resources(
        &self,
        manifest: &str,
        namespace: &str,
        owner: &ResourceId,
    ) -> std::result::Result<(), TagError> {
        self.tagger
            .tag(manifest, namespace, ANTECEDENT_ANNOTATION, &owner.to_string())
            .await
    }

    async fn annotate_applied(
        &self,
        release: &ReleaseRecord,
        desired: &DesiredRelease,
        options: &InstallOptions,
    ) -> Annotation {
        if options.dry_run {
            return Annotation::Skipped;
        }

        let owner = desired.resource_id();
        match self
            .annotate_resources(&release.manifest, &release.namespace, &owner)
            .await
        {
            Ok(()) => Annotation::Applied,
            Err(e) => {
                tracing::warn!(
                    release = %release.name,
                    owner = %owner,
                    error = %e,
                    "release applied but its resources could not be annotated"
                );
                Annotation::Failed(e)
            }
        }
    }
}

#[async_trait]
impl<S: ReleaseStore, T: ResourceTagger> Releaser for ReleaseManager<S, T> {
    async fn list_current_releases(&self) -> Result<CurrentReleases> {
        let releases = self
            .store
            .list_releases()
            .await
            .map_err(|source| ReleaseError::Store {
                operation: StoreOperation::List,
                release: "*".to_string(),
                source,
            })
            .inspect_err(|e| tracing::error!(error = %e, "cannot list releases"))?;

        tracing::info!(count = releases.len(), "listed chart releases");

        let mut current = CurrentReleases::new();
        for release in releases {
            current
                .entry(release.namespace)
                .or_default()
                .push(DeployInfo { name: release.name });
        }
        Ok(current)
    }

    async fn get_deployed_release(&self, name: &str) -> Result<Option<ReleaseRecord>> {
        match self.store.release_content(name).await {
            Ok(release) if release.is_deployed() => Ok(Some(release)),
            Ok(release) => {
                tracing::debug!(release = name, status = %release.status, "release not deployed");
                Ok(None)
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(ReleaseError::store(StoreOperation::Content, name)(e)),
        }
    }

    async fn install(
        &self,
        chart_root: &Path,
        release_name: &str,
        desired: &DesiredRelease,
        action: Action,
        options: &InstallOptions,
    ) -> Result<InstallOutcome> {
        tracing::info!(
            release = release_name,
            %action,
            dry_run = options.dry_run,
            reuse_name = options.reuse_name,
            "applying chart release"
        );

        let chart_path = &desired.spec.chart_git_path;
        if chart_path.is_empty() {
            let err = ReleaseError::ChartPathMissing {
                resource: desired.name.clone(),
            };
            tracing::error!(release = release_name, error = %err, "invalid desired release");
            return Err(err);
        }
        if !is_contained_chart_path(chart_path) {
            let err = ReleaseError::ChartPathInvalid {
                resource: desired.name.clone(),
                path: chart_path.clone(),
            };
            tracing::error!(release = release_name, error = %err, "invalid desired release");
            return Err(err);
        }

        let namespace = desired.resolved_namespace();
        let chart_dir = self.config.chart_dir(chart_root, chart_path);

        let values = desired.spec.values.to_yaml().map_err(|e| {
            tracing::error!(release = release_name, error = %e, "problem with supplied values");
            ReleaseError::Values {
                release: release_name.to_string(),
                message: e.to_string(),
            }
        })?;

        let release = match action {
            Action::Install => {
                let request = InstallRequest {
                    chart_dir,
                    namespace: namespace.to_string(),
                    values,
                    name: release_name.to_string(),
                    dry_run: options.dry_run,
                    reuse_name: options.reuse_name,
                };
                tracing::debug!(?request, "installing release");
                self.store
                    .install_release(&request)
                    .await
                    .map_err(ReleaseError::store(StoreOperation::Install, release_name))
                    .inspect_err(|e| tracing::error!(error = %e, "chart release failed"))?
            }
            Action::Upgrade => {
                let request = UpgradeRequest {
                    name: release_name.to_string(),
                    chart_dir,
                    values,
                    dry_run: options.dry_run,
                };
                tracing::debug!(?request, "upgrading release");
                self.store
                    .update_release(&request)
                    .await
                    .map_err(ReleaseError::store(StoreOperation::Update, release_name))
                    .inspect_err(|e| tracing::error!(error = %e, "chart upgrade failed"))?
            }
        };

        let annotation = self.annotate_applied(&release, desired, options).await;
        Ok(InstallOutcome {
            release,
            annotation,
        })
    }

    async fn delete(&self, name: &str) -> Result<()> {
        if !self.can_delete(name).await? {
            return Ok(());
        }

        self.store
            .delete_release(name, true)
            .await
            .map_err(ReleaseError::store(StoreOperation::Delete, name))
            .inspect_err(|e| tracing::error!(error = %e, "release deletion failed"))?;

        tracing::info!(release = name, "release deleted");
        Ok(())
    }
}
