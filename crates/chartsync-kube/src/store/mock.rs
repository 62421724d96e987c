//! Mock release store for testing
//!
//! Keeps releases in memory, in insertion order, so the release manager can
//! be exercised without a release server.

use async_trait::async_trait;
use chartsync_core::{ReleaseRecord, StatusCode};
use chrono::Utc;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use super::{
    InstallRequest, ReleaseStore, StoreError, StoreOperation, StoreResult, UpgradeRequest,
};

/// In-memory release store for testing
#[derive(Clone, Default)]
pub struct MockReleaseStore {
    /// Storage: release name -> record, in insertion order
    releases: Arc<RwLock<IndexMap<String, ReleaseRecord>>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
    /// Operations that fail with a backend error
    failures: Arc<RwLock<HashSet<StoreOperation>>>,
    /// Manifest returned for installs and upgrades
    manifest: Arc<RwLock<Option<String>>>,
    /// Requests received, newest last
    installs: Arc<RwLock<Vec<InstallRequest>>>,
    upgrades: Arc<RwLock<Vec<UpgradeRequest>>>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub installs: usize,
    pub updates: usize,
    pub deletes: usize,
    pub statuses: usize,
    pub contents: usize,
    pub lists: usize,
}

impl OperationCounts {
    /// Number of calls that could have changed the store
    pub fn mutations(&self) -> usize {
        self.installs + self.updates + self.deletes
    }

    /// Total number of calls
    pub fn total(&self) -> usize {
        self.mutations() + self.statuses + self.contents + self.lists
    }
}

impl MockReleaseStore {
    /// Create a new empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated releases
    pub fn with_releases(releases: Vec<ReleaseRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.releases.write().unwrap_or_else(PoisonError::into_inner);
            for release in releases {
                map.insert(release.name.clone(), release);
            }
        }
        store
    }

    /// Make every future call of `operation` fail
    pub fn fail_on(&self, operation: StoreOperation) {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
    }

    /// Set the manifest returned by installs and upgrades
    pub fn set_manifest(&self, manifest: impl Into<String>) {
        *self.manifest.write().unwrap_or_else(PoisonError::into_inner) = Some(manifest.into());
    }

    /// Force the status of a stored release
    pub fn set_status(&self, name: &str, status: StatusCode) {
        let mut map = self.releases.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(release) = map.get_mut(name) {
            release.status = status;
        }
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get a stored release without counting it as an operation
    pub fn release(&self, name: &str) -> Option<ReleaseRecord> {
        self.releases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Count stored releases
    pub fn release_count(&self) -> usize {
        self.releases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Last install request received
    pub fn last_install(&self) -> Option<InstallRequest> {
        self.installs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Last upgrade request received
    pub fn last_upgrade(&self) -> Option<UpgradeRequest> {
        self.upgrades
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn record(&self, operation: StoreOperation) -> StoreResult<()> {
        {
            let mut ops = self.operations.write().unwrap_or_else(PoisonError::into_inner);
            match operation {
                StoreOperation::Install => ops.installs += 1,
                StoreOperation::Update => ops.updates += 1,
                StoreOperation::Delete => ops.deletes += 1,
                StoreOperation::Status => ops.statuses += 1,
                StoreOperation::Content => ops.contents += 1,
                StoreOperation::List => ops.lists += 1,
            }
        }

        let failures = self.failures.read().unwrap_or_else(PoisonError::into_inner);
        if failures.contains(&operation) {
            return Err(StoreError::Backend(format!(
                "injected {} failure",
                operation
            )));
        }
        Ok(())
    }

    fn manifest_for(&self, name: &str, namespace: &str) -> String {
        self.manifest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| {
                format!(
                    "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {}\n  namespace: {}\n",
                    name, namespace
                )
            })
    }

    fn not_found(name: &str) -> StoreError {
        StoreError::NotFound {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl ReleaseStore for MockReleaseStore {
    async fn install_release(&self, request: &InstallRequest) -> StoreResult<ReleaseRecord> {
        self.record(StoreOperation::Install)?;
        self.installs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let manifest = self.manifest_for(&request.name, &request.namespace);
        let mut map = self.releases.write().unwrap_or_else(PoisonError::into_inner);

        let version = match map.get(&request.name) {
            Some(existing)
                if request.reuse_name
                    && matches!(existing.status, StatusCode::Deleted | StatusCode::Failed) =>
            {
                existing.version + 1
            }
            Some(_) => {
                return Err(StoreError::AlreadyExists {
                    name: request.name.clone(),
                });
            }
            None => 1,
        };

        let release = ReleaseRecord {
            name: request.name.clone(),
            namespace: request.namespace.clone(),
            version,
            status: StatusCode::Deployed,
            manifest,
            last_deployed: Some(Utc::now()),
        };

        if !request.dry_run {
            map.insert(release.name.clone(), release.clone());
        }
        Ok(release)
    }

    async fn update_release(&self, request: &UpgradeRequest) -> StoreResult<ReleaseRecord> {
        self.record(StoreOperation::Update)?;
        self.upgrades
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let mut map = self.releases.write().unwrap_or_else(PoisonError::into_inner);
        let existing = map
            .get(&request.name)
            .ok_or_else(|| Self::not_found(&request.name))?;

        let release = ReleaseRecord {
            name: existing.name.clone(),
            namespace: existing.namespace.clone(),
            version: existing.version + 1,
            status: StatusCode::Deployed,
            manifest: self.manifest_for(&existing.name, &existing.namespace),
            last_deployed: Some(Utc::now()),
        };

        if !request.dry_run {
            map.insert(release.name.clone(), release.clone());
        }
        Ok(release)
    }

    async fn delete_release(&self, name: &str, purge: bool) -> StoreResult<()> {
        self.record(StoreOperation::Delete)?;

        let mut map = self.releases.write().unwrap_or_else(PoisonError::into_inner);
        if purge {
            map.shift_remove(name).ok_or_else(|| Self::not_found(name))?;
        } else {
            let release = map.get_mut(name).ok_or_else(|| Self::not_found(name))?;
            release.status = StatusCode::Deleted;
        }
        Ok(())
    }

    async fn release_status(&self, name: &str) -> StoreResult<StatusCode> {
        self.record(StoreOperation::Status)?;

        let map = self.releases.read().unwrap_or_else(PoisonError::into_inner);
        map.get(name)
            .map(|release| release.status)
            .ok_or_else(|| Self::not_found(name))
    }

    async fn release_content(&self, name: &str) -> StoreResult<ReleaseRecord> {
        self.record(StoreOperation::Content)?;

        let map = self.releases.read().unwrap_or_else(PoisonError::into_inner);
        map.get(name).cloned().ok_or_else(|| Self::not_found(name))
    }

    async fn list_releases(&self) -> StoreResult<Vec<ReleaseRecord>> {
        self.record(StoreOperation::List)?;

        let map = self.releases.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn install_request(name: &str, namespace: &str) -> InstallRequest {
        InstallRequest {
            chart_dir: PathBuf::from("/charts/app"),
            namespace: namespace.to_string(),
            values: String::new(),
            name: name.to_string(),
            dry_run: false,
            reuse_name: false,
        }
    }

    #[tokio::test]
    async fn test_mock_install_and_content() {
        let store = MockReleaseStore::new();

        let created = store
            .install_release(&install_request("myapp", "default"))
            .await
            .unwrap();
        assert_eq!(created.version, 1);
        assert_eq!(created.status, StatusCode::Deployed);

        let retrieved = store.release_content("myapp").await.unwrap();
        assert_eq!(retrieved, created);

        let counts = store.operation_counts();
        assert_eq!(counts.installs, 1);
        assert_eq!(counts.contents, 1);
    }

    #[tokio::test]
    async fn test_mock_install_duplicate_fails() {
        let store = MockReleaseStore::new();
        store
            .install_release(&install_request("myapp", "default"))
            .await
            .unwrap();

        let result = store
            .install_release(&install_request("myapp", "default"))
            .await;
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_mock_install_reuse_deleted_name() {
        let store = MockReleaseStore::new();
        store
            .install_release(&install_request("myapp", "default"))
            .await
            .unwrap();
        store.delete_release("myapp", false).await.unwrap();

        let mut request = install_request("myapp", "default");
        request.reuse_name = true;
        let reused = store.install_release(&request).await.unwrap();
        assert_eq!(reused.version, 2);
        assert_eq!(reused.status, StatusCode::Deployed);
    }

    #[tokio::test]
    async fn test_mock_dry_run_does_not_persist() {
        let store = MockReleaseStore::new();

        let mut request = install_request("myapp", "default");
        request.dry_run = true;
        store.install_release(&request).await.unwrap();

        assert_eq!(store.release_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_update_requires_existing() {
        let store = MockReleaseStore::new();

        let request = UpgradeRequest {
            name: "missing".to_string(),
            chart_dir: PathBuf::from("/charts/app"),
            values: String::new(),
            dry_run: false,
        };
        let result = store.update_release(&request).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_mock_purge_removes_release() {
        let store = MockReleaseStore::new();
        store
            .install_release(&install_request("myapp", "default"))
            .await
            .unwrap();

        store.delete_release("myapp", true).await.unwrap();
        assert_eq!(store.release_count(), 0);

        let result = store.release_status("myapp").await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_mock_list_preserves_insertion_order() {
        let store = MockReleaseStore::new();
        for name in ["c", "a", "b"] {
            store
                .install_release(&install_request(name, "default"))
                .await
                .unwrap();
        }

        let names: Vec<String> = store
            .list_releases()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_mock_injected_failure() {
        let store = MockReleaseStore::new();
        store.fail_on(StoreOperation::List);

        let result = store.list_releases().await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(store.operation_counts().lists, 1);
    }
}
