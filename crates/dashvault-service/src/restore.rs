//! Restore: re-create the dashboards of one snapshot on the target.
//!
//! Each artifact moves through `Loaded -> FolderResolved -> Sanitized ->
//! Submitted`. A failure ends that artifact only; the run moves on to the
//! next one.

use chrono::{DateTime, Utc};
use dashvault_core::{
    ArtifactBody, CoreError, CoreResult, DashboardMeta, DashboardService, RestoreConfig,
    SnapshotPath, SubmitOutcome, ROOT_FOLDER_ID,
};
use dashvault_storage::{ArtifactStores, ObjectStore};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::snapshot::SnapshotSelector;

/// Per-artifact restore state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArtifactState {
    Loaded,
    FolderResolved,
    Sanitized,
    Submitted,
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactState::Loaded => "loaded",
            ArtifactState::FolderResolved => "folder-resolved",
            ArtifactState::Sanitized => "sanitized",
            ArtifactState::Submitted => "submitted",
        };
        f.write_str(name)
    }
}

/// An artifact that did not make it to `Submitted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreFailure {
    pub key: String,
    /// The state the artifact never reached.
    pub failed_at: ArtifactState,
    pub error: String,
}

/// Outcome of one restore run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub snapshot: String,
    pub restored: usize,
    pub failed: usize,
    pub failures: Vec<RestoreFailure>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Original folder id -> folder id on the restore target. Lives for one run
/// so a folder missing on the target is created once, however many
/// dashboards point at it.
type FolderCache = HashMap<i64, i64>;

pub struct RestoreOrchestrator {
    service: Arc<dyn DashboardService>,
    stores: ArtifactStores,
    config: RestoreConfig,
}

impl RestoreOrchestrator {
    pub fn new(
        service: Arc<dyn DashboardService>,
        stores: ArtifactStores,
        config: RestoreConfig,
    ) -> Self {
        Self {
            service,
            stores,
            config,
        }
    }

    /// Restore `requested`, or the most recent snapshot of `target`.
    pub async fn run(&self, target: &str, requested: Option<&str>) -> CoreResult<RestoreReport> {
        self.run_at(target, requested, Utc::now()).await
    }

    /// Same as [`run`](Self::run); `at` is stamped into each restore message.
    pub async fn run_at(
        &self,
        target: &str,
        requested: Option<&str>,
        at: DateTime<Utc>,
    ) -> CoreResult<RestoreReport> {
        let (kind, store) = self.stores.primary().ok_or_else(|| {
            CoreError::ValidationError("no artifact store is enabled".to_string())
        })?;

        let selector = SnapshotSelector::new(store.clone());
        let snapshot = match selector.resolve(target, requested).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(target = %target, store = %kind, error = %e, "Cannot select a snapshot to restore");
                return Err(e);
            }
        };

        let keys: Vec<String> = store
            .list(&snapshot.prefix())
            .await?
            .into_iter()
            .map(|o| o.key)
            .filter(|k| k.ends_with(".json"))
            .collect();

        let mut report = RestoreReport {
            snapshot: snapshot.prefix(),
            ..RestoreReport::default()
        };

        if keys.is_empty() {
            let empty = CoreError::EmptySnapshot {
                snapshot: snapshot.prefix(),
            };
            warn!(store = %kind, error = %empty, "Nothing to restore");
            return Ok(report);
        }

        info!(
            snapshot = %snapshot,
            store = %kind,
            artifacts = keys.len(),
            overwrite = self.config.overwrite,
            "Starting restore"
        );

        let mut folders = FolderCache::new();
        for key in &keys {
            match self
                .restore_artifact(store.as_ref(), key, &mut folders, at)
                .await
            {
                Ok(()) => {
                    info!(key = %key, "Restored dashboard");
                    report.restored += 1;
                }
                Err((failed_at, e)) => {
                    error!(key = %key, failed_at = %failed_at, error = %e, "Failed to restore dashboard");
                    report.failed += 1;
                    report.failures.push(RestoreFailure {
                        key: key.clone(),
                        failed_at,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            snapshot = %snapshot,
            restored = report.restored,
            failed = report.failed,
            "Restore finished"
        );
        Ok(report)
    }

    async fn restore_artifact(
        &self,
        store: &dyn ObjectStore,
        key: &str,
        folders: &mut FolderCache,
        at: DateTime<Utc>,
    ) -> Result<(), (ArtifactState, CoreError)> {
        let fail = |state: ArtifactState| move |e: CoreError| (state, e);

        let bytes = store.get(key).await.map_err(fail(ArtifactState::Loaded))?;
        let artifact = ArtifactBody::from_slice(key, &bytes).map_err(fail(ArtifactState::Loaded))?;

        let folder_id = self
            .resolve_folder(key, &artifact.meta, folders)
            .await
            .map_err(fail(ArtifactState::FolderResolved))?;

        let file_name = key.rsplit('/').next().unwrap_or(key);
        let message = format!(
            "Restored the dashboard with backup file {} at {}",
            file_name,
            at.to_rfc3339()
        );
        let payload = artifact.into_restore_payload(folder_id, message, self.config.overwrite);

        match self
            .service
            .submit_dashboard(&payload)
            .await
            .map_err(fail(ArtifactState::Submitted))?
        {
            SubmitOutcome::Success => Ok(()),
            SubmitOutcome::Failure { status, message } => Err((
                ArtifactState::Submitted,
                CoreError::Service { status, message },
            )),
        }
    }

    async fn resolve_folder(
        &self,
        key: &str,
        meta: &DashboardMeta,
        folders: &mut FolderCache,
    ) -> CoreResult<i64> {
        if meta.in_root_folder() {
            return Ok(ROOT_FOLDER_ID);
        }
        if let Some(resolved) = folders.get(&meta.folder_id) {
            return Ok(*resolved);
        }

        let resolved = match self.service.find_folder(meta.folder_id).await? {
            Some(folder) => folder.id,
            None => {
                let title = meta
                    .folder_title
                    .as_deref()
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| {
                        CoreError::malformed(key, "meta.folderTitle is missing for a non-root folder")
                    })?;
                match self.service.find_folder_by_title(title).await? {
                    Some(folder) => {
                        info!(
                            original_id = meta.folder_id,
                            new_id = folder.id,
                            title = %folder.title,
                            "Reusing folder with the same title"
                        );
                        folder.id
                    }
                    None => {
                        let folder = self.service.create_folder(title).await?;
                        info!(
                            original_id = meta.folder_id,
                            new_id = folder.id,
                            title = %folder.title,
                            "Created missing folder"
                        );
                        folder.id
                    }
                }
            }
        };

        folders.insert(meta.folder_id, resolved);
        Ok(resolved)
    }
}
