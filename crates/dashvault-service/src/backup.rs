//! Backup: fetch every dashboard of a target into a new snapshot.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashvault_core::{
    CoreError, CoreResult, DashboardService, DashboardSummary, SnapshotName, SnapshotPath,
};
use dashvault_storage::ArtifactStores;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of one backup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackupReport {
    /// Snapshot prefix written to; `None` when there was nothing to back up.
    pub snapshot: Option<String>,
    /// Dashboards returned by the service.
    pub dashboards: usize,
    /// Artifacts written, counted once per store.
    pub artifacts_written: usize,
    /// Failed fetches plus failed per-store writes.
    pub failures: usize,
}

impl BackupReport {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

pub struct BackupOrchestrator {
    service: Arc<dyn DashboardService>,
    stores: ArtifactStores,
}

impl BackupOrchestrator {
    pub fn new(service: Arc<dyn DashboardService>, stores: ArtifactStores) -> Self {
        Self { service, stores }
    }

    /// Back up every dashboard of `target` into a snapshot named after now.
    pub async fn run(&self, target: &str) -> CoreResult<BackupReport> {
        self.run_at(target, Utc::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit snapshot timestamp.
    pub async fn run_at(&self, target: &str, at: DateTime<Utc>) -> CoreResult<BackupReport> {
        if self.stores.is_empty() {
            return Err(CoreError::ValidationError(
                "no artifact store is enabled".to_string(),
            ));
        }

        let dashboards = match self.service.list_dashboards().await {
            Ok(dashboards) => dashboards,
            Err(e) => {
                error!(target = %target, error = %e, "Cannot list dashboards to back up");
                return Err(e);
            }
        };
        if dashboards.is_empty() {
            info!(target = %target, "Could not find any dashboards to back up");
            return Ok(BackupReport::default());
        }

        let snapshot = SnapshotPath::new(target, SnapshotName::from_datetime(at));
        info!(
            target = %target,
            snapshot = %snapshot,
            dashboards = dashboards.len(),
            stores = ?self.stores.kinds(),
            "Starting backup"
        );

        let mut report = BackupReport {
            snapshot: Some(snapshot.prefix()),
            dashboards: dashboards.len(),
            ..BackupReport::default()
        };

        for dashboard in &dashboards {
            self.backup_one(&snapshot, dashboard, &mut report).await;
        }

        info!(
            snapshot = %snapshot,
            written = report.artifacts_written,
            failures = report.failures,
            "Backup finished"
        );
        Ok(report)
    }

    async fn backup_one(
        &self,
        snapshot: &SnapshotPath,
        dashboard: &DashboardSummary,
        report: &mut BackupReport,
    ) {
        let document = match self.service.fetch_dashboard(&dashboard.uid).await {
            Ok(document) => document,
            Err(e) => {
                warn!(uid = %dashboard.uid, title = %dashboard.title, error = %e, "Skipping dashboard, fetch failed");
                report.failures += 1;
                return;
            }
        };

        let data = match serde_json::to_vec_pretty(&document) {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                warn!(uid = %dashboard.uid, error = %e, "Skipping dashboard, could not serialize");
                report.failures += 1;
                return;
            }
        };

        let key = snapshot.artifact_key(&dashboard.title, &dashboard.uid);
        for outcome in self.stores.write_all(&key, data).await {
            match outcome.result {
                Ok(()) => report.artifacts_written += 1,
                Err(e) => {
                    error!(store = %outcome.kind, key = %key, error = %e, "Failed to store artifact");
                    report.failures += 1;
                }
            }
        }
    }
}
