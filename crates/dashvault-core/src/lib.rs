//! Core domain types and traits for dashvault.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod snapshot;
pub mod traits;

pub use config::{
    BackupConfig, DashvaultConfig, LocalBackupConfig, RestoreConfig, S3BackupConfig, TargetConfig,
};
pub use dashboard::{
    slug, ArtifactBody, DashboardDefinition, DashboardMeta, DashboardSummary, Folder,
    RestorePayload, SanitizedDashboard, SubmitOutcome, ROOT_FOLDER_ID,
};
pub use error::{CoreError, CoreResult};
pub use snapshot::{artifact_file_name, SnapshotName, SnapshotPath};
pub use traits::DashboardService;
