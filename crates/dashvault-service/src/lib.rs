//! Backup and restore orchestration.

pub mod backup;
pub mod restore;
pub mod snapshot;

pub use backup::{BackupOrchestrator, BackupReport};
pub use restore::{ArtifactState, RestoreOrchestrator, RestoreReport};
pub use snapshot::{SnapshotInfo, SnapshotSelector};
