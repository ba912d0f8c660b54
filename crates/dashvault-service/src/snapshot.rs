//! Picks the snapshot a restore reads from.
//!
//! Ordering uses the modification time the store reports, never the
//! snapshot name, so snapshots written by older naming schemes still sort
//! chronologically. Equal timestamps fall back to the lexically greatest
//! name.

use chrono::{DateTime, Utc};
use dashvault_core::{CoreError, CoreResult, SnapshotName, SnapshotPath};
use dashvault_storage::{ObjectStore, PrefixMetadata};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub name: String,
    pub last_modified: DateTime<Utc>,
}

impl From<PrefixMetadata> for SnapshotInfo {
    fn from(prefix: PrefixMetadata) -> Self {
        Self {
            name: prefix.name,
            last_modified: prefix.last_modified,
        }
    }
}

/// Newest first.
fn newest_first(a: &SnapshotInfo, b: &SnapshotInfo) -> Ordering {
    b.last_modified
        .cmp(&a.last_modified)
        .then_with(|| b.name.cmp(&a.name))
}

pub struct SnapshotSelector {
    store: Arc<dyn ObjectStore>,
}

impl SnapshotSelector {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Resolve the snapshot to restore from.
    ///
    /// A requested name maps straight to its path without checking that it
    /// exists; a missing snapshot shows up later as an empty one. Without a
    /// name the newest snapshot wins, and having none at all is
    /// `CoreError::NoSnapshotsFound`.
    pub async fn resolve(&self, target: &str, requested: Option<&str>) -> CoreResult<SnapshotPath> {
        if let Some(name) = requested {
            let name = name.trim_matches('/');
            if name.is_empty() || name.contains('/') || name == "." || name == ".." {
                return Err(CoreError::ValidationError(format!(
                    "invalid snapshot name `{}`",
                    name
                )));
            }
            return Ok(SnapshotPath::new(target, SnapshotName::from(name)));
        }

        let latest = self
            .list_all(target)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NoSnapshotsFound {
                target: target.to_string(),
            })?;

        debug!(target = %target, snapshot = %latest.name, last_modified = %latest.last_modified, "Selected most recent snapshot");
        Ok(SnapshotPath::new(target, SnapshotName::from(latest.name.as_str())))
    }

    /// The `limit` most recent snapshots of `target`, newest first.
    pub async fn list_recent(&self, target: &str, limit: usize) -> CoreResult<Vec<SnapshotInfo>> {
        let mut snapshots = self.list_all(target).await?;
        snapshots.truncate(limit);
        Ok(snapshots)
    }

    async fn list_all(&self, target: &str) -> CoreResult<Vec<SnapshotInfo>> {
        let mut snapshots: Vec<SnapshotInfo> = self
            .store
            .list_prefixes(&SnapshotPath::parent_prefix(target))
            .await?
            .into_iter()
            .map(SnapshotInfo::from)
            .collect();
        snapshots.sort_by(newest_first);
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dashvault_storage::MockObjectStore;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, day, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_requested_name_is_not_validated_for_existence() {
        let selector = SnapshotSelector::new(Arc::new(MockObjectStore::new()));
        let path = selector.resolve("prod", Some("2020-01-01T00-00-00.000Z")).await.unwrap();
        assert_eq!(path.prefix(), "prod/daily/2020-01-01T00-00-00.000Z/");
    }

    #[tokio::test]
    async fn test_requested_name_must_be_single_segment() {
        let selector = SnapshotSelector::new(Arc::new(MockObjectStore::new()));
        assert!(selector.resolve("prod", Some("../other")).await.is_err());
        assert!(selector.resolve("prod", Some("")).await.is_err());
    }

    #[tokio::test]
    async fn test_no_snapshots_is_an_error() {
        let store = Arc::new(MockObjectStore::new());
        store.insert_at("staging/daily/s1/a.json", "{}", at(1));

        let selector = SnapshotSelector::new(store);
        let result = selector.resolve("prod", None).await;
        assert!(matches!(result, Err(CoreError::NoSnapshotsFound { ref target }) if target == "prod"));
    }

    #[tokio::test]
    async fn test_tie_breaks_on_greatest_name() {
        let store = Arc::new(MockObjectStore::new());
        store.insert_at("prod/daily/aaa/a.json", "{}", at(3));
        store.insert_at("prod/daily/bbb/a.json", "{}", at(3));
        store.insert_at("prod/daily/zzz/a.json", "{}", at(1));

        let selector = SnapshotSelector::new(store);
        let path = selector.resolve("prod", None).await.unwrap();
        assert_eq!(path.name.as_str(), "bbb");
    }

    #[tokio::test]
    async fn test_list_recent() {
        let store = Arc::new(MockObjectStore::new());
        for day in 1..=4 {
            store.insert_at(format!("prod/daily/s{}/a.json", day), "{}", at(day));
        }

        let selector = SnapshotSelector::new(store);
        let recent = selector.list_recent("prod", 2).await.unwrap();
        let names: Vec<&str> = recent.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["s4", "s3"]);

        assert!(selector.list_recent("nobody", 5).await.unwrap().is_empty());
    }
}
