//! Object Store abstraction for snapshot artifacts
//!
//! Provides a unified interface over the places a snapshot can live:
//! - Local filesystem (a backup folder)
//! - AWS S3 or any S3-compatible endpoint (MinIO, Wasabi, ...)
//! - In-memory mock (testing)

mod local;
mod mock;
mod s3;

pub use local::LocalObjectStore;
pub use mock::{CallHistoryEntry, MockFailure, MockObjectStore};
pub use s3::{S3Config, S3ObjectStore};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashvault_core::CoreResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Object metadata returned by list operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Object key (path)
    pub key: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Last modification timestamp
    pub last_modified: DateTime<Utc>,
}

/// A direct child "directory" of a listed prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMetadata {
    /// Child name, without the parent prefix and without a trailing slash
    pub name: String,
    /// Directory mtime (local) or newest contained object (object storage)
    pub last_modified: DateTime<Utc>,
}

/// Object Store trait - S3-like interface for cloud/local storage
///
/// All implementations must be thread-safe (Send + Sync). Keys are UTF-8
/// strings using `/` as separator regardless of platform.
///
/// # Error Handling
///
/// - `CoreError::NotFound` - Object does not exist (get)
/// - `CoreError::Store` - Backend-specific error (network, permissions, etc.)
/// - `CoreError::IoError` - I/O error (local filesystem only)
///
/// # Examples
///
/// ```rust,no_run
/// use dashvault_storage::object_store::{LocalObjectStore, ObjectStore};
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() -> dashvault_core::CoreResult<()> {
///     let store = LocalObjectStore::new("./backups").await?;
///
///     store.put("prod/daily/2024-01-01T00-00-00.000Z/home_abc.json", Bytes::from("{}")).await?;
///
///     let snapshots = store.list_prefixes("prod/daily/").await?;
///     assert_eq!(snapshots.len(), 1);
///
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Put object (overwrites if exists)
    ///
    /// # Errors
    ///
    /// - `CoreError::Store` if the operation fails
    /// - `CoreError::ValidationError` if key is empty
    async fn put(&self, key: &str, data: Bytes) -> CoreResult<()>;

    /// Get object
    ///
    /// # Errors
    ///
    /// - `CoreError::NotFound` if object does not exist
    /// - `CoreError::Store` if the operation fails
    async fn get(&self, key: &str) -> CoreResult<Bytes>;

    /// List objects with prefix, ordered by key
    ///
    /// Returns an empty list, not an error, when nothing lives under the
    /// prefix.
    async fn list(&self, prefix: &str) -> CoreResult<Vec<ObjectMetadata>>;

    /// List the direct children of `parent`, ordered by name
    async fn list_prefixes(&self, parent: &str) -> CoreResult<Vec<PrefixMetadata>>;
}

/// Normalize a parent prefix to either "" or "something/".
pub(crate) fn normalize_parent(parent: &str) -> String {
    let trimmed = parent.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// Group flat object keys into the direct children of `parent`. A child's
/// timestamp is the newest timestamp of any object beneath it. Objects
/// sitting directly in `parent` are not children and are skipped.
pub(crate) fn group_prefixes<'a>(
    parent: &str,
    objects: impl IntoIterator<Item = (&'a str, DateTime<Utc>)>,
) -> Vec<PrefixMetadata> {
    let parent = normalize_parent(parent);
    let mut children: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();

    for (key, modified) in objects {
        let Some(rest) = key.strip_prefix(parent.as_str()) else {
            continue;
        };
        let Some((child, _)) = rest.split_once('/') else {
            continue;
        };
        if child.is_empty() {
            continue;
        }
        children
            .entry(child.to_string())
            .and_modify(|latest| {
                if modified > *latest {
                    *latest = modified;
                }
            })
            .or_insert(modified);
    }

    children
        .into_iter()
        .map(|(name, last_modified)| PrefixMetadata {
            name,
            last_modified,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_normalize_parent() {
        assert_eq!(normalize_parent(""), "");
        assert_eq!(normalize_parent("/"), "");
        assert_eq!(normalize_parent("prod/daily"), "prod/daily/");
        assert_eq!(normalize_parent("prod/daily/"), "prod/daily/");
    }

    #[test]
    fn test_group_prefixes_takes_newest_object() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let t3 = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();

        let objects = vec![
            ("prod/daily/a/x.json", t1),
            ("prod/daily/a/y.json", t3),
            ("prod/daily/b/x.json", t2),
            ("prod/daily/stray.json", t3),
            ("other/daily/c/x.json", t3),
        ];

        let prefixes = group_prefixes("prod/daily", objects);
        assert_eq!(
            prefixes,
            vec![
                PrefixMetadata {
                    name: "a".to_string(),
                    last_modified: t3
                },
                PrefixMetadata {
                    name: "b".to_string(),
                    last_modified: t2
                },
            ]
        );
    }

    #[test]
    fn test_object_metadata_serialization() {
        let metadata = ObjectMetadata {
            key: "prod/daily/s/file.json".to_string(),
            size_bytes: 1024,
            last_modified: Utc::now(),
        };

        let json = serde_json::to_string(&metadata).unwrap();
        let deserialized: ObjectMetadata = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.key, metadata.key);
        assert_eq!(deserialized.size_bytes, metadata.size_bytes);
    }
}
