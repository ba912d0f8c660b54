//! Local filesystem implementation of ObjectStore
//!
//! Objects are stored as files under a base directory with the key as the
//! relative path, so a snapshot is a plain directory a human can browse.

use super::{normalize_parent, ObjectMetadata, ObjectStore, PrefixMetadata};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashvault_core::{CoreError, CoreResult};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Local filesystem object store
///
/// # Example
///
/// ```rust,no_run
/// use dashvault_storage::object_store::{LocalObjectStore, ObjectStore};
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() -> dashvault_core::CoreResult<()> {
///     let store = LocalObjectStore::new("./backups").await?;
///
///     // Put nested object (creates directories automatically)
///     store.put("prod/daily/snap/home_abc.json", Bytes::from("{}")).await?;
///
///     let objects = store.list("prod/daily/snap/").await?;
///     println!("Found {} objects", objects.len());
///
///     Ok(())
/// }
/// ```
pub struct LocalObjectStore {
    base_dir: PathBuf,
}

impl LocalObjectStore {
    /// Create a new local object store
    ///
    /// Creates the base directory if it doesn't exist.
    pub async fn new(base_dir: impl AsRef<Path>) -> CoreResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Convert key to full filesystem path
    fn full_path(&self, key: &str) -> CoreResult<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(CoreError::ValidationError(format!(
                "key `{}` escapes the backup folder",
                key
            )));
        }
        Ok(self.base_dir.join(relative))
    }

    /// Strip base directory from path to get a `/`-separated key
    fn path_to_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_dir).ok()?;
        let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
        parts.map(|p| p.join("/"))
    }

    /// Recursively list all files under a directory
    fn list_recursive<'a>(
        &'a self,
        dir: &'a Path,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = CoreResult<Vec<PathBuf>>> + Send + 'a>>
    {
        Box::pin(async move {
            let mut results = Vec::new();

            let mut read_dir = tokio::fs::read_dir(dir).await?;
            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;

                if metadata.is_file() {
                    results.push(path);
                } else if metadata.is_dir() {
                    let mut sub_results = self.list_recursive(&path).await?;
                    results.append(&mut sub_results);
                }
            }

            Ok(results)
        })
    }
}

fn to_utc(modified: std::io::Result<SystemTime>) -> DateTime<Utc> {
    modified.map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> CoreResult<()> {
        if key.is_empty() {
            return Err(CoreError::ValidationError(
                "Key cannot be empty".to_string(),
            ));
        }

        let path = self.full_path(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, &data).await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> CoreResult<Bytes> {
        let path = self.full_path(key)?;

        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::not_found("object", key)
            } else {
                CoreError::from(e)
            }
        })?;

        Ok(Bytes::from(data))
    }

    async fn list(&self, prefix: &str) -> CoreResult<Vec<ObjectMetadata>> {
        let prefix_path = self.full_path(prefix)?;

        if !tokio::fs::try_exists(&prefix_path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let metadata_check = tokio::fs::metadata(&prefix_path).await?;

        let files = if metadata_check.is_file() {
            vec![prefix_path]
        } else if metadata_check.is_dir() {
            self.list_recursive(&prefix_path).await?
        } else {
            vec![]
        };

        let mut results = Vec::new();
        for path in files {
            if let Ok(metadata) = tokio::fs::metadata(&path).await {
                if let Some(key) = self.path_to_key(&path) {
                    results.push(ObjectMetadata {
                        key,
                        size_bytes: metadata.len(),
                        last_modified: to_utc(metadata.modified()),
                    });
                }
            }
        }
        results.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(results)
    }

    async fn list_prefixes(&self, parent: &str) -> CoreResult<Vec<PrefixMetadata>> {
        let parent_path = self.full_path(&normalize_parent(parent))?;

        if !tokio::fs::try_exists(&parent_path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&parent_path).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                results.push(PrefixMetadata {
                    name: name.to_string(),
                    last_modified: to_utc(metadata.modified()),
                });
            }
        }
        results.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(results)
    }
}
