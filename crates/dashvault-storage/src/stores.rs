//! The set of enabled artifact stores for one run.
//!
//! Writes fan out to every store independently. Reads come from exactly one
//! store: local when it is enabled, otherwise S3.

use bytes::Bytes;
use dashvault_core::{BackupConfig, CoreResult};
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::object_store::{LocalObjectStore, ObjectStore, S3Config, S3ObjectStore};

/// Which backend a store is. Ordering is read precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreKind {
    Local,
    S3,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Local => f.write_str("local"),
            StoreKind::S3 => f.write_str("s3"),
        }
    }
}

/// Result of writing one artifact to one store.
#[derive(Debug)]
pub struct WriteOutcome {
    pub kind: StoreKind,
    pub result: CoreResult<()>,
}

#[derive(Clone, Default)]
pub struct ArtifactStores {
    stores: Vec<(StoreKind, Arc<dyn ObjectStore>)>,
}

impl ArtifactStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a store, replacing any store of the same kind.
    pub fn with_store(mut self, kind: StoreKind, store: Arc<dyn ObjectStore>) -> Self {
        self.stores.retain(|(k, _)| *k != kind);
        self.stores.push((kind, store));
        self.stores.sort_by_key(|(k, _)| *k);
        self
    }

    /// Open every store enabled in the `backup` section.
    pub async fn from_config(config: &BackupConfig) -> CoreResult<Self> {
        let mut stores = Self::new();

        if config.local.enabled {
            let local = LocalObjectStore::new(&config.local.folder).await?;
            info!(folder = %config.local.folder.display(), "Local backup store enabled");
            stores = stores.with_store(StoreKind::Local, Arc::new(local));
        }

        if config.s3.enabled {
            let s3_config = S3Config::from_backup_config(&config.s3)?;
            info!(bucket = %s3_config.bucket, region = %s3_config.region, "S3 backup store enabled");
            let s3 = S3ObjectStore::new(s3_config).await?;
            stores = stores.with_store(StoreKind::S3, Arc::new(s3));
        }

        Ok(stores)
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn kinds(&self) -> Vec<StoreKind> {
        self.stores.iter().map(|(k, _)| *k).collect()
    }

    /// The store restores read from.
    pub fn primary(&self) -> Option<(StoreKind, &Arc<dyn ObjectStore>)> {
        self.stores.first().map(|(k, s)| (*k, s))
    }

    /// Write `data` to every store. A failure in one store does not stop
    /// the others.
    pub async fn write_all(&self, key: &str, data: Bytes) -> Vec<WriteOutcome> {
        let mut outcomes = Vec::with_capacity(self.stores.len());
        for (kind, store) in &self.stores {
            let result = store.put(key, data.clone()).await;
            outcomes.push(WriteOutcome {
                kind: *kind,
                result,
            });
        }
        outcomes
    }
}

impl fmt::Debug for ArtifactStores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactStores")
            .field("stores", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::MockObjectStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_takes_read_precedence() {
        let s3 = Arc::new(MockObjectStore::new());
        let local = Arc::new(MockObjectStore::new());

        let stores = ArtifactStores::new()
            .with_store(StoreKind::S3, s3)
            .with_store(StoreKind::Local, local);

        assert_eq!(stores.kinds(), vec![StoreKind::Local, StoreKind::S3]);
        assert_eq!(stores.primary().map(|(k, _)| k), Some(StoreKind::Local));
    }

    #[tokio::test]
    async fn test_write_all_isolates_failures() {
        let local = Arc::new(MockObjectStore::new());
        let s3 = Arc::new(MockObjectStore::new_always_fail("503 Slow Down"));

        let stores = ArtifactStores::new()
            .with_store(StoreKind::Local, local.clone())
            .with_store(StoreKind::S3, s3.clone());

        let outcomes = stores.write_all("k.json", Bytes::from("{}")).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_ok());
        assert_eq!(outcomes[1].kind, StoreKind::S3);
        assert!(outcomes[1].result.is_err());

        assert!(local.contains_key("k.json"));
        assert_eq!(s3.storage_size(), 0);
    }

    #[tokio::test]
    async fn test_from_config_local_only() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = BackupConfig::default();
        config.local.folder = temp_dir.path().join("backups");

        let stores = ArtifactStores::from_config(&config).await.unwrap();
        assert_eq!(stores.kinds(), vec![StoreKind::Local]);
        assert!(config.local.folder.exists());
    }
}
