//! In-memory ObjectStore for testing
//!
//! Behaves like an S3 bucket (flat keys, prefix listing, newest-object
//! timestamps for prefixes) with controllable clocks and failures, so
//! orchestration can be tested without AWS, MinIO or a real filesystem.
//!
//! # Examples
//!
//! ```rust
//! use dashvault_storage::object_store::{MockObjectStore, MockFailure, ObjectStore};
//! use bytes::Bytes;
//!
//! # async fn example() -> dashvault_core::CoreResult<()> {
//! let mock = MockObjectStore::new_with_failures(vec![
//!     MockFailure::Permanent("403 Forbidden"),
//!     MockFailure::Ok,
//! ]);
//!
//! assert!(mock.put("key1", Bytes::from("data1")).await.is_err());
//! assert!(mock.put("key2", Bytes::from("data2")).await.is_ok());
//!
//! assert_eq!(mock.failed_puts(), 1);
//! assert_eq!(mock.successful_puts(), 1);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use super::{group_prefixes, normalize_parent, ObjectMetadata, ObjectStore, PrefixMetadata};
use dashvault_core::{CoreError, CoreResult};

/// Mock failure pattern.
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Transient error. Examples: 500, 503, timeout.
    Transient(&'static str),

    /// Permanent error. Examples: 403, 400.
    Permanent(&'static str),

    /// Success (no error).
    Ok,
}

impl MockFailure {
    fn to_error(&self) -> Option<CoreError> {
        match self {
            MockFailure::Transient(msg) => Some(CoreError::Store(format!("Transient: {}", msg))),
            MockFailure::Permanent(msg) => Some(CoreError::Store(format!("Permanent: {}", msg))),
            MockFailure::Ok => None,
        }
    }
}

/// Mock call history entry.
#[derive(Debug, Clone)]
pub struct CallHistoryEntry {
    /// Operation type: "put", "get", "list", "list_prefixes".
    pub operation: String,

    /// Object key or prefix.
    pub key: String,

    /// Whether operation succeeded.
    pub success: bool,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

/// In-memory ObjectStore implementation for testing.
pub struct MockObjectStore {
    storage: Arc<RwLock<BTreeMap<String, StoredObject>>>,

    /// Failure pattern queue, consumed by every operation in order.
    failure_queue: Arc<RwLock<VecDeque<MockFailure>>>,

    /// Keys whose `get` always fails.
    poisoned_keys: Arc<RwLock<HashSet<String>>>,

    /// Fixed timestamp applied to puts; `None` uses the wall clock.
    clock: Arc<RwLock<Option<DateTime<Utc>>>>,

    call_history: Arc<RwLock<Vec<CallHistoryEntry>>>,
}

impl MockObjectStore {
    /// Create new mock with no failures.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(BTreeMap::new())),
            failure_queue: Arc::new(RwLock::new(VecDeque::new())),
            poisoned_keys: Arc::new(RwLock::new(HashSet::new())),
            clock: Arc::new(RwLock::new(None)),
            call_history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create mock with deterministic failure pattern.
    ///
    /// Failures are consumed in order. Once the queue is empty, all operations succeed.
    pub fn new_with_failures(pattern: Vec<MockFailure>) -> Self {
        let mock = Self::new();
        *mock.failure_queue.write() = pattern.into();
        mock
    }

    /// Create mock that always fails with given error.
    ///
    /// Pre-fills the failure queue with 1000 identical errors.
    pub fn new_always_fail(error: &'static str) -> Self {
        Self::new_with_failures(vec![MockFailure::Permanent(error); 1000])
    }

    /// Make every `get` of `key` fail with a storage error.
    pub fn poison_key(&self, key: impl Into<String>) {
        self.poisoned_keys.write().insert(key.into());
    }

    /// Pin the timestamp recorded for subsequent puts.
    pub fn set_clock(&self, at: DateTime<Utc>) {
        *self.clock.write() = Some(at);
    }

    /// Insert an object directly with an explicit timestamp, bypassing
    /// failure injection and history.
    pub fn insert_at(&self, key: impl Into<String>, data: impl Into<Bytes>, at: DateTime<Utc>) {
        self.storage.write().insert(
            key.into(),
            StoredObject {
                data: data.into(),
                last_modified: at,
            },
        );
    }

    /// Get call history for assertions.
    pub fn get_call_history(&self) -> Vec<CallHistoryEntry> {
        self.call_history.read().clone()
    }

    pub fn successful_puts(&self) -> usize {
        self.count_calls("put", true)
    }

    pub fn failed_puts(&self) -> usize {
        self.count_calls("put", false)
    }

    /// Get current storage size (number of objects).
    pub fn storage_size(&self) -> usize {
        self.storage.read().len()
    }

    /// All stored keys, ordered.
    pub fn keys(&self) -> Vec<String> {
        self.storage.read().keys().cloned().collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.storage.read().contains_key(key)
    }

    fn count_calls(&self, operation: &str, success: bool) -> usize {
        self.call_history
            .read()
            .iter()
            .filter(|entry| entry.operation == operation && entry.success == success)
            .count()
    }

    fn check_failure(&self) -> Option<CoreError> {
        self.failure_queue
            .write()
            .pop_front()
            .and_then(|failure| failure.to_error())
    }

    fn record_call(&self, operation: &str, key: &str, success: bool) {
        self.call_history.write().push(CallHistoryEntry {
            operation: operation.to_string(),
            key: key.to_string(),
            success,
        });
    }

    fn now(&self) -> DateTime<Utc> {
        let pinned = *self.clock.read();
        pinned.unwrap_or_else(Utc::now)
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> CoreResult<()> {
        if key.is_empty() {
            return Err(CoreError::ValidationError(
                "Key cannot be empty".to_string(),
            ));
        }

        if let Some(error) = self.check_failure() {
            self.record_call("put", key, false);
            return Err(error);
        }

        let last_modified = self.now();
        self.storage.write().insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified,
            },
        );
        self.record_call("put", key, true);

        Ok(())
    }

    async fn get(&self, key: &str) -> CoreResult<Bytes> {
        if let Some(error) = self.check_failure() {
            self.record_call("get", key, false);
            return Err(error);
        }

        if self.poisoned_keys.read().contains(key) {
            self.record_call("get", key, false);
            return Err(CoreError::Store(format!("Permanent: read of {} failed", key)));
        }

        let found = self.storage.read().get(key).map(|obj| obj.data.clone());
        match found {
            Some(data) => {
                self.record_call("get", key, true);
                Ok(data)
            }
            None => {
                self.record_call("get", key, false);
                Err(CoreError::not_found("object", key))
            }
        }
    }

    async fn list(&self, prefix: &str) -> CoreResult<Vec<ObjectMetadata>> {
        if let Some(error) = self.check_failure() {
            self.record_call("list", prefix, false);
            return Err(error);
        }

        let objects: Vec<ObjectMetadata> = self
            .storage
            .read()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| ObjectMetadata {
                key: k.clone(),
                size_bytes: v.data.len() as u64,
                last_modified: v.last_modified,
            })
            .collect();
        self.record_call("list", prefix, true);

        Ok(objects)
    }

    async fn list_prefixes(&self, parent: &str) -> CoreResult<Vec<PrefixMetadata>> {
        if let Some(error) = self.check_failure() {
            self.record_call("list_prefixes", parent, false);
            return Err(error);
        }

        let parent = normalize_parent(parent);
        let storage = self.storage.read();
        let prefixes = group_prefixes(
            &parent,
            storage
                .iter()
                .map(|(k, v)| (k.as_str(), v.last_modified)),
        );
        self.record_call("list_prefixes", &parent, true);

        Ok(prefixes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockObjectStore::new();

        mock.put("test-key", Bytes::from("data")).await.unwrap();
        assert_eq!(mock.storage_size(), 1);
        assert!(mock.contains_key("test-key"));

        let data = mock.get("test-key").await.unwrap();
        assert_eq!(data, Bytes::from("data"));

        assert!(matches!(
            mock.get("missing").await,
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_deterministic_failures() {
        let mock = MockObjectStore::new_with_failures(vec![
            MockFailure::Transient("500 Internal Server Error"),
            MockFailure::Permanent("403 Forbidden"),
            MockFailure::Ok,
        ]);

        let result1 = mock.put("key1", Bytes::from("data1")).await;
        assert!(result1.unwrap_err().to_string().contains("500"));

        let result2 = mock.put("key2", Bytes::from("data2")).await;
        assert!(result2.unwrap_err().to_string().contains("403"));

        assert!(mock.put("key3", Bytes::from("data3")).await.is_ok());

        assert_eq!(mock.storage_size(), 1);
        assert_eq!(mock.failed_puts(), 2);
        assert_eq!(mock.successful_puts(), 1);
    }

    #[tokio::test]
    async fn test_mock_poisoned_key() {
        let mock = MockObjectStore::new();
        mock.put("a", Bytes::from("1")).await.unwrap();
        mock.poison_key("a");

        assert!(matches!(mock.get("a").await, Err(CoreError::Store(_))));
    }

    #[tokio::test]
    async fn test_mock_list_prefixes_uses_clock() {
        let mock = MockObjectStore::new();
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();

        mock.set_clock(t2);
        mock.put("prod/daily/a/x.json", Bytes::from("1")).await.unwrap();
        mock.set_clock(t1);
        mock.put("prod/daily/b/x.json", Bytes::from("1")).await.unwrap();

        let prefixes = mock.list_prefixes("prod/daily").await.unwrap();
        assert_eq!(prefixes.len(), 2);
        assert_eq!(prefixes[0].name, "a");
        assert_eq!(prefixes[0].last_modified, t2);
        assert_eq!(prefixes[1].last_modified, t1);

        let history = mock.get_call_history();
        assert_eq!(history.last().unwrap().operation, "list_prefixes");
    }
}
