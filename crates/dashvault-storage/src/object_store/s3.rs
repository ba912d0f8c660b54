//! AWS S3 implementation of ObjectStore
//!
//! Supports standard AWS S3 and S3-compatible endpoints (MinIO, Wasabi, etc.).

use super::{group_prefixes, normalize_parent, ObjectMetadata, ObjectStore, PrefixMetadata};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{config::Credentials, primitives::ByteStream, Client, Config};
use bytes::Bytes;
use chrono::Utc;
use dashvault_core::{CoreError, CoreResult, S3BackupConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// S3 configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region (e.g., "us-west-2")
    pub region: String,
    /// Optional custom endpoint URL (for MinIO compatibility)
    pub endpoint: Option<String>,
    /// Optional access key (for custom S3 endpoints)
    pub access_key: Option<String>,
    /// Optional secret key (for custom S3 endpoints)
    pub secret_key: Option<String>,
    /// Optional key prefix (all keys will be prefixed with this)
    pub prefix: Option<String>,
}

impl S3Config {
    /// Create config for standard AWS S3 (uses environment/IAM credentials)
    pub fn aws(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            prefix: None,
        }
    }

    /// Set optional key prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Build from the `backup.s3` section of the configuration
    pub fn from_backup_config(config: &S3BackupConfig) -> CoreResult<Self> {
        let bucket = config
            .bucket
            .clone()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| {
                CoreError::ValidationError("backup.s3.bucket must be set".to_string())
            })?;

        Ok(Self {
            bucket,
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
            prefix: config.prefix.clone(),
        })
    }
}

/// AWS S3 object store
///
/// ```rust,no_run
/// use dashvault_storage::object_store::{S3Config, S3ObjectStore, ObjectStore};
///
/// #[tokio::main]
/// async fn main() -> dashvault_core::CoreResult<()> {
///     let config = S3Config::aws("dashboard-backups", "us-west-2").with_prefix("grafana");
///     let store = S3ObjectStore::new(config).await?;
///
///     let snapshots = store.list_prefixes("prod/daily/").await?;
///     println!("{} snapshots", snapshots.len());
///     Ok(())
/// }
/// ```
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3ObjectStore {
    /// Create a new S3 object store
    pub async fn new(config: S3Config) -> CoreResult<Self> {
        let client = if let (Some(endpoint), Some(access), Some(secret)) =
            (&config.endpoint, &config.access_key, &config.secret_key)
        {
            // MinIO or custom S3-compatible endpoint
            let creds = Credentials::new(access, secret, None, None, "dashvault-static");

            let s3_config = Config::builder()
                .endpoint_url(endpoint)
                .credentials_provider(creds)
                .region(aws_sdk_s3::config::Region::new(config.region.clone()))
                .force_path_style(true) // Required for MinIO
                .behavior_version(BehaviorVersion::latest())
                .build();

            Client::from_conf(s3_config)
        } else {
            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .region(aws_config::Region::new(config.region.clone()));
            if let Some(endpoint) = &config.endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            let aws_config = loader.load().await;

            Client::new(&aws_config)
        };

        Ok(Self {
            client,
            bucket: config.bucket,
            prefix: config.prefix,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Apply prefix to key if configured
    fn full_key(&self, key: &str) -> String {
        match self.prefix.as_deref().map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, key),
            _ => key.to_string(),
        }
    }

    /// Strip prefix from key if configured
    fn strip_prefix(&self, key: &str) -> String {
        match self.prefix.as_deref().map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => {
                let prefix_with_slash = format!("{}/", prefix);
                key.strip_prefix(&prefix_with_slash)
                    .unwrap_or(key)
                    .to_string()
            }
            _ => key.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> CoreResult<()> {
        if key.is_empty() {
            return Err(CoreError::ValidationError(
                "Key cannot be empty".to_string(),
            ));
        }

        let full_key = self.full_key(key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .content_type("application/json")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| CoreError::Store(format!("S3 put failed: {}", e)))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> CoreResult<Bytes> {
        let full_key = self.full_key(key);

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("NoSuchKey") || err_str.contains("404") {
                    CoreError::not_found("object", key)
                } else {
                    CoreError::Store(format!("S3 get failed: {}", e))
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| CoreError::Store(format!("S3 read failed: {}", e)))?
            .into_bytes();

        Ok(data)
    }

    async fn list(&self, prefix: &str) -> CoreResult<Vec<ObjectMetadata>> {
        let full_prefix = self.full_key(prefix);
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&full_prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| CoreError::Store(format!("S3 list failed: {}", e)))?;

            objects.extend(resp.contents().iter().filter_map(|obj| {
                let key = obj.key()?;
                let modified = obj.last_modified()?;

                let last_modified =
                    chrono::DateTime::from_timestamp(modified.secs(), modified.subsec_nanos())
                        .unwrap_or_else(Utc::now);

                Some(ObjectMetadata {
                    key: self.strip_prefix(key),
                    size_bytes: obj.size().unwrap_or(0) as u64,
                    last_modified,
                })
            }));

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(bucket = %self.bucket, prefix = %full_prefix, count = objects.len(), "S3 list");
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn list_prefixes(&self, parent: &str) -> CoreResult<Vec<PrefixMetadata>> {
        let parent = normalize_parent(parent);
        let objects = self.list(&parent).await?;
        Ok(group_prefixes(
            &parent,
            objects.iter().map(|o| (o.key.as_str(), o.last_modified)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_prefix(prefix: Option<&str>) -> S3ObjectStore {
        S3ObjectStore {
            client: Client::from_conf(
                Config::builder()
                    .region(aws_sdk_s3::config::Region::new("us-east-1"))
                    .behavior_version(BehaviorVersion::latest())
                    .build(),
            ),
            bucket: "bucket".to_string(),
            prefix: prefix.map(str::to_string),
        }
    }

    #[test]
    fn test_s3_config_aws() {
        let config = S3Config::aws("my-bucket", "us-west-2");
        assert_eq!(config.bucket, "my-bucket");
        assert_eq!(config.region, "us-west-2");
        assert!(config.endpoint.is_none());
        assert!(config.access_key.is_none());
    }

    #[test]
    fn test_s3_config_from_backup_config() {
        let mut backup = S3BackupConfig {
            enabled: true,
            bucket: Some("dash".to_string()),
            endpoint: Some("http://localhost:9000".to_string()),
            ..S3BackupConfig::default()
        };

        let config = S3Config::from_backup_config(&backup).unwrap();
        assert_eq!(config.bucket, "dash");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));

        backup.bucket = None;
        assert!(S3Config::from_backup_config(&backup).is_err());
    }

    #[test]
    fn test_s3_full_key() {
        let store = store_with_prefix(Some("grafana/"));
        assert_eq!(store.full_key("prod/daily/"), "grafana/prod/daily/");

        let store = store_with_prefix(None);
        assert_eq!(store.full_key("prod/daily/"), "prod/daily/");
    }

    #[test]
    fn test_s3_strip_prefix() {
        let store = store_with_prefix(Some("grafana"));
        assert_eq!(store.strip_prefix("grafana/prod/a.json"), "prod/a.json");
        assert_eq!(store.strip_prefix("other/a.json"), "other/a.json");
    }
}
