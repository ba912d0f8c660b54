//! Configuration management for dashvault
//!
//! One `DashvaultConfig` is built at process start and handed to the
//! orchestrators by reference. Sources, lowest precedence first:
//! - Hardcoded defaults
//! - ./config/dashvault.{toml,yaml,json}
//! - Config file passed on the command line or named by DASHVAULT_CONFIG
//! - Environment variables (`DASHVAULT_TARGET__API_KEY=...`)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure for dashvault
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashvaultConfig {
    /// The dashboard service instance being backed up or restored.
    pub target: TargetConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub restore: RestoreConfig,
}

impl DashvaultConfig {
    /// Build a configuration for `target` with every other section defaulted.
    pub fn new(target: TargetConfig) -> Self {
        Self {
            target,
            backup: BackupConfig::default(),
            restore: RestoreConfig::default(),
        }
    }

    /// Load configuration from all sources and validate it.
    ///
    /// `path` takes priority over `DASHVAULT_CONFIG`; either one must exist
    /// when given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults(Config::builder())?;

        builder = builder.add_source(File::with_name("./config/dashvault").required(false));

        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("DASHVAULT_CONFIG").map(PathBuf::from));
        if let Some(config_path) = explicit {
            builder = builder.add_source(File::from(config_path).required(true));
        }

        // Example: DASHVAULT_BACKUP__S3__ENABLED=true
        builder = builder.add_source(
            Environment::with_prefix("DASHVAULT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: DashvaultConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path, without environment
    /// overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: DashvaultConfig = Self::set_defaults(Config::builder())?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("target.timeout_secs", 30)?
            .set_default("backup.local.enabled", true)?
            .set_default("backup.local.folder", "./backups")?
            .set_default("backup.s3.enabled", false)?
            .set_default("backup.s3.region", "us-east-1")?
            .set_default("restore.overwrite", false)?
            .set_default("restore.recent_snapshots", 5)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.name.trim().is_empty() {
            return Err(ConfigError::Message("target.name must be set".to_string()));
        }
        if self.target.name.contains('/') {
            return Err(ConfigError::Message(
                "target.name must not contain '/'".to_string(),
            ));
        }
        if self.target.url.trim().is_empty() {
            return Err(ConfigError::Message("target.url must be set".to_string()));
        }
        if self.target.api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "target.api_key must be set".to_string(),
            ));
        }

        if !self.backup.local.enabled && !self.backup.s3.enabled {
            return Err(ConfigError::Message(
                "at least one of backup.local.enabled or backup.s3.enabled must be true"
                    .to_string(),
            ));
        }

        if self.backup.s3.enabled
            && self
                .backup
                .s3
                .bucket
                .as_deref()
                .map_or(true, |b| b.trim().is_empty())
        {
            return Err(ConfigError::Message(
                "backup.s3.bucket must be set when backup.s3.enabled is true".to_string(),
            ));
        }

        if self.restore.recent_snapshots == 0 {
            return Err(ConfigError::Message(
                "restore.recent_snapshots must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Dashboard service instance
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Target name, used as the top-level folder of every snapshot
    pub name: String,

    /// Base URL of the service (e.g. "https://grafana.example.com")
    pub url: String,

    /// Bearer token sent with every request
    pub api_key: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl TargetConfig {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            api_key: api_key.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where backups are written
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BackupConfig {
    #[serde(default)]
    pub local: LocalBackupConfig,

    #[serde(default)]
    pub s3: S3BackupConfig,
}

/// Local filesystem backups
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalBackupConfig {
    pub enabled: bool,

    /// Root folder; snapshots land under `{folder}/{target}/daily/`
    pub folder: PathBuf,
}

impl Default for LocalBackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            folder: PathBuf::from("./backups"),
        }
    }
}

/// S3-compatible bucket backups
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3BackupConfig {
    pub enabled: bool,

    pub bucket: Option<String>,

    /// AWS region (e.g., "us-west-2")
    pub region: String,

    /// Custom endpoint for MinIO and other S3-compatible services
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub access_key: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    /// Key prefix inside the bucket
    #[serde(default)]
    pub prefix: Option<String>,
}

impl Default for S3BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            prefix: None,
        }
    }
}

/// Restore behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RestoreConfig {
    /// Value sent as `overwrite` with every restored dashboard.
    ///
    /// `false` (default): the service rejects a dashboard whose title or uid
    /// already exists in the folder, so only missing dashboards come back.
    /// `true`: existing dashboards are replaced by the backed-up version.
    pub overwrite: bool,

    /// How many snapshots `--list` shows
    pub recent_snapshots: usize,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            recent_snapshots: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn target() -> TargetConfig {
        TargetConfig::new("prod", "http://localhost:3000", "secret")
    }

    #[test]
    fn test_default_configuration() {
        let config = DashvaultConfig::new(target());

        assert_eq!(config.target.timeout_secs, 30);
        assert!(config.backup.local.enabled);
        assert_eq!(config.backup.local.folder, PathBuf::from("./backups"));
        assert!(!config.backup.s3.enabled);
        assert_eq!(config.backup.s3.region, "us-east-1");
        assert!(!config.restore.overwrite);
        assert_eq!(config.restore.recent_snapshots, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = DashvaultConfig::new(target());

        config.target.api_key = String::new();
        assert!(config.validate().is_err());
        config.target.api_key = "secret".to_string();

        config.target.name = "a/b".to_string();
        assert!(config.validate().is_err());
        config.target.name = "prod".to_string();

        // No store enabled
        config.backup.local.enabled = false;
        assert!(config.validate().is_err());

        // S3 without bucket
        config.backup.s3.enabled = true;
        assert!(config.validate().is_err());

        config.backup.s3.bucket = Some("dashboards".to_string());
        assert!(config.validate().is_ok());

        config.restore.recent_snapshots = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[target]
name = "staging"
url = "http://grafana:3000"
api_key = "glsa_123"

[backup.local]
enabled = false

[backup.s3]
enabled = true
bucket = "dash-backups"
prefix = "grafana"

[restore]
overwrite = true
"#
        )
        .unwrap();

        let config = DashvaultConfig::from_file(file.path()).unwrap();
        assert_eq!(config.target.name, "staging");
        assert_eq!(config.target.timeout_secs, 30);
        assert!(!config.backup.local.enabled);
        assert!(config.backup.s3.enabled);
        assert_eq!(config.backup.s3.bucket.as_deref(), Some("dash-backups"));
        assert_eq!(config.backup.s3.region, "us-east-1");
        assert_eq!(config.backup.s3.prefix.as_deref(), Some("grafana"));
        assert!(config.restore.overwrite);
        assert_eq!(config.restore.recent_snapshots, 5);
    }

    #[test]
    fn test_from_file_missing_target_is_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[restore]\noverwrite = true").unwrap();

        assert!(DashvaultConfig::from_file(file.path()).is_err());
    }
}
