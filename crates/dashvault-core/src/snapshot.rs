//! Snapshot naming and artifact key layout.
//!
//! Every key is relative to the store root:
//! `{target}/daily/{snapshot}/{slug(title)}_{slug(uid)}.json`

use chrono::{DateTime, Utc};
use std::fmt;

use crate::dashboard::slug;

/// Sub-folder holding the snapshots of one target.
pub const SNAPSHOT_CADENCE: &str = "daily";

/// Fixed-width, zero-padded UTC timestamp. Millisecond precision keeps two
/// back-to-back runs apart; no `:` so the name is a valid path on every OS.
const SNAPSHOT_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3fZ";

/// Timestamp-derived snapshot name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotName(String);

impl SnapshotName {
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(SNAPSHOT_FORMAT).to_string())
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SnapshotName {
    fn from(name: &str) -> Self {
        Self(name.trim_matches('/').to_string())
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of one snapshot inside a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPath {
    pub target: String,
    pub name: SnapshotName,
}

impl SnapshotPath {
    pub fn new(target: impl Into<String>, name: SnapshotName) -> Self {
        Self {
            target: target.into(),
            name,
        }
    }

    /// Parent prefix under which all snapshots of `target` live.
    pub fn parent_prefix(target: &str) -> String {
        format!("{}/{}/", target, SNAPSHOT_CADENCE)
    }

    /// Prefix of this snapshot, with trailing slash.
    pub fn prefix(&self) -> String {
        format!("{}{}/", Self::parent_prefix(&self.target), self.name)
    }

    /// Key of the artifact for one dashboard.
    pub fn artifact_key(&self, title: &str, uid: &str) -> String {
        format!("{}{}", self.prefix(), artifact_file_name(title, uid))
    }
}

impl fmt::Display for SnapshotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix())
    }
}

pub fn artifact_file_name(title: &str, uid: &str) -> String {
    format!("{}_{}.json", slug(title), slug(uid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_name_is_fixed_width() {
        let early = Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap();
        let late = Utc.with_ymd_and_hms(2021, 12, 31, 23, 59, 59).unwrap();

        let a = SnapshotName::from_datetime(early);
        let b = SnapshotName::from_datetime(late);

        assert_eq!(a.as_str(), "2021-01-02T03-04-05.000Z");
        assert_eq!(a.as_str().len(), b.as_str().len());
        assert!(a < b);
    }

    #[test]
    fn test_snapshot_name_millis_distinguish_runs() {
        let first = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let second = Utc.timestamp_millis_opt(1_700_000_000_001).unwrap();
        assert_ne!(
            SnapshotName::from_datetime(first),
            SnapshotName::from_datetime(second)
        );
    }

    #[test]
    fn test_paths() {
        let path = SnapshotPath::new("prod", SnapshotName::from("2024-01-01T00-00-00.000Z/"));
        assert_eq!(SnapshotPath::parent_prefix("prod"), "prod/daily/");
        assert_eq!(path.prefix(), "prod/daily/2024-01-01T00-00-00.000Z/");
        assert_eq!(
            path.artifact_key("Node Exporter", "AbC12"),
            "prod/daily/2024-01-01T00-00-00.000Z/nodeexporter_abc12.json"
        );
    }
}
