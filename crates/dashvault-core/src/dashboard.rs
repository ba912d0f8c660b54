//! Dashboard documents as stored in artifacts and sent back on restore.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// Folder id of the root ("General") folder.
pub const ROOT_FOLDER_ID: i64 = 0;

/// One hit from the dashboard search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub uid: String,
    pub title: String,
}

/// Folder on the dashboard service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub title: String,
}

/// Full dashboard document as returned by the service and written to a
/// snapshot: `{"dashboard": {...}, "meta": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBody {
    pub dashboard: DashboardDefinition,
    pub meta: DashboardMeta,
}

impl ArtifactBody {
    /// Parse an artifact read back from a store.
    pub fn from_slice(key: &str, bytes: &[u8]) -> CoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::malformed(key, e.to_string()))
    }

    /// Consume the artifact and build the submission body for the restore
    /// target. The dashboard's own `id`/`uid` are dropped so the target
    /// assigns fresh ones.
    pub fn into_restore_payload(
        self,
        folder_id: i64,
        message: impl Into<String>,
        overwrite: bool,
    ) -> RestorePayload {
        RestorePayload {
            dashboard: self.dashboard.sanitize(),
            folder_id,
            message: message.into(),
            overwrite,
        }
    }
}

/// The dashboard model. `id` and `uid` are pulled out so they can be
/// dropped before re-submission; every other key is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl DashboardDefinition {
    pub fn sanitize(self) -> SanitizedDashboard {
        SanitizedDashboard {
            title: self.title,
            rest: self.rest,
        }
    }
}

/// Dashboard model with no service-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedDashboard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Service metadata captured alongside the dashboard at backup time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMeta {
    #[serde(rename = "folderId", default)]
    pub folder_id: i64,

    #[serde(rename = "folderTitle", default, skip_serializing_if = "Option::is_none")]
    pub folder_title: Option<String>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl DashboardMeta {
    pub fn in_root_folder(&self) -> bool {
        self.folder_id == ROOT_FOLDER_ID
    }
}

/// Body posted to the dashboard import endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestorePayload {
    pub dashboard: SanitizedDashboard,

    #[serde(rename = "folderId")]
    pub folder_id: i64,

    pub message: String,

    pub overwrite: bool,
}

/// Result of submitting a dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Success,
    Failure { status: u16, message: String },
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Success)
    }
}

/// Lower-cased, space-stripped form of a title or uid, used in artifact keys.
pub fn slug(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact_json() -> Value {
        json!({
            "dashboard": {
                "id": 42,
                "uid": "abc",
                "title": "Node Exporter",
                "panels": [{"id": 1, "type": "graph"}],
                "schemaVersion": 27
            },
            "meta": {
                "folderId": 5,
                "folderTitle": "Ops",
                "slug": "node-exporter",
                "version": 3
            }
        })
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Node Exporter Full"), "nodeexporterfull");
        assert_eq!(slug("AbC-12"), "abc-12");
        assert_eq!(slug(""), "");
    }

    #[test]
    fn test_parse_artifact() {
        let bytes = serde_json::to_vec(&artifact_json()).unwrap();
        let artifact = ArtifactBody::from_slice("k.json", &bytes).unwrap();

        assert_eq!(artifact.dashboard.id, Some(42));
        assert_eq!(artifact.dashboard.uid.as_deref(), Some("abc"));
        assert_eq!(artifact.meta.folder_id, 5);
        assert_eq!(artifact.meta.folder_title.as_deref(), Some("Ops"));
        assert!(!artifact.meta.in_root_folder());
        assert_eq!(artifact.dashboard.rest["schemaVersion"], json!(27));
    }

    #[test]
    fn test_parse_artifact_missing_meta_is_malformed() {
        let bytes = serde_json::to_vec(&json!({"dashboard": {"title": "x"}})).unwrap();
        let err = ArtifactBody::from_slice("snap/x.json", &bytes).unwrap_err();
        assert!(matches!(err, CoreError::MalformedArtifact { ref key, .. } if key == "snap/x.json"));

        let err = ArtifactBody::from_slice("snap/y.json", b"not json").unwrap_err();
        assert!(matches!(err, CoreError::MalformedArtifact { .. }));
    }

    #[test]
    fn test_restore_payload_drops_identity() {
        let bytes = serde_json::to_vec(&artifact_json()).unwrap();
        let artifact = ArtifactBody::from_slice("k.json", &bytes).unwrap();

        let payload = artifact.into_restore_payload(17, "Restored", false);
        let value = serde_json::to_value(&payload).unwrap();

        let dashboard = value["dashboard"].as_object().unwrap();
        assert!(!dashboard.contains_key("uid"));
        assert!(!dashboard.contains_key("id"));
        assert_eq!(dashboard["title"], json!("Node Exporter"));
        assert_eq!(dashboard["panels"][0]["id"], json!(1));

        assert_eq!(value["folderId"], json!(17));
        assert_eq!(value["message"], json!("Restored"));
        assert_eq!(value["overwrite"], json!(false));
        assert!(value.get("meta").is_none());
    }

    #[test]
    fn test_root_folder_default() {
        let bytes = serde_json::to_vec(&json!({"dashboard": {}, "meta": {}})).unwrap();
        let artifact = ArtifactBody::from_slice("k.json", &bytes).unwrap();
        assert!(artifact.meta.in_root_folder());
        assert!(artifact.meta.folder_title.is_none());
    }
}
