//! In-memory DashboardService for testing
//!
//! Holds dashboards and folders the way the real service would hand them
//! out, records every folder creation and submission for assertions, and
//! can be told to fail individual calls.

use async_trait::async_trait;
use dashvault_core::{
    CoreError, CoreResult, DashboardService, DashboardSummary, Folder, RestorePayload,
    SubmitOutcome,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Ids handed out by `create_folder` start here so tests can tell created
/// folders from pre-existing ones.
pub const FIRST_CREATED_FOLDER_ID: i64 = 1000;

#[derive(Default)]
struct MockState {
    dashboards: Vec<(DashboardSummary, Value)>,
    folders: BTreeMap<i64, Folder>,
    next_folder_id: i64,
    list_failure: Option<u16>,
    failing_fetches: HashSet<String>,
    rejected_titles: HashMap<String, u16>,
    fetch_calls: Vec<String>,
    folder_lookups: Vec<i64>,
    title_lookups: Vec<String>,
    created_folders: Vec<Folder>,
    submitted: Vec<RestorePayload>,
}

pub struct MockDashboardService {
    state: Mutex<MockState>,
}

impl MockDashboardService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_folder_id: FIRST_CREATED_FOLDER_ID,
                ..MockState::default()
            }),
        }
    }

    /// Register a dashboard. `folder` is `(folder_id, folder_title)`; `None`
    /// puts it in the root folder.
    pub fn add_dashboard(&self, uid: &str, title: &str, folder: Option<(i64, &str)>) {
        let mut state = self.state.lock();
        let id = state.dashboards.len() as i64 + 1;
        let (folder_id, folder_title) = folder.unwrap_or((0, "General"));

        let document = json!({
            "dashboard": {
                "id": id,
                "uid": uid,
                "title": title,
                "panels": [],
                "schemaVersion": 27,
                "version": 1
            },
            "meta": {
                "folderId": folder_id,
                "folderTitle": folder_title,
                "slug": title.to_lowercase().replace(' ', "-"),
                "canSave": true
            }
        });

        state.dashboards.push((
            DashboardSummary {
                uid: uid.to_string(),
                title: title.to_string(),
            },
            document,
        ));
    }

    /// Register a folder that already exists on the service.
    pub fn add_folder(&self, id: i64, title: &str) {
        self.state.lock().folders.insert(
            id,
            Folder {
                id,
                uid: None,
                title: title.to_string(),
            },
        );
    }

    /// Make `list_dashboards` answer with `status`.
    pub fn fail_listing(&self, status: u16) {
        self.state.lock().list_failure = Some(status);
    }

    /// Make `fetch_dashboard(uid)` answer with a 500.
    pub fn fail_fetch(&self, uid: &str) {
        self.state.lock().failing_fetches.insert(uid.to_string());
    }

    /// Make submissions of dashboards titled `title` get rejected with `status`.
    pub fn reject_submission(&self, title: &str, status: u16) {
        self.state
            .lock()
            .rejected_titles
            .insert(title.to_string(), status);
    }

    pub fn fetch_calls(&self) -> Vec<String> {
        self.state.lock().fetch_calls.clone()
    }

    pub fn folder_lookups(&self) -> Vec<i64> {
        self.state.lock().folder_lookups.clone()
    }

    pub fn title_lookups(&self) -> Vec<String> {
        self.state.lock().title_lookups.clone()
    }

    pub fn created_folders(&self) -> Vec<Folder> {
        self.state.lock().created_folders.clone()
    }

    pub fn submitted(&self) -> Vec<RestorePayload> {
        self.state.lock().submitted.clone()
    }
}

impl Default for MockDashboardService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DashboardService for MockDashboardService {
    async fn list_dashboards(&self) -> CoreResult<Vec<DashboardSummary>> {
        let state = self.state.lock();
        if let Some(status) = state.list_failure {
            return Err(CoreError::service(status, "search failed"));
        }
        Ok(state.dashboards.iter().map(|(s, _)| s.clone()).collect())
    }

    async fn fetch_dashboard(&self, uid: &str) -> CoreResult<Value> {
        let mut state = self.state.lock();
        state.fetch_calls.push(uid.to_string());

        if state.failing_fetches.contains(uid) {
            return Err(CoreError::service(500, format!("fetch of {} failed", uid)));
        }

        state
            .dashboards
            .iter()
            .find(|(s, _)| s.uid == uid)
            .map(|(_, doc)| doc.clone())
            .ok_or_else(|| CoreError::service(404, "Dashboard not found"))
    }

    async fn find_folder(&self, id: i64) -> CoreResult<Option<Folder>> {
        let mut state = self.state.lock();
        state.folder_lookups.push(id);
        Ok(state.folders.get(&id).cloned())
    }

    async fn find_folder_by_title(&self, title: &str) -> CoreResult<Option<Folder>> {
        let mut state = self.state.lock();
        state.title_lookups.push(title.to_string());
        Ok(state.folders.values().find(|f| f.title == title).cloned())
    }

    async fn create_folder(&self, title: &str) -> CoreResult<Folder> {
        let mut state = self.state.lock();
        let id = state.next_folder_id;
        state.next_folder_id += 1;

        let folder = Folder {
            id,
            uid: Some(format!("folder-{}", id)),
            title: title.to_string(),
        };
        state.folders.insert(id, folder.clone());
        state.created_folders.push(folder.clone());
        Ok(folder)
    }

    async fn submit_dashboard(&self, payload: &RestorePayload) -> CoreResult<SubmitOutcome> {
        let mut state = self.state.lock();
        let title = payload.dashboard.title.clone().unwrap_or_default();

        if let Some(status) = state.rejected_titles.get(&title).copied() {
            return Ok(SubmitOutcome::Failure {
                status,
                message: format!("dashboard `{}` rejected", title),
            });
        }

        state.submitted.push(payload.clone());
        Ok(SubmitOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_roundtrip() {
        let mock = MockDashboardService::new();
        mock.add_dashboard("abc", "Node Exporter", Some((5, "Ops")));

        let list = mock.list_dashboards().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].uid, "abc");

        let doc = mock.fetch_dashboard("abc").await.unwrap();
        assert_eq!(doc["meta"]["folderId"], json!(5));
        assert_eq!(doc["dashboard"]["uid"], json!("abc"));

        assert!(mock.find_folder(5).await.unwrap().is_none());
        assert!(mock.find_folder_by_title("Ops").await.unwrap().is_none());
        let folder = mock.create_folder("Ops").await.unwrap();
        assert_eq!(folder.id, FIRST_CREATED_FOLDER_ID);
        assert_eq!(
            mock.find_folder(FIRST_CREATED_FOLDER_ID).await.unwrap(),
            Some(folder.clone())
        );
        assert_eq!(mock.find_folder_by_title("Ops").await.unwrap(), Some(folder));
        assert_eq!(mock.title_lookups(), vec!["Ops", "Ops"]);
    }

    #[tokio::test]
    async fn test_mock_failures() {
        let mock = MockDashboardService::new();
        mock.add_dashboard("abc", "A", None);
        mock.fail_fetch("abc");
        assert!(mock.fetch_dashboard("abc").await.is_err());

        mock.fail_listing(401);
        assert!(matches!(
            mock.list_dashboards().await,
            Err(CoreError::Service { status: 401, .. })
        ));
    }
}
