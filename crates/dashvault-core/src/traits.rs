use async_trait::async_trait;
use serde_json::Value;

use crate::dashboard::{DashboardSummary, Folder, RestorePayload, SubmitOutcome};
use crate::error::CoreResult;

/// Remote dashboard service the orchestrators talk to.
#[async_trait]
pub trait DashboardService: Send + Sync {
    /// Lists every dashboard visible to the credential.
    async fn list_dashboards(&self) -> CoreResult<Vec<DashboardSummary>>;

    /// Fetches the full document (`dashboard` + `meta`) of one dashboard.
    async fn fetch_dashboard(&self, uid: &str) -> CoreResult<Value>;

    /// Looks a folder up by id. `None` when the service does not answer with
    /// a success status.
    async fn find_folder(&self, id: i64) -> CoreResult<Option<Folder>>;

    /// Looks a folder up by its exact title.
    async fn find_folder_by_title(&self, title: &str) -> CoreResult<Option<Folder>>;

    /// Creates a folder and returns it with its service-assigned id.
    async fn create_folder(&self, title: &str) -> CoreResult<Folder>;

    /// Submits a sanitized dashboard. Rejections by the service are reported
    /// through `SubmitOutcome::Failure`, not as an error.
    async fn submit_dashboard(&self, payload: &RestorePayload) -> CoreResult<SubmitOutcome>;
}
