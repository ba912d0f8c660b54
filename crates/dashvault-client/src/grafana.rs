//! HTTP client for the Grafana dashboard API.

use async_trait::async_trait;
use dashvault_core::{
    CoreError, CoreResult, DashboardService, DashboardSummary, Folder, RestorePayload,
    SubmitOutcome, TargetConfig,
};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Largest page the search endpoint hands out.
const SEARCH_LIMIT: u32 = 5000;

/// Largest page the folder listing hands out.
const FOLDER_LIMIT: u32 = 1000;

/// Talks to one Grafana instance with a bearer token.
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    search_limit: u32,
    folder_limit: u32,
}

impl GrafanaClient {
    pub fn new(target: &TargetConfig) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(target.timeout())
            .build()
            .map_err(|e| CoreError::service(0, format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: target.url.trim_end_matches('/').to_string(),
            api_key: target.api_key.clone(),
            search_limit: SEARCH_LIMIT,
            folder_limit: FOLDER_LIMIT,
        })
    }

    /// Request smaller pages from the listing endpoints.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        self.search_limit = page_size.min(SEARCH_LIMIT);
        self.folder_limit = page_size.min(FOLDER_LIMIT);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> CoreResult<Response> {
        request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| CoreError::service(0, format!("{}: {}", url, e)))
    }

    /// Turn a non-success response into `CoreError::Service`.
    async fn ensure_success(url: &str, response: Response) -> CoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(url = %url, status = status.as_u16(), error = %body, "API call failed");
        Err(CoreError::service(status.as_u16(), body))
    }

    async fn json<T: DeserializeOwned>(url: &str, response: Response) -> CoreResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| CoreError::service(0, format!("{}: invalid response body: {}", url, e)))
    }

    /// Collect every page of a listing endpoint. Pages are 1-based; a page
    /// shorter than `limit` is the last one.
    async fn get_all_pages<T>(&self, path: &str, limit: u32) -> CoreResult<Vec<T>>
    where
        T: DeserializeOwned + Clone + PartialEq + Send,
    {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut items: Vec<T> = Vec::new();
        let mut previous: Vec<T> = Vec::new();
        let mut page = 1u32;

        loop {
            let url = self.url(&format!("{}{}limit={}&page={}", path, separator, limit, page));
            let response = self.send(&url, self.http.get(&url)).await?;
            let response = Self::ensure_success(&url, response).await?;
            let batch: Vec<T> = Self::json(&url, response).await?;
            debug!(path = %path, page, count = batch.len(), "Fetched page");

            // A server that ignores `page` keeps returning the first one
            if !batch.is_empty() && batch == previous {
                warn!(url = %url, page, "Page repeated, stopping pagination");
                break;
            }

            let last = batch.len() < limit as usize;
            items.extend(batch.iter().cloned());
            if last {
                break;
            }
            previous = batch;
            page += 1;
        }

        Ok(items)
    }
}

#[async_trait]
impl DashboardService for GrafanaClient {
    async fn list_dashboards(&self) -> CoreResult<Vec<DashboardSummary>> {
        let dashboards: Vec<DashboardSummary> = self
            .get_all_pages("/api/search?type=dash-db", self.search_limit)
            .await?;

        debug!(count = dashboards.len(), "Listed dashboards");
        Ok(dashboards)
    }

    async fn fetch_dashboard(&self, uid: &str) -> CoreResult<Value> {
        let url = self.url(&format!("/api/dashboards/uid/{}", uid));
        let response = self.send(&url, self.http.get(&url)).await?;
        let response = Self::ensure_success(&url, response).await?;
        Self::json(&url, response).await
    }

    async fn find_folder(&self, id: i64) -> CoreResult<Option<Folder>> {
        let url = self.url(&format!("/api/folders/id/{}", id));
        let response = self.send(&url, self.http.get(&url)).await?;

        let status = response.status();
        if !status.is_success() {
            debug!(folder_id = id, status = status.as_u16(), "Folder lookup unsuccessful");
            return Ok(None);
        }

        Self::json(&url, response).await.map(Some)
    }

    async fn find_folder_by_title(&self, title: &str) -> CoreResult<Option<Folder>> {
        let folders: Vec<Folder> = self.get_all_pages("/api/folders", self.folder_limit).await?;
        Ok(folders.into_iter().find(|f| f.title == title))
    }

    async fn create_folder(&self, title: &str) -> CoreResult<Folder> {
        let url = self.url("/api/folders");
        let request = self.http.post(&url).json(&json!({ "title": title }));
        let response = self.send(&url, request).await?;
        let response = Self::ensure_success(&url, response).await?;
        Self::json(&url, response).await
    }

    async fn submit_dashboard(&self, payload: &RestorePayload) -> CoreResult<SubmitOutcome> {
        let url = self.url("/api/dashboards/db");
        let response = self.send(&url, self.http.post(&url).json(payload)).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(SubmitOutcome::Success);
        }

        let message = response.text().await.unwrap_or_default();
        Ok(SubmitOutcome::Failure {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_strips_trailing_slash() {
        let target = TargetConfig::new("prod", "http://grafana:3000/", "token");
        let client = GrafanaClient::new(&target).unwrap();
        assert_eq!(client.url("/api/folders"), "http://grafana:3000/api/folders");
    }
}
