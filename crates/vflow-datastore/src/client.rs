//! REST client for a NocoDB-style table API.
//!
//! - Paginated listing (`{list, pageInfo: {isLastPage}}`)
//! - Partial row updates via PATCH
//! - Idempotent deletes (404 counts as success)
//! - Retry with backoff, tracing spans and request metrics

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info_span, warn, Instrument};

use vflow_models::{SceneId, ScenePatch, SceneItem, VideoId, VideoPatch, WorkItem};

use crate::error::{DataStoreError, DataStoreResult};
use crate::metrics::{record_request, record_rows};
use crate::retry::{with_retry, RetryConfig};
use crate::rows::{SceneRow, VideoRow};
use crate::store::DataStore;

// =============================================================================
// Configuration
// =============================================================================

/// Data-layer client configuration.
#[derive(Debug, Clone)]
pub struct DataStoreConfig {
    /// Base URL of the table API, e.g. `https://db.example.com`.
    pub base_url: String,
    /// API token sent as `xc-token`.
    pub token: Option<String>,
    /// Table id of the videos table.
    pub videos_table: String,
    /// Table id of the scenes table.
    pub scenes_table: String,
    /// Rows per page when listing.
    pub page_size: u32,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl Default for DataStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            token: None,
            videos_table: "videos".to_string(),
            scenes_table: "scenes".to_string(),
            page_size: 100,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

impl DataStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> DataStoreResult<Self> {
        let base_url = std::env::var("DATASTORE_URL")
            .map_err(|_| DataStoreError::config("DATASTORE_URL must be set"))?;

        if base_url.trim().is_empty() {
            return Err(DataStoreError::config("DATASTORE_URL cannot be empty"));
        }

        let defaults = Self::default();

        let timeout_secs: u64 = std::env::var("DATASTORE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.timeout.as_secs());

        let connect_timeout_secs: u64 = std::env::var("DATASTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.connect_timeout.as_secs());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: std::env::var("DATASTORE_TOKEN").ok().filter(|t| !t.is_empty()),
            videos_table: std::env::var("DATASTORE_VIDEOS_TABLE").unwrap_or(defaults.videos_table),
            scenes_table: std::env::var("DATASTORE_SCENES_TABLE").unwrap_or(defaults.scenes_table),
            page_size: std::env::var("DATASTORE_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.page_size),
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    is_last_page: Option<bool>,
    #[serde(default)]
    total_rows: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
    #[serde(default)]
    page_info: Option<PageInfo>,
}

#[derive(Debug, Serialize)]
struct RowId {
    #[serde(rename = "Id")]
    id: i64,
}

// =============================================================================
// Client
// =============================================================================

/// Table API client.
#[derive(Clone)]
pub struct DataStoreClient {
    http: Client,
    config: DataStoreConfig,
}

impl DataStoreClient {
    /// Create a new client.
    pub fn new(config: DataStoreConfig) -> DataStoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vflow-datastore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DataStoreError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> DataStoreResult<Self> {
        Self::new(DataStoreConfig::from_env()?)
    }

    pub fn config(&self) -> &DataStoreConfig {
        &self.config
    }

    fn records_url(&self, table: &str) -> String {
        format!("{}/api/v2/tables/{}/records", self.config.base_url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.header("xc-token", token),
            None => request,
        }
    }

    // =========================================================================
    // Row operations
    // =========================================================================

    /// List every row of a table, following pagination.
    pub async fn list_rows<T: DeserializeOwned>(&self, table: &str) -> DataStoreResult<Vec<T>> {
        let mut rows = Vec::new();
        let mut offset: u64 = 0;
        let limit = self.config.page_size;

        loop {
            let page: ListResponse<T> = self
                .execute_request("list_rows", table, None, || self.list_page(table, limit, offset))
                .await?;

            let returned = page.list.len() as u64;
            rows.extend(page.list);

            let is_last = match &page.page_info {
                Some(PageInfo {
                    is_last_page: Some(last),
                    ..
                }) => *last,
                Some(PageInfo {
                    total_rows: Some(total),
                    ..
                }) => offset + returned >= *total,
                _ => returned < limit as u64,
            };

            if is_last || returned == 0 {
                break;
            }
            offset += returned;
        }

        record_rows(table, rows.len());
        debug!(table = %table, rows = rows.len(), "Listed rows");
        Ok(rows)
    }

    async fn list_page<T: DeserializeOwned>(
        &self,
        table: &str,
        limit: u32,
        offset: u64,
    ) -> DataStoreResult<ListResponse<T>> {
        let url = self.records_url(table);
        let request = self
            .http
            .get(&url)
            .query(&[("limit", limit.to_string()), ("offset", offset.to_string())]);
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body).map_err(|e| DataStoreError::unparsable_body("list response", e, &body))
        } else {
            Err(Self::handle_error_response(status, &url, response).await)
        }
    }

    /// Partially update one row.
    pub async fn update_row<P: Serialize>(&self, table: &str, id: i64, patch: &P) -> DataStoreResult<()> {
        let mut body = match serde_json::to_value(patch)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if body.is_empty() {
            debug!(table = %table, id, "Skipping empty update");
            return Ok(());
        }
        body.insert("Id".to_string(), Value::from(id));
        let body = Value::Object(body);
        let url = self.records_url(table);

        self.execute_request("update_row", table, Some(id), || async {
            let request = self.http.patch(&url).json(&body);
            let response = self.authorize(request).send().await?;
            let status = response.status();

            match status {
                s if s.is_success() => Ok(()),
                StatusCode::NOT_FOUND => Err(DataStoreError::not_found(format!("{}/{}", table, id))),
                _ => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Delete one row. A missing row counts as deleted.
    pub async fn delete_row(&self, table: &str, id: i64) -> DataStoreResult<()> {
        let url = self.records_url(table);
        let body = RowId { id };

        self.execute_request("delete_row", table, Some(id), || async {
            let request = self.http.delete(&url).json(&body);
            let response = self.authorize(request).send().await?;
            let status = response.status();

            match status {
                s if s.is_success() => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!("Row {}/{} already deleted (idempotent)", table, id);
                    Ok(())
                }
                _ => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Cheap connectivity probe used by readiness checks.
    pub async fn check_connectivity(&self) -> DataStoreResult<()> {
        let _: ListResponse<Value> = self
            .list_page(&self.config.videos_table, 1, 0)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn execute_request<T, F, Fut>(
        &self,
        operation: &str,
        table: &str,
        row_id: Option<i64>,
        op: F,
    ) -> DataStoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = DataStoreResult<T>>,
    {
        let span = match row_id {
            Some(id) => info_span!("datastore_request", operation = %operation, table = %table, row_id = id),
            None => info_span!("datastore_request", operation = %operation, table = %table),
        };

        let start = Instant::now();
        let result = with_retry(&self.config.retry, operation, op)
            .instrument(span)
            .await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        if let Err(e) = &result {
            warn!(operation = %operation, table = %table, error = %e, "Data-layer request failed");
        }

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: reqwest::Response) -> DataStoreError {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        match (status, retry_after) {
            (StatusCode::TOO_MANY_REQUESTS, Some(secs)) => DataStoreError::RateLimited(secs * 1000),
            _ => DataStoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body)),
        }
    }
}

#[async_trait]
impl DataStore for DataStoreClient {
    async fn fetch_all(&self) -> DataStoreResult<Vec<WorkItem>> {
        let rows: Vec<VideoRow> = self.list_rows(&self.config.videos_table).await?;
        Ok(rows.into_iter().map(VideoRow::into_item).collect())
    }

    async fn fetch_scenes(&self) -> DataStoreResult<Vec<SceneItem>> {
        let rows: Vec<SceneRow> = self.list_rows(&self.config.scenes_table).await?;
        Ok(rows.into_iter().filter_map(SceneRow::into_item).collect())
    }

    async fn update_video(&self, id: VideoId, patch: &VideoPatch) -> DataStoreResult<()> {
        self.update_row(&self.config.videos_table, id.get(), patch).await
    }

    async fn update_scene(&self, id: SceneId, patch: &ScenePatch) -> DataStoreResult<()> {
        self.update_row(&self.config.scenes_table, id.get(), patch).await
    }

    async fn delete_video(&self, id: VideoId) -> DataStoreResult<()> {
        self.delete_row(&self.config.videos_table, id.get()).await
    }

    async fn delete_scene(&self, id: SceneId) -> DataStoreResult<()> {
        self.delete_row(&self.config.scenes_table, id.get()).await
    }
}
