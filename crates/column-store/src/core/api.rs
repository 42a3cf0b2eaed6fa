//! Remote column CRUD.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    core::types::{ColumnId, ColumnRecord, Page, PartialColumn, TabularType},
    error::{AppError, AppResult},
};

/// Remote operations the store relies on. `list` futures may be dropped
/// mid-flight when a newer fetch supersedes them.
#[async_trait]
pub trait ColumnsApi: Send + Sync {
    async fn list(&self, limit: usize) -> AppResult<Page<ColumnRecord>>;

    async fn create(&self, column: &PartialColumn) -> AppResult<ColumnRecord>;

    async fn update(&self, id: ColumnId, patch: &PartialColumn) -> AppResult<ColumnRecord>;

    async fn delete(&self, id: ColumnId) -> AppResult<()>;
}

pub fn columns_url(base_url: &str, tabular_type: TabularType, parent_id: u64) -> String {
    format!(
        "{}/api/db/v0/{}/{}/columns/",
        base_url.trim_end_matches('/'),
        tabular_type.path_segment(),
        parent_id
    )
}

#[derive(Debug, Clone)]
pub struct HttpColumnsApi {
    http_client: reqwest::Client,
    url: String,
}

impl HttpColumnsApi {
    pub fn new(base_url: &str, tabular_type: TabularType, parent_id: u64, timeout: Duration) -> AppResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            url: columns_url(base_url, tabular_type, parent_id),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn column_url(&self, id: ColumnId) -> String {
        format!("{}{}/", self.url, id)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> AppResult<reqwest::Response> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body);
        warn!(status = status.as_u16(), message = ?message, "column api request failed");
        Err(AppError::Transport {
            status: Some(status.as_u16()),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> AppResult<T> {
        let response = self.send(req).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ColumnsApi for HttpColumnsApi {
    async fn list(&self, limit: usize) -> AppResult<Page<ColumnRecord>> {
        debug!(url = %self.url, limit, "listing columns");
        let req = self.http_client.get(&self.url).query(&[("limit", limit)]);
        self.send_json(req).await
    }

    async fn create(&self, column: &PartialColumn) -> AppResult<ColumnRecord> {
        debug!(url = %self.url, "creating column");
        let req = self.http_client.post(&self.url).json(column);
        self.send_json(req).await
    }

    async fn update(&self, id: ColumnId, patch: &PartialColumn) -> AppResult<ColumnRecord> {
        debug!(column_id = id, "updating column");
        let req = self.http_client.patch(self.column_url(id)).json(patch);
        self.send_json(req).await
    }

    async fn delete(&self, id: ColumnId) -> AppResult<()> {
        debug!(column_id = id, "deleting column");
        let req = self.http_client.delete(self.column_url(id));
        self.send(req).await?;
        Ok(())
    }
}

/// Pulls a readable message out of an error body: `[{"message": ..}, ..]`,
/// `{"message": ..}` or `{"detail": ..}`, else the raw text.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.to_string());
    };
    let from_object = |v: &serde_json::Value| {
        v.get("message")
            .or_else(|| v.get("detail"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    };
    let found = match &value {
        serde_json::Value::Array(items) => {
            let messages: Vec<String> = items.iter().filter_map(from_object).collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        serde_json::Value::Object(_) => from_object(&value),
        _ => None,
    };
    found.or_else(|| Some(trimmed.to_string()))
}
