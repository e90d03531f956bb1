//! cache_purge tool implementation.
//!
//! Removes single entries or trims a store to its newest entries.

use mks_sw_client::OfflineWorker;
use mks_sw_core::RequestDescriptor;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Store to purge (default: the current cache version).
    #[serde(default)]
    pub store: Option<String>,

    /// Remove the cached GET response for this URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Keep only the newest N entries (LRU purge).
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(worker: &OfflineWorker, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.url.is_none() && params.max_entries.is_none() {
        return Err(ToolError::InvalidInput("At least one of url or max_entries must be specified".to_string()).into());
    }

    let db = worker.db();
    let store = params.store.unwrap_or_else(|| worker.version().to_string());
    let mut deleted_total = 0u64;

    if let Some(url) = params.url {
        let request = RequestDescriptor::get(worker.resolve(&url)?);
        if db.delete_entry(&store, &request).await? {
            deleted_total += 1;
        }
    }

    if let Some(max_entries) = params.max_entries {
        deleted_total += db.purge_lru_entries(&store, max_entries).await?;
    }

    json_result(&CachePurgeOutput { deleted: deleted_total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{fixture, output};
    use mks_sw_core::ResponseSnapshot;

    async fn seed(worker: &OfflineWorker, paths: &[&str]) {
        for path in paths {
            let request = RequestDescriptor::get(worker.resolve(path).unwrap());
            worker
                .db()
                .put_entry(worker.version(), &request, &ResponseSnapshot::new(200, path.to_string()))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_purge_by_url() {
        let f = fixture().await;
        seed(&f.worker, &["/js/app.js", "/css/style.css"]).await;

        let params = CachePurgeParams { url: Some("/js/app.js".into()), ..Default::default() };
        let out: CachePurgeOutput = output(&purge_impl(&f.worker, params).await.unwrap());
        assert_eq!(out.deleted, 1);
        assert_eq!(f.worker.db().entry_count("mks-muslim-v2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_lru() {
        let f = fixture().await;
        seed(&f.worker, &["/a.js", "/b.js", "/c.js"]).await;

        let params = CachePurgeParams { max_entries: Some(1), ..Default::default() };
        let out: CachePurgeOutput = output(&purge_impl(&f.worker, params).await.unwrap());
        assert_eq!(out.deleted, 2);
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let f = fixture().await;
        let result = purge_impl(&f.worker, CachePurgeParams::default()).await;
        assert!(result.is_err());
    }
}
