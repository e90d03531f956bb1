//! cache_get tool implementation.
//!
//! Reads a cached response, or lists a store's entries.

use mks_sw_client::OfflineWorker;
use mks_sw_core::{EntryMeta, Error, RequestDescriptor};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the cached GET request. Omit to list the store instead.
    #[serde(default)]
    pub url: Option<String>,

    /// Store to read (default: the current cache version).
    #[serde(default)]
    pub store: Option<String>,
}

/// A cached response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body_text: Option<String>,
    pub body_len: usize,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    /// All store names, oldest first.
    pub stores: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<CachedResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntryMeta>>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &OfflineWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let db = worker.db();
    let store = params.store.unwrap_or_else(|| worker.version().to_string());
    let stores = db.store_names().await?;

    let output = match params.url {
        Some(url) => {
            let url = worker.resolve(&url)?;
            let response = db
                .match_entry(&store, &RequestDescriptor::get(url.clone()))
                .await?
                .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

            let entry = CachedResponse {
                url: url.to_string(),
                status: response.status,
                status_text: response.status_text.clone(),
                body_text: std::str::from_utf8(&response.body).ok().map(str::to_string),
                body_len: response.body.len(),
                headers: response.headers,
            };
            CacheGetOutput { store, stores, entry: Some(entry), entries: None }
        }
        None => {
            let entries = db.list_entries(&store).await?;
            CacheGetOutput { store, stores, entry: None, entries: Some(entries) }
        }
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{active_fixture, fixture, output};
    use mks_sw_core::ResponseSnapshot;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let f = fixture().await;
        let params = CacheGetParams { url: Some("/nonexistent.js".into()), store: None };

        let err = get_impl(&f.worker, params).await.unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode(-32001));
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let f = active_fixture().await;
        f.net.respond("http://localhost:8080/css/style.css", ResponseSnapshot::new(200, "body{}"));
        let req = f.worker.request("GET", "/css/style.css", Default::default()).unwrap();
        f.worker.fetch(&req).await.unwrap();

        let params = CacheGetParams { url: Some("/css/style.css".into()), store: None };
        let out: CacheGetOutput = output(&get_impl(&f.worker, params).await.unwrap());

        let entry = out.entry.unwrap();
        assert_eq!(entry.status, 200);
        assert_eq!(entry.body_text.as_deref(), Some("body{}"));
        assert_eq!(out.stores, vec!["mks-muslim-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_get_impl_lists_store() {
        let f = active_fixture().await;
        f.net.respond("http://localhost:8080/js/app.js", ResponseSnapshot::new(200, "app"));
        let req = f.worker.request("GET", "/js/app.js", Default::default()).unwrap();
        f.worker.fetch(&req).await.unwrap();

        let out: CacheGetOutput = output(&get_impl(&f.worker, CacheGetParams::default()).await.unwrap());
        let entries = out.entries.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "http://localhost:8080/js/app.js");
    }
}
