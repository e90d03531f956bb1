//! sw_fetch tool implementation.
//!
//! Issues one page request through the worker and reports which tier
//! answered it.

use chrono::Utc;
use mks_sw_client::{OfflineWorker, Served, Strategy};
use mks_sw_core::{RequestMode, ResponseSnapshot, ResponseSource};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the app origin.
    pub url: String,

    /// HTTP method (default: GET). Anything but GET bypasses the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin", "no-cors" or "cors" (default).
    #[serde(default)]
    pub mode: RequestMode,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The resolved request URL.
    pub url: String,
    pub method: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    /// Body as text when it is valid UTF-8.
    pub body_text: Option<String>,
    pub body_len: usize,
    /// Which tier answered: network, cache, shell or synthetic.
    pub source: ResponseSource,
    /// Strategy applied, absent for requests that bypassed the cache.
    pub strategy: Option<Strategy>,
    /// ISO8601 timestamp of when the response was served.
    pub served_at: String,
}

impl SwFetchOutput {
    pub fn new(url: String, method: String, served: Served) -> Self {
        let Served { response, source, strategy } = served;
        let content_type = response.content_type().map(str::to_string);
        let ResponseSnapshot { status, status_text, headers, body } = response;

        Self {
            url,
            method,
            status,
            status_text,
            content_type,
            headers,
            body_text: std::str::from_utf8(&body).ok().map(str::to_string),
            body_len: body.len(),
            source,
            strategy,
            served_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &OfflineWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = worker.request(&params.method, &params.url, params.mode)?;
    let served = worker.fetch(&request).await?;

    let output = SwFetchOutput::new(request.url.to_string(), request.method.clone(), served);
    json_result(&output)
}
