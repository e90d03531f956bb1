//! sw_fetch_batch tool implementation.
//!
//! Routes several independent requests through the worker in parallel with
//! bounded concurrency.

use std::sync::Arc;

use mks_sw_client::OfflineWorker;
use mks_sw_core::{Error, RequestMode, ResponseSource};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use super::fetch::SwFetchOutput;
use super::json_result;
use crate::error::ToolError;

/// Input parameters for sw_fetch_batch tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchBatchParams {
    /// URLs to fetch with GET, absolute or relative to the app origin.
    pub urls: Vec<String>,

    /// Request mode applied to every URL (default: "cors").
    #[serde(default)]
    pub mode: RequestMode,

    /// Maximum number of concurrent requests (default: 4, max: 16).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: Option<u8>,

    /// Fail fast: stop on first error (default: false).
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_max_concurrency() -> Option<u8> {
    Some(4)
}

/// Batch item status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchItemStatus {
    /// Answered by the live network.
    Success,
    /// Answered from the cache store or the app shell.
    Cached,
    /// The synthetic 503.
    Unavailable,
    /// The request errored.
    Failed,
}

/// Individual batch result item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchItem {
    /// The original URL.
    pub url: String,
    pub status: BatchItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SwFetchOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch summary statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BatchSummary {
    pub total: u32,
    pub succeeded: u32,
    pub cached: u32,
    pub unavailable: u32,
    pub failed: u32,
}

/// Output structure for sw_fetch_batch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchBatchOutput {
    /// Individual results for each URL (in input order).
    pub results: Vec<BatchItem>,
    pub summary: BatchSummary,
}

async fn fetch_one(worker: &OfflineWorker, url: &str, mode: RequestMode) -> BatchItem {
    let outcome = async {
        let request = worker.request("GET", url, mode)?;
        let served = worker.fetch(&request).await?;
        Ok::<_, Error>(SwFetchOutput::new(request.url.to_string(), request.method.clone(), served))
    }
    .await;

    match outcome {
        Ok(output) => {
            let status = match output.source {
                ResponseSource::Network => BatchItemStatus::Success,
                ResponseSource::Cache | ResponseSource::Shell => BatchItemStatus::Cached,
                ResponseSource::Synthetic => BatchItemStatus::Unavailable,
            };
            BatchItem { url: url.to_string(), status, result: Some(output), error: None }
        }
        Err(e) => {
            BatchItem { url: url.to_string(), status: BatchItemStatus::Failed, result: None, error: Some(e.to_string()) }
        }
    }
}

/// Results collected so far, keyed by input position.
#[derive(Default)]
struct Tally {
    items: Vec<(usize, BatchItem)>,
    summary: BatchSummary,
}

impl Tally {
    /// Record one finished request. Returns whether it failed.
    fn record(&mut self, index: usize, item: BatchItem) -> bool {
        match item.status {
            BatchItemStatus::Success => self.summary.succeeded += 1,
            BatchItemStatus::Cached => self.summary.cached += 1,
            BatchItemStatus::Unavailable => self.summary.unavailable += 1,
            BatchItemStatus::Failed => self.summary.failed += 1,
        }
        let failed = item.status == BatchItemStatus::Failed;
        self.items.push((index, item));
        failed
    }

    fn finish(mut self) -> SwFetchBatchOutput {
        self.items.sort_by_key(|(index, _)| *index);
        let results: Vec<BatchItem> = self.items.into_iter().map(|(_, item)| item).collect();
        self.summary.total = results.len() as u32;
        SwFetchBatchOutput { results, summary: self.summary }
    }
}

/// Implementation of the sw_fetch_batch tool.
///
/// At most `max_concurrency` requests are in flight. Results are collected
/// while requests are still being launched, so with `fail_fast` no new request
/// starts after the first failure is seen.
pub async fn fetch_batch_impl(
    worker: Arc<OfflineWorker>, params: SwFetchBatchParams,
) -> Result<CallToolResult, McpError> {
    if params.urls.is_empty() {
        return Err(ToolError::InvalidInput("urls cannot be empty".into()).into());
    }

    let max_concurrency = params.max_concurrency.unwrap_or(4).min(16) as usize;
    if max_concurrency == 0 {
        return Err(ToolError::InvalidInput("max_concurrency must be at least 1".into()).into());
    }

    let mut join_set: JoinSet<(usize, BatchItem)> = JoinSet::new();
    let mut tally = Tally::default();
    let mut stopped = false;

    'launch: for (index, url) in params.urls.iter().cloned().enumerate() {
        while join_set.len() >= max_concurrency {
            let Some(joined) = join_set.join_next().await else { break };
            let (done, item) = joined.map_err(|e| ToolError::Internal(e.to_string()))?;
            if tally.record(done, item) && params.fail_fast {
                stopped = true;
                break 'launch;
            }
        }

        let worker = worker.clone();
        let mode = params.mode;
        join_set.spawn(async move { (index, fetch_one(&worker, &url, mode).await) });
    }

    if stopped {
        join_set.shutdown().await;
    }

    while let Some(joined) = join_set.join_next().await {
        let (index, item) = joined.map_err(|e| ToolError::Internal(e.to_string()))?;
        if tally.record(index, item) && params.fail_fast {
            join_set.shutdown().await;
            break;
        }
    }

    json_result(&tally.finish())
}
