//! Response snapshots as stored in and served from the cache.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Body of the synthetic response served when neither network nor cache can answer.
pub const OFFLINE_BODY: &str = "Offline";

/// Status of the synthetic unavailable response.
pub const UNAVAILABLE_STATUS: u16 = 503;

/// A complete response: status, headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseSnapshot {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, status_text: String::new(), headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The synthetic "asset unavailable" response.
    pub fn unavailable() -> Self {
        Self {
            status: UNAVAILABLE_STATUS,
            status_text: "Service Unavailable".into(),
            headers: vec![("content-type".into(), "text/plain; charset=utf-8".into())],
            body: Bytes::from_static(OFFLINE_BODY.as_bytes()),
        }
    }

    /// True for 2xx statuses.
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Case-insensitive header lookup (first value wins).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Which tier satisfied a routed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// The cached app-shell document stood in for a navigation.
    Shell,
    /// The synthetic 503.
    Synthetic,
}
