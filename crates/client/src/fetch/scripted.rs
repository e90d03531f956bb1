//! In-memory network with scripted replies.
//!
//! Used to run the worker fully offline and to observe exactly which
//! requests reached the network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use mks_sw_core::{Error, RequestDescriptor, ResponseSnapshot};

use super::Network;

#[derive(Debug, Clone)]
enum Reply {
    Respond(ResponseSnapshot),
    Fail(String),
}

/// A `Network` that answers from a URL → reply table.
///
/// Unscripted URLs fail like an unreachable host. Every call is recorded,
/// including calls made while offline.
#[derive(Debug)]
pub struct ScriptedNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    online: AtomicBool,
}

impl Default for ScriptedNetwork {
    fn default() -> Self {
        Self { replies: Mutex::new(HashMap::new()), calls: Mutex::new(Vec::new()), online: AtomicBool::new(true) }
    }
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `url` with `response`.
    pub fn respond(&self, url: &str, response: ResponseSnapshot) {
        self.lock_replies().insert(url.to_string(), Reply::Respond(response));
    }

    /// Make requests for `url` fail with a transport error.
    pub fn fail(&self, url: &str, reason: &str) {
        self.lock_replies().insert(url.to_string(), Reply::Fail(reason.to_string()));
    }

    /// Toggle connectivity. While offline every fetch fails.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Requests seen so far, as `METHOD URL`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, HashMap<String, Reply>> {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.to_string());
        }

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }

        match self.lock_replies().get(request.url.as_str()).cloned() {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(reason)) => Err(Error::Network(reason)),
            None => Err(Error::Network(format!("no route to {}", request.url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_scripted_reply() {
        let net = ScriptedNetwork::new();
        net.respond("https://example.com/", ResponseSnapshot::new(200, "hi"));

        let resp = net.fetch(&get("https://example.com/")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(net.calls(), vec!["GET https://example.com/".to_string()]);
    }

    #[tokio::test]
    async fn test_unscripted_fails() {
        let net = ScriptedNetwork::new();
        let err = net.fetch(&get("https://example.com/missing")).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_offline_fails_and_records() {
        let net = ScriptedNetwork::new();
        net.respond("https://example.com/", ResponseSnapshot::new(200, "hi"));
        net.set_online(false);

        assert!(net.fetch(&get("https://example.com/")).await.is_err());
        assert_eq!(net.call_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let net = ScriptedNetwork::new();
        net.fail("https://example.com/", "connection refused");
        let err = net.fetch(&get("https://example.com/")).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
