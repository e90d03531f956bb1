//! Fetch interception and strategy dispatch.
//!
//! Every request a page issues passes through [`CacheRouter::handle_fetch`]:
//!
//! - Non-`GET` requests are passed through untouched; the cache is never read or written.
//! - `GET` requests are classified by URL and handled network-first-external,
//!   cache-first, or network-first.
//!
//! Cache writes are awaited but never fail the request: a failed write is
//! logged and the response is still returned.

pub mod classify;
mod strategies;

use std::sync::Arc;

use mks_sw_core::{CacheDb, Error, RequestDescriptor, ResponseSnapshot, ResponseSource};
use url::Url;

pub use classify::{Classifier, Rule, Strategy};

use crate::fetch::Network;

/// A response produced by the router, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct RoutedResponse {
    pub response: ResponseSnapshot,
    pub source: ResponseSource,
    pub strategy: Strategy,
}

/// Result of intercepting a request.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The router does not intervene; the caller performs the request itself.
    Passthrough,
    Respond(RoutedResponse),
}

impl FetchOutcome {
    pub fn into_response(self) -> Option<RoutedResponse> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Respond(routed) => Some(routed),
        }
    }
}

/// Routes intercepted requests between the current cache store and the network.
#[derive(Clone)]
pub struct CacheRouter {
    db: CacheDb,
    network: Arc<dyn Network>,
    classifier: Classifier,
    store: String,
    shell_url: Url,
}

impl CacheRouter {
    /// Create a router writing to `store` and falling back to `shell_url` for navigations.
    pub fn new(db: CacheDb, network: Arc<dyn Network>, store: impl Into<String>, shell_url: Url) -> Self {
        Self { db, network, classifier: Classifier::default(), store: store.into(), shell_url }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Name of the store this router reads and writes.
    pub fn store_name(&self) -> &str {
        &self.store
    }

    pub fn shell_url(&self) -> &Url {
        &self.shell_url
    }

    pub fn classify(&self, url: &Url) -> Strategy {
        self.classifier.classify(url)
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    /// Intercept one request.
    ///
    /// # Errors
    ///
    /// Only a network-first-external request with no network and no cached
    /// copy fails; every other path resolves to a response.
    pub async fn handle_fetch(&self, request: &RequestDescriptor) -> Result<FetchOutcome, Error> {
        if !request.is_cacheable() {
            tracing::debug!("passthrough {}", request);
            return Ok(FetchOutcome::Passthrough);
        }

        let strategy = self.classify(&request.url);
        tracing::debug!(strategy = strategy.as_str(), "routing {}", request);

        let routed = match strategy {
            Strategy::NetworkFirstExternal => self.network_first_external(request).await?,
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
        };

        Ok(FetchOutcome::Respond(routed))
    }
}
