//! The offline worker as one component.
//!
//! [`OfflineWorker`] wires the router, lifecycle, sync notifier and push
//! presenter over a shared cache, network, client set and notification sink,
//! and exposes one method per inbound signal.

use std::sync::Arc;

use mks_sw_core::{AppConfig, CacheDb, Error, RequestDescriptor, RequestMode, ResponseSnapshot, ResponseSource};
use url::Url;

use crate::clients::Clients;
use crate::fetch::{Network, resolve};
use crate::lifecycle::{ActivationReport, InstallReport, Lifecycle, LifecycleState};
use crate::push::{ClickOutcome, Notification, NotificationDefaults, NotificationSink, PushPresenter};
use crate::router::{CacheRouter, FetchOutcome, Strategy};
use crate::sync::{SyncNotifier, SyncReport};

/// A response delivered to a page.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub source: ResponseSource,
    /// `None` when the request bypassed the router.
    pub strategy: Option<Strategy>,
}

pub struct OfflineWorker {
    db: CacheDb,
    origin: Url,
    router: CacheRouter,
    lifecycle: Lifecycle,
    sync: SyncNotifier,
    push: PushPresenter,
}

impl OfflineWorker {
    /// Build a worker for `config.cache_version`.
    ///
    /// # Errors
    ///
    /// `Error::InvalidUrl` if the app origin, shell path or start URL do not
    /// resolve.
    pub fn new(
        db: CacheDb, network: Arc<dyn Network>, clients: Arc<dyn Clients>, sink: Arc<dyn NotificationSink>,
        config: &AppConfig,
    ) -> Result<Self, Error> {
        let origin = Url::parse(&config.app_origin)
            .map_err(|e| Error::InvalidUrl(format!("app origin {}: {e}", config.app_origin)))?;
        let shell_url = resolve(&config.shell_path, &origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let start_url = resolve(&config.start_url, &origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let router = CacheRouter::new(db.clone(), network, config.cache_version.clone(), shell_url);
        let lifecycle = Lifecycle::new(db.clone(), clients.clone(), config.cache_version.clone(), config.skip_waiting);
        let sync = SyncNotifier::new(clients.clone());
        let push = PushPresenter::new(sink, clients, NotificationDefaults::from(config), start_url)
            .with_enabled(config.notifications_enabled);

        Ok(Self { db, origin, router, lifecycle, sync, push })
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn router(&self) -> &CacheRouter {
        &self.router
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Name of the current cache store.
    pub fn version(&self) -> &str {
        self.lifecycle.version()
    }

    pub async fn state(&self) -> LifecycleState {
        self.lifecycle.state().await
    }

    /// Resolve a page-relative or absolute URL against the app origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(input, &self.origin).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Build a request descriptor from page-supplied parts.
    pub fn request(&self, method: &str, url: &str, mode: RequestMode) -> Result<RequestDescriptor, Error> {
        if method.trim().is_empty() {
            return Err(Error::InvalidInput("method cannot be empty".into()));
        }
        Ok(RequestDescriptor::new(method, self.resolve(url)?, mode))
    }

    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.lifecycle.activate().await
    }

    /// Serve one page request.
    ///
    /// Only an active worker routes requests. Until activation, and for
    /// requests the router passes through, the page talks straight to the
    /// network and nothing is cached.
    ///
    /// # Errors
    ///
    /// A passthrough whose fetch fails, or a network-first-external request
    /// with neither network nor cache.
    pub async fn fetch(&self, request: &RequestDescriptor) -> Result<Served, Error> {
        let state = self.lifecycle.state().await;
        if state != LifecycleState::Active {
            tracing::debug!(state = state.as_str(), "not controlling {}", request.url);
            return self.passthrough(request).await;
        }

        match self.router.handle_fetch(request).await? {
            FetchOutcome::Respond(routed) => {
                Ok(Served { response: routed.response, source: routed.source, strategy: Some(routed.strategy) })
            }
            FetchOutcome::Passthrough => self.passthrough(request).await,
        }
    }

    async fn passthrough(&self, request: &RequestDescriptor) -> Result<Served, Error> {
        let response = self.router.network().fetch(request).await?;
        Ok(Served { response, source: ResponseSource::Network, strategy: None })
    }

    pub async fn sync(&self, tag: &str) -> Option<SyncReport> {
        self.sync.on_sync(tag).await
    }

    pub async fn periodic_sync(&self, tag: &str) -> Option<SyncReport> {
        self.sync.on_periodic_sync(tag).await
    }

    pub async fn push(&self, data: Option<&[u8]>) -> Option<Notification> {
        self.push.on_push(data).await
    }

    pub async fn notification_click(&self, notification: &Notification) -> Result<ClickOutcome, Error> {
        self.push.on_notification_click(notification).await
    }
}
