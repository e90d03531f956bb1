//! Offline cache worker for mks-sw.
//!
//! This crate provides the live network fetch, request classification, the
//! three caching strategies, lifecycle control over versioned stores, and the
//! sync/push hooks that talk back to connected pages.

pub mod clients;
pub mod fetch;
pub mod lifecycle;
pub mod push;
pub mod router;
pub mod sync;
pub mod worker;

pub use clients::{ClientHub, ClientId, ClientInfo, ClientKind, ClientMessage, Clients};
pub use fetch::{FetchClient, FetchConfig, Network, ScriptedNetwork};
pub use lifecycle::{ActivationReport, InstallReport, Lifecycle, LifecycleState};
pub use push::{
    ClickOutcome, Notification, NotificationCenter, NotificationDefaults, NotificationSink, PushPayload, PushPresenter,
};
pub use router::{CacheRouter, Classifier, FetchOutcome, RoutedResponse, Strategy};
pub use sync::{SyncNotifier, SyncReport};
pub use worker::{OfflineWorker, Served};
