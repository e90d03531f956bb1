//! Worker lifecycle: install and activate.
//!
//! States advance `parsed → installing → installed → activating → active`.
//! Install only opens the current store; nothing is pre-fetched. Activation
//! deletes every store whose name is not the current version and then claims
//! all open pages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mks_sw_core::{CacheDb, Error};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::clients::Clients;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
    /// Install failed; this instance will never control pages.
    Redundant,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    pub version: String,
    /// Whether activation may proceed without waiting for old pages to close.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivationReport {
    pub version: String,
    /// Stale stores removed, in creation order.
    pub deleted: Vec<String>,
    /// Pages now controlled by this version.
    pub claimed: usize,
}

/// Drives one worker version through install and activation.
pub struct Lifecycle {
    db: CacheDb,
    clients: Arc<dyn Clients>,
    version: String,
    skip_waiting: AtomicBool,
    state: Mutex<LifecycleState>,
}

impl Lifecycle {
    pub fn new(db: CacheDb, clients: Arc<dyn Clients>, version: impl Into<String>, skip_waiting: bool) -> Self {
        Self {
            db,
            clients,
            version: version.into(),
            skip_waiting: AtomicBool::new(skip_waiting),
            state: Mutex::new(LifecycleState::Parsed),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.lock().await
    }

    /// Request activation without a waiting period.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    /// Open the current version's store.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless the worker is freshly parsed. A storage
    /// failure marks the worker redundant and propagates.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let mut state = self.state.lock().await;
        if *state != LifecycleState::Parsed {
            return Err(Error::InvalidState(format!("cannot install from {}", state.as_str())));
        }

        *state = LifecycleState::Installing;
        tracing::info!(version = %self.version, "installing");

        if let Err(err) = self.db.open_store(&self.version).await {
            *state = LifecycleState::Redundant;
            tracing::warn!(version = %self.version, "install failed: {}", err);
            return Err(err);
        }

        *state = LifecycleState::Installed;
        let skip_waiting = self.skip_waiting.load(Ordering::SeqCst);
        tracing::info!(version = %self.version, skip_waiting, "installed");

        Ok(InstallReport { version: self.version.clone(), skip_waiting })
    }

    /// Garbage-collect stale stores and claim open pages.
    ///
    /// Re-activating an active worker repeats the sweep, so the result is the
    /// same single store however many times it runs.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless installed or already active. On a storage
    /// failure the previous state is restored.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let mut state = self.state.lock().await;
        let previous = *state;
        if !matches!(previous, LifecycleState::Installed | LifecycleState::Active) {
            return Err(Error::InvalidState(format!("cannot activate from {}", previous.as_str())));
        }

        *state = LifecycleState::Activating;
        tracing::info!(version = %self.version, "activating");

        match self.sweep_and_claim().await {
            Ok(report) => {
                *state = LifecycleState::Active;
                tracing::info!(
                    version = %self.version,
                    deleted = report.deleted.len(),
                    claimed = report.claimed,
                    "active"
                );
                Ok(report)
            }
            Err(err) => {
                *state = previous;
                Err(err)
            }
        }
    }

    async fn sweep_and_claim(&self) -> Result<ActivationReport, Error> {
        let mut deleted = Vec::new();
        for name in self.db.store_names().await? {
            if name != self.version {
                tracing::info!("deleting old cache {}", name);
                self.db.delete_store(&name).await?;
                deleted.push(name);
            }
        }

        self.db.open_store(&self.version).await?;

        let claimed = self.clients.claim(&self.version).await?;

        Ok(ActivationReport { version: self.version.clone(), deleted, claimed })
    }
}
