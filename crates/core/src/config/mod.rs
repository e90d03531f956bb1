//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MKS_SW_*)
//! 2. TOML config file (if MKS_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (MKS_SW_*)
/// 2. TOML config file (if MKS_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via MKS_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Name of the current cache store. Bumping it invalidates every
    /// other store at the next activation.
    ///
    /// Set via MKS_SW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin that relative request URLs resolve against.
    ///
    /// Set via MKS_SW_APP_ORIGIN environment variable.
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// Path of the app-shell document served to offline navigations.
    #[serde(default = "default_shell_path")]
    pub shell_path: String,

    /// Path opened when a notification click finds no page to focus.
    #[serde(default = "default_start_url")]
    pub start_url: String,

    /// User-Agent string for network requests.
    ///
    /// Set via MKS_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via MKS_SW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    ///
    /// Set via MKS_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Proceed straight from installed to activating.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Whether the user granted notification permission.
    ///
    /// Set via MKS_SW_NOTIFICATIONS_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    /// Icon and badge asset for push notifications.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    /// Title used when a push payload carries none.
    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    /// Body used when a push payload carries none.
    #[serde(default = "default_notification_body")]
    pub notification_body: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./mks-sw-cache.sqlite")
}

fn default_cache_version() -> String {
    "mks-muslim-v2".into()
}

fn default_app_origin() -> String {
    "http://localhost:8080".into()
}

fn default_shell_path() -> String {
    "/index.html".into()
}

fn default_start_url() -> String {
    "/".into()
}

fn default_user_agent() -> String {
    "mks-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    20 * 1024 * 1024 // audio assets are large
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

fn default_notification_icon() -> String {
    "/assets/images/My Logo Palestine.png".into()
}

fn default_notification_title() -> String {
    "MKS Muslim".into()
}

fn default_notification_body() -> String {
    "إشعار جديد".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            app_origin: default_app_origin(),
            shell_path: default_shell_path(),
            start_url: default_start_url(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            skip_waiting: true,
            notifications_enabled: true,
            notification_icon: default_notification_icon(),
            notification_title: default_notification_title(),
            notification_body: default_notification_body(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `MKS_SW_`
    /// 2. TOML file from `MKS_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("MKS_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("MKS_SW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
