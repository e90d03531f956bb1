//! Live network access for the cache router.
//!
//! ### Failure model
//! - Any HTTP status is a completed fetch; strategies decide what "ok" means.
//! - Only transport failures (DNS, connect, timeout, body read) and the
//!   body size limit are errors, and all of them map to `Error::Network` /
//!   `Error::FetchTooLarge` so callers can fall back to the cache.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: configurable
//! - Request timeout: configurable

pub mod scripted;
pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};

pub use scripted::ScriptedNetwork;
pub use url::{UrlError, resolve};

use mks_sw_core::{AppConfig, Error, RequestDescriptor, ResponseSnapshot};

/// Something that can satisfy a request from the live network.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "mks-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 20MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "mks-sw/0.1".to_string(),
            max_bytes: 20 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed network client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn transport_error(err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Network(format!("timeout: {}", err))
    } else {
        Error::Network(err.to_string())
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let response = self
            .http
            .request(method, request.url.as_str())
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await.map_err(|e| transport_error(&e))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            request,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(ResponseSnapshot {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "mks-sw/0.1");
        assert_eq!(config.max_bytes, 20 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test/1".into(), max_bytes: 1024, timeout_ms: 500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test/1");
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.max_redirects, 5);
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }
}
