//! Intercepted request descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Navigate => "navigate",
            RequestMode::SameOrigin => "same-origin",
            RequestMode::NoCors => "no-cors",
            RequestMode::Cors => "cors",
        }
    }
}

/// A request intercepted from a page.
///
/// Cache identity is method + URL; the mode only influences fallback
/// behaviour for navigations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
}

impl RequestDescriptor {
    pub fn new(method: impl AsRef<str>, url: Url, mode: RequestMode) -> Self {
        Self { method: method.as_ref().trim().to_ascii_uppercase(), url, mode }
    }

    /// A `GET` sub-resource request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Cors)
    }

    /// A `GET` page navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Navigate)
    }

    /// Only `GET` responses are ever read from or written to the cache.
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_method_normalized() {
        let req = RequestDescriptor::new(" post ", url("https://example.com/"), RequestMode::Cors);
        assert_eq!(req.method, "POST");
        assert!(!req.is_cacheable());
    }

    #[test]
    fn test_get_is_cacheable() {
        assert!(RequestDescriptor::get(url("https://example.com/a.png")).is_cacheable());
        assert!(RequestDescriptor::new("get", url("https://example.com/"), RequestMode::Cors).is_cacheable());
    }

    #[test]
    fn test_navigation() {
        let req = RequestDescriptor::navigate(url("https://example.com/quran.html"));
        assert!(req.is_navigation());
        assert!(!RequestDescriptor::get(url("https://example.com/")).is_navigation());
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&RequestMode::SameOrigin).unwrap(), "\"same-origin\"");
        let mode: RequestMode = serde_json::from_str("\"navigate\"").unwrap();
        assert_eq!(mode, RequestMode::Navigate);
    }

    #[test]
    fn test_display() {
        let req = RequestDescriptor::get(url("https://example.com/x"));
        assert_eq!(req.to_string(), "GET https://example.com/x");
    }
}
