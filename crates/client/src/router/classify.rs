//! Request classification.
//!
//! An ordered rule table maps URL shapes to caching strategies. The first
//! matching rule wins; anything unmatched is network-first.

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Caching strategy for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serve from cache; only touch the network on a miss.
    CacheFirst,
    /// Third-party API: prefer live data, fall back to cache, else fail.
    NetworkFirstExternal,
    /// App code and markup: prefer live data, fall back to cache, then shell, then 503.
    NetworkFirst,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirstExternal => "network-first-external",
            Strategy::NetworkFirst => "network-first",
        }
    }
}

/// Hosts whose responses are live API data.
pub const EXTERNAL_API_HOSTS: &[&str] =
    &["api.aladhan.com", "api.alquran.cloud", "api.hadith.gading.dev", "api3.islamhouse.com"];

/// Font and CDN hosts served cache-first.
pub const STATIC_HOSTS: &[&str] = &["fonts.googleapis.com", "fonts.gstatic.com", "cdnjs.cloudflare.com"];

static IMAGE_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpg|jpeg|gif|svg|ico|webp)$").expect("valid image pattern"));

static AUDIO_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(mp3|wav|ogg|aac)$").expect("valid audio pattern"));

#[derive(Debug, Clone)]
enum Matcher {
    /// Exact hostname equality.
    Host(String),
    /// Pattern over the URL path.
    Path(Regex),
}

impl Matcher {
    fn matches(&self, url: &Url) -> bool {
        match self {
            Matcher::Host(host) => url.host_str() == Some(host.as_str()),
            Matcher::Path(re) => re.is_match(url.path()),
        }
    }
}

/// One entry of the classification table.
#[derive(Debug, Clone)]
pub struct Rule {
    matcher: Matcher,
    strategy: Strategy,
}

impl Rule {
    pub fn host(host: &str, strategy: Strategy) -> Self {
        Self { matcher: Matcher::Host(host.to_ascii_lowercase()), strategy }
    }

    pub fn path(pattern: Regex, strategy: Strategy) -> Self {
        Self { matcher: Matcher::Path(pattern), strategy }
    }
}

/// Ordered rule table; first match wins.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
    fallback: Strategy,
}

impl Default for Classifier {
    /// External API hosts first, then heavy static assets.
    fn default() -> Self {
        let mut rules: Vec<Rule> =
            EXTERNAL_API_HOSTS.iter().map(|h| Rule::host(h, Strategy::NetworkFirstExternal)).collect();
        rules.push(Rule::path(IMAGE_EXT.clone(), Strategy::CacheFirst));
        rules.push(Rule::path(AUDIO_EXT.clone(), Strategy::CacheFirst));
        rules.extend(STATIC_HOSTS.iter().map(|h| Rule::host(h, Strategy::CacheFirst)));

        Self { rules, fallback: Strategy::NetworkFirst }
    }
}

impl Classifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules, fallback: Strategy::NetworkFirst }
    }

    pub fn classify(&self, url: &Url) -> Strategy {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(url))
            .map(|rule| rule.strategy)
            .unwrap_or(self.fallback)
    }
}
