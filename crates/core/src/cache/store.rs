//! Cache entries and the store that owns them.

use std::collections::HashMap;
use url::Url;

use super::hash::ExecutedScripts;
use crate::config::NavConfig;

/// A previously rendered content fragment.
///
/// `N` is the live-node handle of the page the entry was captured from.
/// When `live_nodes` is set, the entry is the only owner of those detached
/// nodes until it is replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<N> {
    /// Cache key of the page.
    pub url: String,
    /// Serialized inner HTML of the fragment.
    pub html: String,
    /// Document title to restore on replay.
    pub title: Option<String>,
    /// Detached live nodes, in document order.
    pub live_nodes: Option<Vec<N>>,
    /// Critical inline scripts extracted from the page.
    pub head_scripts: Vec<String>,
}

impl<N> CacheEntry<N> {
    /// New entry without live nodes.
    pub fn new(url: &Url, html: impl Into<String>) -> Self {
        Self { url: cache_key(url), html: html.into(), title: None, live_nodes: None, head_scripts: Vec::new() }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_live_nodes(mut self, nodes: Vec<N>) -> Self {
        self.live_nodes = Some(nodes);
        self
    }

    pub fn with_head_scripts(mut self, scripts: Vec<String>) -> Self {
        self.head_scripts = scripts;
        self
    }
}

/// Normalize a URL into a cache key: identical apart from the fragment.
pub fn cache_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.to_string()
}

/// Session-scoped page cache plus the executed critical script registry.
#[derive(Debug)]
pub struct CacheStore<N> {
    enabled: bool,
    ignore_params: Vec<String>,
    entries: HashMap<String, CacheEntry<N>>,
    executed: ExecutedScripts,
}

impl<N> CacheStore<N> {
    /// Create an empty store governed by `cache_enabled` and `ignore_url_params`.
    pub fn new(config: &NavConfig) -> Self {
        Self {
            enabled: config.cache_enabled,
            ignore_params: config.ignore_url_params.clone(),
            entries: HashMap::new(),
            executed: ExecutedScripts::default(),
        }
    }

    /// Whether `url` may be written to the cache.
    ///
    /// False when caching is off, when the URL does not parse, or when its
    /// query names any ignored parameter.
    pub fn is_eligible(&self, url: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        !parsed
            .query_pairs()
            .any(|(name, _)| self.ignore_params.iter().any(|p| p.as_str() == name.as_ref()))
    }

    pub fn get(&self, url: &Url) -> Option<&CacheEntry<N>> {
        self.entries.get(&cache_key(url))
    }

    /// Entry for `url`, only if one exists and the URL is still eligible.
    pub fn get_eligible(&self, url: &Url) -> Option<&CacheEntry<N>> {
        if !self.is_eligible(url.as_str()) {
            return None;
        }
        self.get(url)
    }

    /// Insert or overwrite the entry for `url`.
    pub fn put(&mut self, url: &Url, mut entry: CacheEntry<N>) {
        entry.url = cache_key(url);
        tracing::debug!(url = %entry.url, live = entry.live_nodes.is_some(), "cache put");
        self.entries.insert(entry.url.clone(), entry);
    }

    /// Take the live nodes out of an entry, leaving the serialized form behind.
    pub fn take_live_nodes(&mut self, url: &Url) -> Option<Vec<N>> {
        self.entries.get_mut(&cache_key(url)).and_then(|e| e.live_nodes.take())
    }

    pub fn record_executed_script(&mut self, hash: impl Into<String>) -> bool {
        self.executed.record(hash)
    }

    pub fn has_executed_script(&self, hash: &str) -> bool {
        self.executed.contains(hash)
    }

    pub fn executed_scripts(&self) -> &ExecutedScripts {
        &self.executed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry and the script registry. Only used on engine teardown.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.executed.clear();
    }
}
