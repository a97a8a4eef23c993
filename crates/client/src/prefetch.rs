//! Speculative background fetches that only ever write to the cache.
//!
//! Prefetches are independent of the primary request and of each other;
//! the only coordination is a per-URL pending marker.

use futures_util::future::join_all;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use swapnav_core::{CacheEntry, cache_key};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::dom::{LinkRef, Modifiers};
use crate::engine::Navigator;
use crate::fetch::{Fetcher, resolve};
use crate::matcher::Decision;
use crate::runtime::Runtime;

/// What triggered a prefetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchTrigger {
    /// Hover, focus or press, after the debounce delay.
    Intent,
    /// The link entered the viewport.
    Viewport,
}

/// Why a prefetch did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchSkip {
    Disabled,
    Rejected,
    Ineligible,
    Cached,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchOutcome {
    /// A cache entry was written.
    Stored(Url),
    Skipped(PrefetchSkip),
    /// The fetch or parse failed; nothing was written.
    Failed(String),
    /// The debounce was interrupted before the fetch started.
    Cancelled,
}

/// Prefetch bookkeeping owned by a [`Navigator`].
#[derive(Debug, Default)]
pub(crate) struct PrefetchState {
    pending: RefCell<HashSet<String>>,
    intents: RefCell<HashMap<String, (u64, CancellationToken)>>,
    next_intent: Cell<u64>,
    observed: Cell<usize>,
}

impl PrefetchState {
    pub(crate) fn clear(&self) {
        for (_, (_, token)) in self.intents.borrow_mut().drain() {
            token.cancel();
        }
        self.pending.borrow_mut().clear();
        self.observed.set(0);
    }

    fn start_intent(&self, key: &str) -> (u64, CancellationToken) {
        let id = self.next_intent.get() + 1;
        self.next_intent.set(id);
        let token = CancellationToken::new();
        if let Some((_, previous)) = self.intents.borrow_mut().insert(key.to_string(), (id, token.clone())) {
            previous.cancel();
        }
        (id, token)
    }

    fn end_intent(&self, key: &str, id: u64) {
        let mut intents = self.intents.borrow_mut();
        if intents.get(key).is_some_and(|(current, _)| *current == id) {
            intents.remove(key);
        }
    }
}

impl<F: Fetcher, R: Runtime> Navigator<F, R> {
    /// Debounced intent signal for `link`.
    ///
    /// Waits `prefetch_delay_ms`, then prefetches
    /// unless [`Navigator::handle_intent_end`] or a newer intent for the same
    /// URL interrupted the wait.
    pub async fn handle_intent(&self, link: &LinkRef) -> PrefetchOutcome {
        if !self.config.prefetch_on_hover {
            return PrefetchOutcome::Skipped(PrefetchSkip::Disabled);
        }
        let current = self.page.borrow().url().clone();
        let Ok(url) = resolve(&link.href, &current) else {
            return PrefetchOutcome::Skipped(PrefetchSkip::Rejected);
        };
        let key = cache_key(&url);
        let (id, token) = self.prefetch.start_intent(&key);

        let delay = self.config.prefetch_delay();
        let interrupted = tokio::select! {
            biased;
            _ = token.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        };
        self.prefetch.end_intent(&key, id);
        if interrupted {
            tracing::debug!(url = %url, "intent withdrawn before prefetch");
            return PrefetchOutcome::Cancelled;
        }

        self.prefetch(link, PrefetchTrigger::Intent).await
    }

    /// Pointer left or focus moved away: cancel a pending debounced prefetch.
    pub fn handle_intent_end(&self, href: &str) -> bool {
        let current = self.page.borrow().url().clone();
        let Ok(url) = resolve(href, &current) else {
            return false;
        };
        match self.prefetch.intents.borrow_mut().remove(&cache_key(&url)) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Register links that entered the viewport and prefetch them.
    ///
    /// Only same-origin links count, and at most `prefetch_max_entries` are
    /// ever observed over the engine's lifetime.
    pub async fn observe_viewport(&self, links: &[LinkRef]) -> Vec<PrefetchOutcome> {
        if !self.config.prefetch_in_viewport {
            return Vec::new();
        }
        let current = self.page.borrow().url().clone();

        let mut accepted = Vec::new();
        for link in links {
            if self.prefetch.observed.get() >= self.config.prefetch_max_entries {
                tracing::debug!(max = self.config.prefetch_max_entries, "viewport observation limit reached");
                break;
            }
            let same_origin = resolve(&link.href, &current).is_ok_and(|u| u.origin() == current.origin());
            if !same_origin {
                continue;
            }
            self.prefetch.observed.set(self.prefetch.observed.get() + 1);
            accepted.push(link);
        }

        join_all(accepted.into_iter().map(|link| self.prefetch(link, PrefetchTrigger::Viewport))).await
    }

    /// Prefetch `link` into the cache now.
    pub async fn prefetch(&self, link: &LinkRef, trigger: PrefetchTrigger) -> PrefetchOutcome {
        let enabled = match trigger {
            PrefetchTrigger::Intent => self.config.prefetch_on_hover,
            PrefetchTrigger::Viewport => self.config.prefetch_in_viewport,
        };
        if !enabled {
            return PrefetchOutcome::Skipped(PrefetchSkip::Disabled);
        }
        let current = self.page.borrow().url().clone();
        let url = match self.matcher.decide(&link.href, &current, link, Modifiers::none()) {
            Decision::Intercept(url) => url,
            Decision::Native(reason) => {
                tracing::trace!(href = %link.href, ?reason, "prefetch rejected");
                return PrefetchOutcome::Skipped(PrefetchSkip::Rejected);
            }
        };

        {
            let cache = self.cache.borrow();
            if !cache.is_eligible(url.as_str()) {
                return PrefetchOutcome::Skipped(PrefetchSkip::Ineligible);
            }
            if cache.get(&url).is_some() {
                return PrefetchOutcome::Skipped(PrefetchSkip::Cached);
            }
        }

        let key = cache_key(&url);
        if !self.prefetch.pending.borrow_mut().insert(key.clone()) {
            return PrefetchOutcome::Skipped(PrefetchSkip::Pending);
        }

        tracing::debug!(url = %url, ?trigger, "prefetching");
        let result = tokio::time::timeout(self.config.request_timeout(), self.fetch_document(&url)).await;
        self.prefetch.pending.borrow_mut().remove(&key);

        let fetched = match result {
            Ok(Ok(fetched)) => fetched,
            Ok(Err(e)) => {
                tracing::debug!(url = %url, error = %e, "prefetch failed");
                return PrefetchOutcome::Failed(e.to_string());
            }
            Err(_) => {
                tracing::debug!(url = %url, "prefetch timed out");
                return PrefetchOutcome::Failed(format!("timed out after {}ms", self.config.request_timeout_ms));
            }
        };

        let mut cache = self.cache.borrow_mut();
        if !cache.is_eligible(url.as_str()) {
            return PrefetchOutcome::Skipped(PrefetchSkip::Ineligible);
        }
        cache.put(
            &url,
            CacheEntry::new(&url, fetched.fragment_html())
                .with_title(fetched.title.clone())
                .with_head_scripts(fetched.critical_scripts.clone()),
        );
        PrefetchOutcome::Stored(url)
    }

    pub fn is_prefetch_pending(&self, url: &Url) -> bool {
        self.prefetch.pending.borrow().contains(&cache_key(url))
    }

    pub fn pending_prefetches(&self) -> usize {
        self.prefetch.pending.borrow().len()
    }

    /// Viewport links observed so far.
    pub fn observed_links(&self) -> usize {
        self.prefetch.observed.get()
    }
}
