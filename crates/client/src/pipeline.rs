//! The fetch pipeline behind every primary navigation.
//!
//! `IDLE -> REQUESTING -> {SUCCESS, ABORTED, ERROR} -> IDLE`. Errors hand the
//! URL to native navigation; aborts (supersession or timeout) end silently
//! and leave the DOM, cache and history untouched.

use ego_tree::NodeId;
use swapnav_core::{CacheEntry, Error, script_hash};
use url::Url;

use crate::dom::FetchedDocument;
use crate::engine::{ContentReplaced, InFlightRequest, LoadOutcome, Navigator};
use crate::fetch::{Fetcher, without_fragment};
use crate::runtime::{InlineScript, Runtime};

impl<F: Fetcher, R: Runtime> Navigator<F, R> {
    /// Navigate the content container to `url`.
    pub async fn load(&self, url: &Url, push_history: bool) -> LoadOutcome {
        let container = self.page.borrow().find(&self.selectors.content);
        let Some(container) = container else {
            return self.fall_back(url, None, Error::MissingContainer(self.config.content_selector.clone()));
        };

        let request = self.begin_request();

        let cached = self.cache.borrow().get_eligible(url).cloned();
        if let Some(entry) = cached {
            return self.replay(url, container, entry, &request, push_history).await;
        }

        tracing::info!(url = %url, request = request.id, "navigating");
        self.page.borrow_mut().set_loading(true);

        let fetched = tokio::select! {
            biased;
            _ = request.token.cancelled() => Err(Error::Aborted),
            result = tokio::time::timeout(self.config.request_timeout(), self.fetch_document(url)) => match result {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!(url = %url, timeout_ms = self.config.request_timeout_ms, "navigation timed out");
                    request.token.cancel();
                    Err(Error::Aborted)
                }
            },
        };

        let fetched = match fetched {
            Ok(doc) if !request.token.is_cancelled() => doc,
            Ok(_) => return self.abort(&request),
            Err(e) if e.is_abort() => return self.abort(&request),
            Err(e) => return self.fall_back(url, Some(&request), e),
        };

        self.swap_out(container);

        let imported = {
            let mut page = self.page.borrow_mut();
            let nodes = page.import_children(container, fetched.fragment());
            if let Some(title) = &fetched.title {
                page.set_title(title.clone());
            }
            if self.config.sync_head_seo {
                page.sync_head(&fetched.dom, &self.selectors.head_seo);
            }
            page.set_url(url.clone());
            nodes
        };

        {
            let mut cache = self.cache.borrow_mut();
            if cache.is_eligible(url.as_str()) {
                cache.put(
                    url,
                    CacheEntry::new(url, fetched.fragment_html())
                        .with_title(fetched.title.clone())
                        .with_live_nodes(imported)
                        .with_head_scripts(fetched.critical_scripts.clone()),
                );
            }
        }

        if push_history {
            self.runtime.push_state(url);
        }
        self.runtime.scroll_to_top(self.config.scroll_container.as_deref());
        self.page.borrow_mut().set_loading(false);

        self.run_critical_scripts(&fetched.critical_scripts);

        let report = self.assets.load(&self.runtime, &self.page, &fetched).await;
        tracing::debug!(
            stylesheets = report.stylesheets.len(),
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "external assets settled"
        );
        if request.token.is_cancelled() {
            return self.abort(&request);
        }

        self.run_inline_scripts(container, &fetched.critical_scripts);
        self.optimize_images(container);

        if !self.signal_ready(url, container, false, &request).await {
            return self.abort(&request);
        }
        self.finish_request(&request);
        LoadOutcome::Rendered
    }

    /// Fetch `url` and locate its fragment and critical scripts.
    pub(crate) async fn fetch_document(&self, url: &Url) -> Result<FetchedDocument, Error> {
        let response = self.fetcher.get(&without_fragment(url)).await?;
        let base = response.final_url.clone();
        let html = response.into_html()?;
        FetchedDocument::parse(base, &html, &self.selectors.content, &self.critical)
    }

    /// Serve `url` from the cache: no network access.
    async fn replay(
        &self, url: &Url, container: NodeId, entry: CacheEntry<NodeId>, request: &InFlightRequest, push_history: bool,
    ) -> LoadOutcome {
        self.swap_out(container);
        // Taken after the swap: replaying the current page re-captures its nodes first.
        let live = self.cache.borrow_mut().take_live_nodes(url);

        let reused_nodes = live.is_some();
        tracing::debug!(url = %url, reused_nodes, "cache hit");
        {
            let mut page = self.page.borrow_mut();
            match &live {
                Some(nodes) => page.attach_children(container, nodes),
                None => {
                    page.import_html(container, &entry.html);
                }
            }
            if let Some(title) = &entry.title {
                page.set_title(title.clone());
            }
            page.set_url(url.clone());
        }

        if push_history {
            self.runtime.push_state(url);
        }
        self.runtime.scroll_to_top(self.config.scroll_container.as_deref());

        self.run_critical_scripts(&entry.head_scripts);
        if !reused_nodes {
            self.run_inline_scripts(container, &entry.head_scripts);
        }

        if !self.signal_ready(url, container, true, request).await {
            return self.abort(request);
        }
        self.finish_request(request);
        LoadOutcome::Replayed { reused_nodes }
    }

    /// Detach the current content, committing it to the outgoing URL's entry when eligible.
    ///
    /// The arena never frees nodes: content of an ineligible page stays
    /// detached and unreferenced for the life of the `Page`.
    fn swap_out(&self, container: NodeId) {
        let mut page = self.page.borrow_mut();
        let outgoing = page.url().clone();
        let html = page.inner_html(container);
        let title = page.title().to_string();
        let nodes = page.detach_children(container);

        let mut cache = self.cache.borrow_mut();
        if !cache.is_eligible(outgoing.as_str()) {
            return;
        }
        let scripts = cache.get(&outgoing).map(|e| e.head_scripts.clone()).unwrap_or_default();
        cache.put(
            &outgoing,
            CacheEntry::new(&outgoing, html)
                .with_title(Some(title))
                .with_live_nodes(nodes)
                .with_head_scripts(scripts),
        );
    }

    /// Run critical scripts whose hash has not been seen this session.
    pub(crate) fn run_critical_scripts(&self, scripts: &[String]) {
        for text in scripts {
            let fresh = self.cache.borrow_mut().record_executed_script(script_hash(text));
            if fresh {
                self.runtime.execute_script(&InlineScript::critical(text.clone()));
            } else {
                tracing::debug!(len = text.len(), "critical script already executed");
            }
        }
    }

    /// Run not-yet-started inline scripts inside the container.
    fn run_inline_scripts(&self, container: NodeId, critical: &[String]) {
        let scripts = self.page.borrow().pending_inline_scripts(
            container,
            &self.config.skip_inline_script_types,
            &self.selectors.skip_scripts,
            critical,
        );
        for script in scripts {
            if let Some(node) = script.node {
                self.page.borrow_mut().mark_started(node);
            }
            self.runtime.execute_script(&script);
        }
    }

    fn optimize_images(&self, container: NodeId) {
        if !self.config.optimize_images {
            return;
        }
        let images = self.page.borrow().images_without_hint(container);
        if !images.is_empty() {
            self.runtime.optimize_images(&images);
        }
    }

    /// Wait the ready delay, then notify listeners. False if superseded meanwhile.
    async fn signal_ready(&self, url: &Url, container: NodeId, from_cache: bool, request: &InFlightRequest) -> bool {
        let delay = self.config.ready_delay();
        if !delay.is_zero() {
            tokio::select! {
                biased;
                _ = request.token.cancelled() => return false,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if request.token.is_cancelled() {
            return false;
        }
        self.emit(&ContentReplaced { url: url.clone(), container, from_cache });
        true
    }

    fn abort(&self, request: &InFlightRequest) -> LoadOutcome {
        if self.is_current(request) {
            self.page.borrow_mut().set_loading(false);
        }
        self.finish_request(request);
        tracing::debug!(request = request.id, "navigation aborted");
        LoadOutcome::Aborted
    }

    fn fall_back(&self, url: &Url, request: Option<&InFlightRequest>, error: Error) -> LoadOutcome {
        tracing::warn!(url = %url, error = %error, "falling back to native navigation");
        self.page.borrow_mut().set_loading(false);
        if let Some(request) = request {
            self.finish_request(request);
        }
        self.runtime.navigate(url);
        LoadOutcome::FellBack { reason: error.to_string() }
    }
}
