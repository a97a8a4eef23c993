//! The navigation engine instance.
//!
//! All session state (page cache, executed-script registry, in-flight
//! request, pending prefetches, listeners) lives on one [`Navigator`].
//! The engine is single-threaded: state sits in `RefCell`s and no borrow is
//! held across an await point.

use ego_tree::NodeId;
use serde::Serialize;
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;
use swapnav_core::{CacheStore, Error, NavConfig, script_hash};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::assets::AssetLoader;
use crate::dom::{CriticalScriptRules, Page, Selectors, extract_critical_scripts};
use crate::fetch::Fetcher;
use crate::matcher::{Matcher, NavigationHooks};
use crate::prefetch::PrefetchState;
use crate::runtime::Runtime;

/// Primary navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavState {
    Idle,
    Requesting,
}

/// Terminal outcome of one primary navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Fetched from the network and swapped in.
    Rendered,
    /// Replayed from the page cache without network access.
    Replayed { reused_nodes: bool },
    /// Superseded by a newer navigation or timed out.
    Aborted,
    /// Handed to native navigation after an error.
    FellBack { reason: String },
}

/// Signal emitted once new content is in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentReplaced {
    pub url: Url,
    pub container: NodeId,
    pub from_cache: bool,
}

type Listener = Rc<dyn Fn(&ContentReplaced)>;

/// The single primary request allowed at a time.
#[derive(Debug, Clone)]
pub(crate) struct InFlightRequest {
    pub(crate) id: u64,
    pub(crate) token: CancellationToken,
}

/// Client-side navigation engine bound to one live page.
pub struct Navigator<F, R> {
    pub(crate) config: NavConfig,
    pub(crate) matcher: Matcher,
    pub(crate) selectors: Selectors,
    pub(crate) critical: CriticalScriptRules,
    pub(crate) assets: AssetLoader,
    pub(crate) fetcher: F,
    pub(crate) runtime: R,
    pub(crate) page: RefCell<Page>,
    pub(crate) cache: RefCell<CacheStore<NodeId>>,
    pub(crate) in_flight: RefCell<Option<InFlightRequest>>,
    /// Click waiting out its per-link delay.
    pub(crate) pending_click: RefCell<Option<CancellationToken>>,
    pub(crate) next_request: Cell<u64>,
    pub(crate) state: Cell<NavState>,
    pub(crate) prefetch: PrefetchState,
    pub(crate) listeners: RefCell<Vec<Listener>>,
    pub(crate) initialized: Cell<bool>,
}

impl<F: Fetcher, R: Runtime> Navigator<F, R> {
    /// Build an engine for `page`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration fails validation or the
    /// content selector does not parse. Broken URL patterns and secondary
    /// selectors are dropped instead; see [`Navigator::diagnostics`].
    pub fn new(config: NavConfig, page: Page, fetcher: F, runtime: R) -> Result<Self, Error> {
        config.validate()?;
        let selectors = Selectors::compile(&config)?;
        let matcher = Matcher::new(&config);

        for diagnostic in matcher.rules().diagnostics().iter().chain(selectors.diagnostics()) {
            tracing::warn!(%diagnostic, "configuration rule dropped");
        }

        let critical = CriticalScriptRules {
            keywords: config.critical_script_keywords.clone(),
            min_len: config.min_critical_script_len,
        };

        // The platform already ran the initial document's scripts.
        let mut cache = CacheStore::new(&config);
        for text in extract_critical_scripts(page.dom(), &critical) {
            cache.record_executed_script(script_hash(&text));
        }

        Ok(Self {
            matcher,
            selectors,
            critical,
            assets: AssetLoader::new(&config),
            fetcher,
            runtime,
            page: RefCell::new(page),
            cache: RefCell::new(cache),
            in_flight: RefCell::new(None),
            pending_click: RefCell::new(None),
            next_request: Cell::new(0),
            state: Cell::new(NavState::Idle),
            prefetch: PrefetchState::default(),
            listeners: RefCell::new(Vec::new()),
            initialized: Cell::new(false),
            config,
        })
    }

    /// Install the escape-hatch hooks.
    pub fn with_hooks(mut self, hooks: impl NavigationHooks + 'static) -> Self {
        self.matcher.set_hooks(Box::new(hooks));
        self
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn page(&self) -> Ref<'_, Page> {
        self.page.borrow()
    }

    pub fn cache(&self) -> Ref<'_, CacheStore<NodeId>> {
        self.cache.borrow()
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn state(&self) -> NavState {
        self.state.get()
    }

    /// Messages for every configuration rule dropped at construction.
    pub fn diagnostics(&self) -> Vec<String> {
        self.matcher
            .rules()
            .diagnostics()
            .iter()
            .chain(self.selectors.diagnostics())
            .cloned()
            .collect()
    }

    /// Register a content-replaced listener.
    pub fn on_content_replaced(&self, listener: impl Fn(&ContentReplaced) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Tear down all session state: cancels the in-flight request and
    /// pending intent timers, empties the cache and script registry, drops
    /// listeners and allows a fresh `init`.
    pub fn reset(&self) {
        if let Some(request) = self.in_flight.borrow_mut().take() {
            request.token.cancel();
        }
        if let Some(click) = self.pending_click.borrow_mut().take() {
            click.cancel();
        }
        self.state.set(NavState::Idle);
        self.page.borrow_mut().set_loading(false);
        self.cache.borrow_mut().clear();
        self.prefetch.clear();
        self.listeners.borrow_mut().clear();
        self.initialized.set(false);
        tracing::debug!("navigator reset");
    }

    /// Cancel the current primary request, if any, and register a new one.
    pub(crate) fn begin_request(&self) -> InFlightRequest {
        if let Some(click) = self.pending_click.borrow_mut().take() {
            click.cancel();
        }
        let id = self.next_request.get() + 1;
        self.next_request.set(id);
        let request = InFlightRequest { id, token: CancellationToken::new() };
        if let Some(previous) = self.in_flight.borrow_mut().replace(request.clone()) {
            tracing::debug!(superseded = previous.id, by = id, "cancelling in-flight navigation");
            previous.token.cancel();
        }
        self.state.set(NavState::Requesting);
        request
    }

    /// Whether `request` is still the registered primary request.
    pub(crate) fn is_current(&self, request: &InFlightRequest) -> bool {
        self.in_flight.borrow().as_ref().is_some_and(|r| r.id == request.id)
    }

    /// Return to idle if `request` is still the registered one.
    pub(crate) fn finish_request(&self, request: &InFlightRequest) {
        if self.is_current(request) {
            self.in_flight.borrow_mut().take();
            self.state.set(NavState::Idle);
        }
    }

    pub(crate) fn emit(&self, event: &ContentReplaced) {
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(event);
        }
    }
}
