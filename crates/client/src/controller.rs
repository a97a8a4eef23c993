//! Link activation and history traversal entry points.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::dom::{LinkRef, Modifiers};
use crate::engine::{LoadOutcome, Navigator};
use crate::fetch::{Fetcher, resolve, same_document};
use crate::matcher::{Decision, Rejection, Verdict};
use crate::runtime::Runtime;

/// Result of a link activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickOutcome {
    /// Left to the platform. `None` when the engine is not initialized.
    Native(Option<Rejection>),
    /// In-document anchor: scrolled without fetching.
    HashScroll,
    /// Destination is the current document; nothing to do.
    SamePage,
    Navigated(LoadOutcome),
}

/// Result of a history traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PopOutcome {
    /// The engine is not initialized.
    Ignored,
    /// Same document, only the fragment changed.
    Scrolled,
    Navigated(LoadOutcome),
    /// The restored URL is not one the engine owns.
    Reloaded,
}

impl<F: Fetcher, R: Runtime> Navigator<F, R> {
    /// Bind the engine to its document. Returns false if disabled, vetoed
    /// by the init hook, or already initialized.
    pub fn init(&self) -> bool {
        if self.initialized.get() {
            tracing::debug!("already initialized");
            return false;
        }
        if !self.config.enabled {
            tracing::info!("navigation engine disabled by configuration");
            return false;
        }
        if self.matcher.hooks().is_some_and(|h| h.should_abort_init() == Verdict::Yes) {
            tracing::info!("navigation engine initialization aborted by hook");
            return false;
        }
        self.initialized.set(true);
        tracing::info!(url = %self.page.borrow().url(), "navigation engine initialized");
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Handle activation of `link`.
    pub async fn handle_click(&self, link: &LinkRef, modifiers: Modifiers) -> ClickOutcome {
        if !self.initialized.get() {
            return ClickOutcome::Native(None);
        }
        let current = self.page.borrow().url().clone();

        if self.scroll_to_anchor(link, modifiers, &current) {
            return ClickOutcome::HashScroll;
        }

        let url = match self.matcher.decide(&link.href, &current, link, modifiers) {
            Decision::Intercept(url) => url,
            Decision::Native(reason) => {
                tracing::debug!(href = %link.href, ?reason, "leaving link to the platform");
                return ClickOutcome::Native(Some(reason));
            }
        };

        if same_document(&url, &current) {
            return ClickOutcome::SamePage;
        }

        let click = CancellationToken::new();
        if let Some(previous) = self.pending_click.borrow_mut().replace(click.clone()) {
            previous.cancel();
        }
        if let Some(delay) = link.delay.filter(|d| !d.is_zero()) {
            tokio::select! {
                biased;
                _ = click.cancelled() => {
                    tracing::debug!(href = %link.href, "delayed click superseded");
                    return ClickOutcome::Navigated(LoadOutcome::Aborted);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        ClickOutcome::Navigated(self.load(&url, true).await)
    }

    /// Handle a back/forward traversal that restored `url`.
    pub async fn handle_pop_state(&self, url: &Url) -> PopOutcome {
        if !self.initialized.get() {
            return PopOutcome::Ignored;
        }
        let current = self.page.borrow().url().clone();

        if same_document(url, &current) {
            match url.fragment().filter(|f| !f.is_empty()) {
                Some(fragment) if self.page.borrow().element_by_id(fragment).is_some() => {
                    self.runtime.scroll_to_fragment(fragment);
                }
                _ => self.runtime.scroll_to_top(self.config.scroll_container.as_deref()),
            }
            self.page.borrow_mut().set_url(url.clone());
            return PopOutcome::Scrolled;
        }

        let link = LinkRef::new(url.as_str());
        match self.matcher.decide(url.as_str(), &current, &link, Modifiers::none()) {
            Decision::Intercept(url) => PopOutcome::Navigated(self.load(&url, false).await),
            Decision::Native(reason) => {
                tracing::debug!(url = %url, ?reason, "history entry not owned, reloading");
                self.page.borrow_mut().set_url(url.clone());
                self.runtime.reload();
                PopOutcome::Reloaded
            }
        }
    }

    /// Same-document fragment link with an existing target: scroll and record
    /// the fragment in history.
    fn scroll_to_anchor(&self, link: &LinkRef, modifiers: Modifiers, current: &Url) -> bool {
        if modifiers.any() || link.opens_new_context() {
            return false;
        }
        let Ok(url) = resolve(&link.href, current) else {
            return false;
        };
        let Some(fragment) = url.fragment().filter(|f| !f.is_empty()) else {
            return false;
        };
        if !same_document(&url, current) || self.page.borrow().element_by_id(fragment).is_none() {
            return false;
        }

        self.runtime.scroll_to_fragment(fragment);
        self.runtime.push_state(&url);
        self.page.borrow_mut().set_url(url.clone());
        true
    }
}
