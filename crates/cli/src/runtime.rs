//! A runtime with no JavaScript engine or viewport.
//!
//! Scripts are "executed" by logging them, external scripts are fetched so
//! that broken assets surface as load failures, and history moves are kept
//! in memory.

use async_trait::async_trait;
use std::cell::RefCell;
use swapnav_client::{AssetError, Fetcher, HttpFetcher, ImageRef, InlineScript, Runtime};
use url::Url;

pub struct HeadlessRuntime {
    fetcher: HttpFetcher,
    history: RefCell<Vec<Url>>,
    left: RefCell<Option<Url>>,
}

impl HeadlessRuntime {
    pub fn new(fetcher: HttpFetcher, start: Url) -> Self {
        Self { fetcher, history: RefCell::new(vec![start]), left: RefCell::new(None) }
    }

    /// History entries pushed so far, starting with the initial URL.
    pub fn history(&self) -> Vec<Url> {
        self.history.borrow().clone()
    }

    /// URL handed to native navigation, if the engine gave up ownership.
    pub fn left_to(&self) -> Option<Url> {
        self.left.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Runtime for HeadlessRuntime {
    fn execute_script(&self, script: &InlineScript) {
        tracing::info!(critical = script.critical, script_type = ?script.script_type, len = script.text.len(), "execute script");
    }

    fn append_stylesheet(&self, href: &Url) {
        tracing::info!(href = %href, "append stylesheet");
    }

    async fn load_script(&self, src: &Url) -> Result<(), AssetError> {
        let response = self
            .fetcher
            .get(src)
            .await
            .map_err(|e| AssetError::LoadFailed { url: src.to_string(), reason: e.to_string() })?;
        if !response.status.is_success() {
            return Err(AssetError::LoadFailed { url: src.to_string(), reason: format!("status {}", response.status) });
        }
        tracing::info!(src = %src, bytes = response.body.len(), fetch_ms = response.fetch_ms, "external script loaded");
        Ok(())
    }

    fn push_state(&self, url: &Url) {
        tracing::info!(url = %url, "history push");
        self.history.borrow_mut().push(url.clone());
    }

    fn navigate(&self, url: &Url) {
        tracing::info!(url = %url, "native navigation");
        self.left.replace(Some(url.clone()));
    }

    fn reload(&self) {
        tracing::info!("native reload");
    }

    fn scroll_to_top(&self, region: Option<&str>) {
        tracing::debug!(region = region.unwrap_or("window"), "scroll to top");
    }

    fn scroll_to_fragment(&self, id: &str) {
        tracing::debug!(id, "scroll to fragment");
    }

    fn optimize_images(&self, images: &[ImageRef]) {
        tracing::debug!(count = images.len(), "images without loading hint");
    }
}
