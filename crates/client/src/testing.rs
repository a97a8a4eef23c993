//! In-memory fetcher and recording runtime for engine tests.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use swapnav_core::{Error, NavConfig};
use url::Url;

use crate::dom::Page;
use crate::engine::Navigator;
use crate::fetch::{FetchResponse, Fetcher};
use crate::runtime::{AssetError, ImageRef, InlineScript, Runtime};

pub(crate) const ORIGIN: &str = "https://example.com";

/// Full document with `body` inside the default content container.
pub(crate) fn page_html(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head>\
         <body><div id=\"content\">{body}</div></body></html>"
    )
}

/// Default configuration without the ready delay.
pub(crate) fn test_config() -> NavConfig {
    NavConfig { ready_delay_ms: 0, ..NavConfig::default() }
}

#[derive(Debug, Clone)]
struct Route {
    status: u16,
    content_type: Option<String>,
    body: String,
    delay: Option<Duration>,
}

/// Scripted [`Fetcher`] keyed by path and query on [`ORIGIN`].
#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    routes: HashMap<String, Route>,
    requests: RefCell<Vec<String>>,
}

impl MockFetcher {
    pub(crate) fn html(&mut self, path: &str, body: &str) {
        self.respond(path, 200, Some("text/html; charset=utf-8"), body);
    }

    pub(crate) fn respond(&mut self, path: &str, status: u16, content_type: Option<&str>, body: &str) {
        let delay = self.routes.get(path).and_then(|r| r.delay);
        self.routes.insert(
            path.to_string(),
            Route { status, content_type: content_type.map(str::to_string), body: body.to_string(), delay },
        );
    }

    /// Delay the response for `path`; call after the route is registered.
    pub(crate) fn delay(&mut self, path: &str, ms: u64) {
        if let Some(route) = self.routes.get_mut(path) {
            route.delay = Some(Duration::from_millis(ms));
        }
    }

    pub(crate) fn request_count(&self, path: &str) -> usize {
        self.requests.borrow().iter().filter(|r| r.as_str() == path).count()
    }

    pub(crate) fn total_requests(&self) -> usize {
        self.requests.borrow().len()
    }
}

fn route_key(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[async_trait(?Send)]
impl Fetcher for MockFetcher {
    async fn get(&self, url: &Url) -> Result<FetchResponse, Error> {
        let key = route_key(url);
        self.requests.borrow_mut().push(key.clone());

        let route = self
            .routes
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::HttpError(format!("network error: no route for {url}")))?;
        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }

        let status = StatusCode::from_u16(route.status).map_err(|e| Error::HttpError(e.to_string()))?;
        Ok(FetchResponse {
            url: url.clone(),
            final_url: url.clone(),
            status,
            content_type: route.content_type,
            body: Bytes::from(route.body),
            fetch_ms: 0,
        })
    }
}

/// Everything a [`RecordingRuntime`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Executed(String),
    Stylesheet(String),
    ScriptStart(String),
    ScriptEnd(String),
    Push(String),
    Navigate(String),
    Reload,
    ScrollTop(Option<String>),
    ScrollTo(String),
    Images(usize),
}

/// [`Runtime`] that records calls and can delay or fail script loads.
#[derive(Debug, Default)]
pub(crate) struct RecordingRuntime {
    events: RefCell<Vec<Event>>,
    script_delay: Option<Duration>,
    failing: RefCell<HashSet<String>>,
}

impl RecordingRuntime {
    pub(crate) fn with_script_delay(ms: u64) -> Self {
        Self { script_delay: Some(Duration::from_millis(ms)), ..Default::default() }
    }

    pub(crate) fn fail_script(&self, src: &str) {
        self.failing.borrow_mut().insert(src.to_string());
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub(crate) fn script_events(&self) -> Vec<Event> {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::ScriptStart(_) | Event::ScriptEnd(_)))
            .cloned()
            .collect()
    }

    /// Texts of executed inline scripts, in order.
    pub(crate) fn executed_texts(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Executed(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

#[async_trait(?Send)]
impl Runtime for RecordingRuntime {
    fn execute_script(&self, script: &InlineScript) {
        self.record(Event::Executed(script.text.clone()));
    }

    fn append_stylesheet(&self, href: &Url) {
        self.record(Event::Stylesheet(href.to_string()));
    }

    async fn load_script(&self, src: &Url) -> Result<(), AssetError> {
        self.record(Event::ScriptStart(src.to_string()));
        if let Some(delay) = self.script_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.borrow().contains(src.as_str()) {
            return Err(AssetError::LoadFailed { url: src.to_string(), reason: "scripted failure".into() });
        }
        self.record(Event::ScriptEnd(src.to_string()));
        Ok(())
    }

    fn push_state(&self, url: &Url) {
        self.record(Event::Push(url.to_string()));
    }

    fn navigate(&self, url: &Url) {
        self.record(Event::Navigate(url.to_string()));
    }

    fn reload(&self) {
        self.record(Event::Reload);
    }

    fn scroll_to_top(&self, region: Option<&str>) {
        self.record(Event::ScrollTop(region.map(str::to_string)));
    }

    fn scroll_to_fragment(&self, id: &str) {
        self.record(Event::ScrollTo(id.to_string()));
    }

    fn optimize_images(&self, images: &[ImageRef]) {
        self.record(Event::Images(images.len()));
    }
}

pub(crate) type TestNavigator = Navigator<MockFetcher, RecordingRuntime>;

/// Engine on the home page `/`.
pub(crate) fn navigator(config: NavConfig, setup: impl FnOnce(&mut MockFetcher)) -> TestNavigator {
    navigator_at("/", config, setup)
}

/// Engine on `path`, showing a default page.
pub(crate) fn navigator_at(path: &str, config: NavConfig, setup: impl FnOnce(&mut MockFetcher)) -> TestNavigator {
    build(path, &page_html("Home", "<p>home</p>"), config, setup)
}

/// Engine on `/` with `body` in the content container.
pub(crate) fn navigator_with_body(config: NavConfig, body: &str, setup: impl FnOnce(&mut MockFetcher)) -> TestNavigator {
    build("/", &page_html("Home", body), config, setup)
}

fn build(path: &str, html: &str, config: NavConfig, setup: impl FnOnce(&mut MockFetcher)) -> TestNavigator {
    let url = Url::parse(&format!("{ORIGIN}{path}")).unwrap();
    let mut fetcher = MockFetcher::default();
    setup(&mut fetcher);
    Navigator::new(config, Page::parse(url, html), fetcher, RecordingRuntime::default()).unwrap()
}
