//! External stylesheet and script loading for swapped-in pages.
//!
//! Stylesheets missing from the live document are attached immediately and
//! not awaited. Scripts missing from the live document are split into a
//! parallel group (`async` or opted in) and a sequential group. The parallel
//! group is settled first, then the sequential group loads one script at a
//! time in document order. A failed script counts as finished.

use futures_util::future::join_all;
use std::cell::RefCell;
use swapnav_core::NavConfig;
use url::Url;

use crate::dom::{ExternalScript, FetchedDocument, Page};
use crate::runtime::Runtime;

/// What a loader run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub stylesheets: Vec<Url>,
    pub loaded: Vec<Url>,
    pub failed: Vec<Url>,
}

/// Loads the external assets a fetched document needs.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    allow_async: bool,
    async_attribute: String,
    debug: bool,
}

impl AssetLoader {
    pub fn new(config: &NavConfig) -> Self {
        Self {
            allow_async: config.allow_async_external_scripts,
            async_attribute: config.async_script_attribute.clone(),
            debug: config.debug,
        }
    }

    /// Split pending scripts into `(parallel, sequential)`, keeping relative order.
    pub fn partition(&self, scripts: Vec<ExternalScript>) -> (Vec<Url>, Vec<Url>) {
        let mut parallel = Vec::new();
        let mut sequential = Vec::new();
        for script in scripts {
            if self.allow_async && script.parallel {
                parallel.push(script.src);
            } else {
                sequential.push(script.src);
            }
        }
        (parallel, sequential)
    }

    /// Attach missing stylesheets and load missing scripts of `fetched`.
    ///
    /// Never holds a borrow of `page` across an await.
    pub async fn load<R: Runtime>(&self, runtime: &R, page: &RefCell<Page>, fetched: &FetchedDocument) -> AssetReport {
        let mut report = AssetReport::default();

        {
            let mut page = page.borrow_mut();
            for (href, node) in fetched.stylesheets() {
                if page.has_stylesheet(&href) {
                    continue;
                }
                page.append_to_head(node);
                runtime.append_stylesheet(&href);
                report.stylesheets.push(href);
            }
        }

        let pending: Vec<ExternalScript> = {
            let page = page.borrow();
            fetched
                .external_scripts(&self.async_attribute)
                .into_iter()
                .filter(|s| !page.has_loaded_script(&s.src))
                .collect()
        };
        let (parallel, sequential) = self.partition(pending);

        let results = join_all(parallel.iter().map(|src| runtime.load_script(src))).await;
        for (src, result) in parallel.into_iter().zip(results) {
            self.settle(page, &mut report, src, result);
        }

        for src in sequential {
            let result = runtime.load_script(&src).await;
            self.settle(page, &mut report, src, result);
        }

        report
    }

    fn settle(
        &self, page: &RefCell<Page>, report: &mut AssetReport, src: Url, result: Result<(), crate::runtime::AssetError>,
    ) {
        match result {
            Ok(()) => {
                page.borrow_mut().mark_script_loaded(&src);
                report.loaded.push(src);
            }
            Err(e) => {
                if self.debug {
                    tracing::warn!(src = %src, error = %e, "external script failed, continuing");
                } else {
                    tracing::debug!(src = %src, error = %e, "external script failed, continuing");
                }
                report.failed.push(src);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::CriticalScriptRules;
    use crate::testing::{Event, RecordingRuntime};
    use scraper::Selector;

    const START: &str = r#"<html><head>
        <link rel="stylesheet" href="/css/site.css">
        <script src="/js/app.js"></script>
    </head><body><div id="content"></div></body></html>"#;

    fn fetched(html: &str) -> FetchedDocument {
        FetchedDocument::parse(
            Url::parse("https://example.com/next").unwrap(),
            html,
            &Selector::parse("#content").unwrap(),
            &CriticalScriptRules { keywords: vec![], min_len: 0 },
        )
        .unwrap()
    }

    fn page() -> RefCell<Page> {
        RefCell::new(Page::parse(Url::parse("https://example.com/").unwrap(), START))
    }

    fn url(path: &str) -> String {
        format!("https://example.com{path}")
    }

    #[test]
    fn test_partition_respects_switch() {
        let scripts = vec![
            ExternalScript { src: Url::parse("https://example.com/a.js").unwrap(), parallel: false },
            ExternalScript { src: Url::parse("https://example.com/b.js").unwrap(), parallel: true },
            ExternalScript { src: Url::parse("https://example.com/c.js").unwrap(), parallel: false },
        ];
        let loader = AssetLoader::new(&NavConfig::default());
        let (parallel, sequential) = loader.partition(scripts.clone());
        assert_eq!(parallel.len(), 1);
        assert_eq!(sequential.iter().map(|u| u.path()).collect::<Vec<_>>(), vec!["/a.js", "/c.js"]);

        let loader = AssetLoader::new(&NavConfig { allow_async_external_scripts: false, ..Default::default() });
        let (parallel, sequential) = loader.partition(scripts);
        assert!(parallel.is_empty());
        assert_eq!(sequential.len(), 3);
    }

    #[tokio::test]
    async fn test_sequential_scripts_finish_in_order() {
        let runtime = RecordingRuntime::with_script_delay(5);
        let page = page();
        let doc = fetched(
            r#"<html><head><script src="/js/a.js"></script></head>
               <body><div id="content"></div><script src="/js/b.js"></script></body></html>"#,
        );

        let report = AssetLoader::new(&NavConfig::default()).load(&runtime, &page, &doc).await;
        assert_eq!(report.loaded.len(), 2);
        assert_eq!(
            runtime.script_events(),
            vec![
                Event::ScriptStart(url("/js/a.js")),
                Event::ScriptEnd(url("/js/a.js")),
                Event::ScriptStart(url("/js/b.js")),
                Event::ScriptEnd(url("/js/b.js")),
            ]
        );
    }

    #[tokio::test]
    async fn test_parallel_group_settles_before_sequential() {
        let runtime = RecordingRuntime::with_script_delay(5);
        let page = page();
        let doc = fetched(
            r#"<html><head>
                <script src="/js/seq.js"></script>
                <script src="/js/p1.js" async></script>
                <script src="/js/p2.js" data-swapnav-async></script>
            </head><body><div id="content"></div></body></html>"#,
        );

        AssetLoader::new(&NavConfig::default()).load(&runtime, &page, &doc).await;
        let events = runtime.script_events();
        assert_eq!(events[0], Event::ScriptStart(url("/js/p1.js")));
        assert_eq!(events[1], Event::ScriptStart(url("/js/p2.js")));
        let seq_start = events.iter().position(|e| *e == Event::ScriptStart(url("/js/seq.js"))).unwrap();
        let p1_end = events.iter().position(|e| *e == Event::ScriptEnd(url("/js/p1.js"))).unwrap();
        let p2_end = events.iter().position(|e| *e == Event::ScriptEnd(url("/js/p2.js"))).unwrap();
        assert!(p1_end < seq_start && p2_end < seq_start);
    }

    #[tokio::test]
    async fn test_failed_script_does_not_block() {
        let runtime = RecordingRuntime::default();
        runtime.fail_script(&url("/js/broken.js"));
        let page = page();
        let doc = fetched(
            r#"<html><head>
                <script src="/js/broken.js"></script>
                <script src="/js/after.js"></script>
            </head><body><div id="content"></div></body></html>"#,
        );

        let report = AssetLoader::new(&NavConfig::default()).load(&runtime, &page, &doc).await;
        assert_eq!(report.failed, vec![Url::parse(&url("/js/broken.js")).unwrap()]);
        assert_eq!(report.loaded, vec![Url::parse(&url("/js/after.js")).unwrap()]);
        assert!(!page.borrow().has_loaded_script(&Url::parse(&url("/js/broken.js")).unwrap()));
    }

    #[tokio::test]
    async fn test_present_assets_skipped() {
        let runtime = RecordingRuntime::default();
        let page = page();
        let doc = fetched(
            r#"<html><head>
                <link rel="stylesheet" href="/css/site.css">
                <link rel="stylesheet" href="/css/next.css">
                <script src="/js/app.js"></script>
            </head><body><div id="content"></div></body></html>"#,
        );

        let report = AssetLoader::new(&NavConfig::default()).load(&runtime, &page, &doc).await;
        assert_eq!(report.stylesheets, vec![Url::parse(&url("/css/next.css")).unwrap()]);
        assert!(report.loaded.is_empty());
        assert!(runtime.events().contains(&Event::Stylesheet(url("/css/next.css"))));
        assert!(page.borrow().has_stylesheet(&Url::parse(&url("/css/next.css")).unwrap()));

        let again = AssetLoader::new(&NavConfig::default()).load(&runtime, &page, &doc).await;
        assert!(again.stylesheets.is_empty());
    }
}
