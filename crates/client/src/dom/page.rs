//! The live document.
//!
//! The tree is a scraper `Html` mutated through its ego_tree arena. A
//! detached node stays in the arena, so a `NodeId` held by a cache entry
//! keeps it reachable until it is appended back into the container.

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use super::link::{DELAY_ATTRIBUTE, LinkRef};
use super::selectors::{ANCHOR, EXTERNAL_SCRIPT, HEAD, IMG, SCRIPT, STYLESHEET, TITLE};
use crate::runtime::{ImageRef, InlineScript};

/// The document currently shown.
pub struct Page {
    url: Url,
    title: String,
    dom: Html,
    loading: bool,
    started_scripts: HashSet<NodeId>,
    loaded_scripts: HashSet<String>,
}

impl Page {
    /// Build the live page from the HTML the platform originally loaded.
    ///
    /// Every script already in the document counts as started and every
    /// external script as loaded.
    pub fn parse(url: Url, html: &str) -> Self {
        let dom = Html::parse_document(html);
        let title = dom.select(&TITLE).next().map(|t| t.text().collect::<String>()).unwrap_or_default();
        let started_scripts = dom.select(&SCRIPT).map(|s| s.id()).collect();
        let loaded_scripts = dom
            .select(&EXTERNAL_SCRIPT)
            .filter_map(|s| s.value().attr("src"))
            .filter_map(|src| url.join(src).ok())
            .map(|u| u.to_string())
            .collect();

        Self { url, title: title.trim().to_string(), dom, loading: false, started_scripts, loaded_scripts }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub(crate) fn set_url(&mut self, url: Url) {
        self.url = url;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Whether the loading transition is showing.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn dom(&self) -> &Html {
        &self.dom
    }

    /// First attached element matching `selector`.
    pub fn find(&self, selector: &Selector) -> Option<NodeId> {
        self.select(selector).next().map(|e| e.id())
    }

    /// Attached elements matching `selector`. `Html::select` walks the whole
    /// arena, detached cache nodes included.
    pub fn select<'a, 'b>(&'a self, selector: &'b Selector) -> scraper::element_ref::Select<'a, 'b> {
        self.dom.root_element().select(selector)
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.dom.tree.get(id).and_then(ElementRef::wrap)
    }

    /// Serialized children of an element.
    pub fn inner_html(&self, id: NodeId) -> String {
        self.element(id).map(|e| e.inner_html()).unwrap_or_default()
    }

    /// Concatenated text of an element and its descendants.
    pub fn text(&self, id: NodeId) -> String {
        self.element(id).map(|e| e.text().collect()).unwrap_or_default()
    }

    /// Detach every child of `parent`, returning them in document order.
    pub(crate) fn detach_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let ids: Vec<NodeId> = match self.dom.tree.get(parent) {
            Some(node) => node.children().map(|c| c.id()).collect(),
            None => return Vec::new(),
        };
        for id in &ids {
            if let Some(mut node) = self.dom.tree.get_mut(*id) {
                node.detach();
            }
        }
        ids
    }

    /// Append previously detached nodes to `parent`, keeping their order.
    pub(crate) fn attach_children(&mut self, parent: NodeId, nodes: &[NodeId]) {
        if let Some(mut target) = self.dom.tree.get_mut(parent) {
            for id in nodes {
                target.append_id(*id);
            }
        }
    }

    /// Copy the children of a node from another document under `parent`.
    pub(crate) fn import_children(&mut self, parent: NodeId, source: NodeRef<'_, Node>) -> Vec<NodeId> {
        source.children().filter_map(|child| import_subtree(&mut self.dom.tree, parent, child)).collect()
    }

    /// Parse serialized fragment HTML and append the result under `parent`.
    pub(crate) fn import_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let fragment = Html::parse_fragment(html);
        let root = *fragment.root_element();
        self.import_children(parent, root)
    }

    /// Replace live head elements matching each selector with the fetched document's matches.
    pub(crate) fn sync_head(&mut self, fetched: &Html, selectors: &[Selector]) -> usize {
        let Some(head) = self.find(&HEAD) else {
            return 0;
        };
        let Some(fetched_head) = fetched.select(&HEAD).next() else {
            return 0;
        };

        let mut copied = 0;
        for selector in selectors {
            let stale: Vec<NodeId> = match self.element(head) {
                Some(live_head) => live_head.select(selector).map(|e| e.id()).collect(),
                None => Vec::new(),
            };
            for id in stale {
                if let Some(mut node) = self.dom.tree.get_mut(id) {
                    node.detach();
                }
            }
            for fresh in fetched_head.select(selector) {
                if import_subtree(&mut self.dom.tree, head, *fresh).is_some() {
                    copied += 1;
                }
            }
        }
        copied
    }

    /// Copy an element from another document to the end of `<head>`.
    pub(crate) fn append_to_head(&mut self, source: NodeRef<'_, Node>) -> Option<NodeId> {
        let head = self.find(&HEAD)?;
        import_subtree(&mut self.dom.tree, head, source)
    }

    /// Whether a stylesheet with this resolved URL is attached anywhere in the document.
    pub fn has_stylesheet(&self, href: &Url) -> bool {
        self.select(&STYLESHEET)
            .filter_map(|l| l.value().attr("href"))
            .filter_map(|h| self.url.join(h).ok())
            .any(|u| &u == href)
    }

    pub fn has_loaded_script(&self, src: &Url) -> bool {
        self.loaded_scripts.contains(src.as_str())
    }

    pub(crate) fn mark_script_loaded(&mut self, src: &Url) {
        self.loaded_scripts.insert(src.to_string());
    }

    pub fn is_started(&self, script: NodeId) -> bool {
        self.started_scripts.contains(&script)
    }

    pub(crate) fn mark_started(&mut self, script: NodeId) {
        self.started_scripts.insert(script);
    }

    /// Inline scripts under `container` that have not run yet, in document order.
    ///
    /// Skips scripts whose `type` is listed in `skip_types`, scripts matching
    /// any of `skip_selectors`, and scripts whose text is in `exclude`.
    pub(crate) fn pending_inline_scripts(
        &self, container: NodeId, skip_types: &[String], skip_selectors: &[Selector], exclude: &[String],
    ) -> Vec<InlineScript> {
        let Some(root) = self.element(container) else {
            return Vec::new();
        };

        let skipped: HashSet<NodeId> =
            skip_selectors.iter().flat_map(|sel| root.select(sel).map(|e| e.id())).collect();

        root.select(&SCRIPT)
            .filter(|s| s.value().attr("src").is_none())
            .filter(|s| !self.started_scripts.contains(&s.id()) && !skipped.contains(&s.id()))
            .filter_map(|s| {
                let script_type = s.value().attr("type").map(|t| t.trim().to_ascii_lowercase());
                if let Some(t) = &script_type
                    && skip_types.iter().any(|skip| skip.eq_ignore_ascii_case(t))
                {
                    tracing::debug!(script_type = %t, "skipping inline script by type");
                    return None;
                }
                let text: String = s.text().collect();
                if exclude.contains(&text) {
                    return None;
                }
                Some(InlineScript { text, script_type, node: Some(s.id()), critical: false })
            })
            .collect()
    }

    /// Images under `container` without a `loading` attribute.
    pub(crate) fn images_without_hint(&self, container: NodeId) -> Vec<ImageRef> {
        let Some(root) = self.element(container) else {
            return Vec::new();
        };
        root.select(&IMG)
            .filter(|img| img.value().attr("loading").is_none())
            .map(|img| ImageRef { node: img.id(), src: img.value().attr("src").map(str::to_string) })
            .collect()
    }

    /// Attached element whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.dom
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().id() == Some(id))
            .map(|e| e.id())
    }

    /// Describe an anchor element as a [`LinkRef`].
    pub fn link(&self, node: NodeId) -> Option<LinkRef> {
        let anchor = self.element(node)?;
        let href = anchor.value().attr("href")?;

        let mut link = LinkRef::new(href);
        link.target = anchor.value().attr("target").map(str::to_string);
        link.download = anchor.value().attr("download").is_some();
        link.delay = anchor
            .value()
            .attr(DELAY_ATTRIBUTE)
            .and_then(|d| d.trim().parse::<u64>().ok())
            .map(Duration::from_millis);
        link.class_chain = std::iter::once(*anchor)
            .chain(anchor.ancestors())
            .filter_map(ElementRef::wrap)
            .map(|e| e.value().classes().map(str::to_string).collect())
            .collect();

        Some(link)
    }

    /// First attached anchor whose raw `href` equals `href`.
    pub fn find_link(&self, href: &str) -> Option<LinkRef> {
        let node = self.select(&ANCHOR).find(|a| a.value().attr("href") == Some(href))?.id();
        self.link(node)
    }

    /// Every attached anchor, in document order.
    pub fn links(&self) -> Vec<LinkRef> {
        self.select(&ANCHOR).filter_map(|a| self.link(a.id())).collect()
    }
}

/// Copy `source` and its descendants under `parent` in `tree`.
fn import_subtree(tree: &mut Tree<Node>, parent: NodeId, source: NodeRef<'_, Node>) -> Option<NodeId> {
    let id = {
        let mut target = tree.get_mut(parent)?;
        target.append(source.value().clone()).id()
    };
    for child in source.children() {
        import_subtree(tree, id, child);
    }
    Some(id)
}
