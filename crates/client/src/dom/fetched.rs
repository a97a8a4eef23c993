//! Documents fetched for navigation or prefetch.

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use swapnav_core::Error;
use url::Url;

use super::selectors::{EXTERNAL_SCRIPT, HEAD, SCRIPT, STYLESHEET, TITLE};

/// How critical inline scripts are recognised.
#[derive(Debug, Clone)]
pub struct CriticalScriptRules {
    pub keywords: Vec<String>,
    pub min_len: usize,
}

impl CriticalScriptRules {
    /// Whether `text` is long enough and contains a keyword.
    pub fn matches(&self, text: &str) -> bool {
        text.trim().len() >= self.min_len && self.keywords.iter().any(|k| !k.is_empty() && text.contains(k.as_str()))
    }
}

/// An external script referenced by a fetched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalScript {
    pub src: Url,
    /// Marked `async` or carries the opt-in attribute.
    pub parallel: bool,
}

/// A parsed response whose content fragment has been located.
pub struct FetchedDocument {
    pub url: Url,
    pub dom: Html,
    fragment: NodeId,
    pub title: Option<String>,
    /// Critical inline scripts, deduplicated by text, head before body.
    pub critical_scripts: Vec<String>,
}

impl FetchedDocument {
    /// Parse `html` and locate the fragment matching `content`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingFragment` if nothing matches `content`.
    pub fn parse(url: Url, html: &str, content: &Selector, rules: &CriticalScriptRules) -> Result<Self, Error> {
        let dom = Html::parse_document(html);

        let fragment = dom
            .select(content)
            .next()
            .map(|e| e.id())
            .ok_or_else(|| Error::MissingFragment(format!("no content fragment in {}", url)))?;

        let title = dom
            .select(&TITLE)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string());

        let critical_scripts = extract_critical_scripts(&dom, rules);

        Ok(Self { url, dom, fragment, title, critical_scripts })
    }

    /// The fragment element.
    pub fn fragment(&self) -> NodeRef<'_, Node> {
        self.dom.tree.get(self.fragment).unwrap_or_else(|| self.dom.tree.root())
    }

    /// Serialized children of the fragment.
    pub fn fragment_html(&self) -> String {
        ElementRef::wrap(self.fragment()).map(|e| e.inner_html()).unwrap_or_default()
    }

    /// Stylesheets linked from `<head>`, resolved, with their elements.
    pub fn stylesheets(&self) -> Vec<(Url, NodeRef<'_, Node>)> {
        let Some(head) = self.dom.select(&HEAD).next() else {
            return Vec::new();
        };
        head.select(&STYLESHEET)
            .filter_map(|l| {
                let href = self.url.join(l.value().attr("href")?).ok()?;
                Some((href, *l))
            })
            .collect()
    }

    /// External scripts in document order, deduplicated by resolved URL.
    pub fn external_scripts(&self, async_attribute: &str) -> Vec<ExternalScript> {
        let mut seen = HashSet::new();
        self.dom
            .select(&EXTERNAL_SCRIPT)
            .filter_map(|s| {
                let src = self.url.join(s.value().attr("src")?).ok()?;
                if !seen.insert(src.to_string()) {
                    return None;
                }
                let parallel = s.value().attr("async").is_some()
                    || (!async_attribute.is_empty() && s.value().attr(async_attribute).is_some());
                Some(ExternalScript { src, parallel })
            })
            .collect()
    }
}

/// Inline scripts from head and body that look like page configuration.
pub fn extract_critical_scripts(dom: &Html, rules: &CriticalScriptRules) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut scripts = Vec::new();

    for script in dom.select(&SCRIPT) {
        if script.value().attr("src").is_some() {
            continue;
        }
        let text: String = script.text().collect();
        if !rules.matches(&text) {
            continue;
        }
        if seen.insert(text.clone()) {
            scripts.push(text);
        }
    }

    scripts
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>About</title>
            <link rel="stylesheet" href="/css/site.css">
            <link rel="stylesheet" href="https://cdn.example.net/about.css">
            <script>window.siteConfig = { "lang": "en", "page": "about" };</script>
            <script src="/js/vendor.js"></script>
            <script src="/js/analytics.js" async></script>
        </head>
        <body>
            <div id="content">
                <h1>About</h1>
                <script>window.siteConfig = { "lang": "en", "page": "about" };</script>
                <script>var x = 1;</script>
                <script src="/js/vendor.js"></script>
                <script src="/js/gallery.js" data-swapnav-async></script>
            </div>
        </body>
        </html>
    "#;

    fn rules() -> CriticalScriptRules {
        CriticalScriptRules { keywords: vec!["siteConfig".into()], min_len: 20 }
    }

    fn parse(html: &str) -> Result<FetchedDocument, Error> {
        let content = Selector::parse("#content").unwrap();
        FetchedDocument::parse(Url::parse("https://example.com/about").unwrap(), html, &content, &rules())
    }

    #[test]
    fn test_parse_locates_fragment_and_title() {
        let doc = parse(PAGE).unwrap();
        assert_eq!(doc.title.as_deref(), Some("About"));
        assert!(doc.fragment_html().contains("<h1>About</h1>"));
    }

    #[test]
    fn test_parse_missing_fragment() {
        let result = parse("<html><body><main>nothing</main></body></html>");
        assert!(matches!(result, Err(Error::MissingFragment(_))));
    }

    #[test]
    fn test_critical_scripts_deduplicated() {
        let doc = parse(PAGE).unwrap();
        assert_eq!(doc.critical_scripts, vec![r#"window.siteConfig = { "lang": "en", "page": "about" };"#.to_string()]);
    }

    #[test]
    fn test_critical_rules_min_length() {
        let rules = CriticalScriptRules { keywords: vec!["cfg".into()], min_len: 20 };
        assert!(!rules.matches("cfg = 1;"));
        assert!(rules.matches("window.cfg = { debug: false };"));
        assert!(!rules.matches("window.other = { debug: false };"));
    }

    #[test]
    fn test_empty_keyword_never_matches() {
        let rules = CriticalScriptRules { keywords: vec![String::new()], min_len: 0 };
        assert!(!rules.matches("anything at all"));
    }

    #[test]
    fn test_stylesheets_resolved() {
        let doc = parse(PAGE).unwrap();
        let hrefs: Vec<String> = doc.stylesheets().into_iter().map(|(u, _)| u.to_string()).collect();
        assert_eq!(hrefs, vec!["https://example.com/css/site.css", "https://cdn.example.net/about.css"]);
    }

    #[test]
    fn test_external_scripts_order_and_partition() {
        let doc = parse(PAGE).unwrap();
        let scripts = doc.external_scripts("data-swapnav-async");
        let summary: Vec<(&str, bool)> = scripts.iter().map(|s| (s.src.path(), s.parallel)).collect();
        assert_eq!(summary, vec![("/js/vendor.js", false), ("/js/analytics.js", true), ("/js/gallery.js", true)]);

        let scripts = doc.external_scripts("");
        assert!(!scripts[2].parallel);
    }
}
