//! CSS selectors compiled once per engine.

use scraper::Selector;
use std::sync::LazyLock;
use swapnav_core::{ConfigError, NavConfig};

pub(crate) static HEAD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("head").expect("invalid selector"));
pub(crate) static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("invalid selector"));
pub(crate) static SCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").expect("invalid selector"));
pub(crate) static EXTERNAL_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[src]").expect("invalid selector"));
pub(crate) static STYLESHEET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[rel~="stylesheet"][href]"#).expect("invalid selector"));
pub(crate) static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("invalid selector"));
pub(crate) static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector"));

/// Configured selectors, parsed up front.
///
/// The content selector is mandatory. Entries of the skip and head-sync
/// lists that fail to parse are dropped and reported in `diagnostics`.
#[derive(Debug)]
pub struct Selectors {
    pub content: Selector,
    pub skip_scripts: Vec<Selector>,
    pub head_seo: Vec<Selector>,
    diagnostics: Vec<String>,
}

impl Selectors {
    pub fn compile(config: &NavConfig) -> Result<Self, ConfigError> {
        let content = Selector::parse(&config.content_selector).map_err(|e| ConfigError::Invalid {
            field: "content_selector".into(),
            reason: e.to_string(),
        })?;

        let mut diagnostics = Vec::new();
        let skip_scripts = compile_list("skip_inline_script_selectors", &config.skip_inline_script_selectors, &mut diagnostics);
        let head_seo = if config.sync_head_seo {
            compile_list("head_seo", &config.head_seo.selectors(), &mut diagnostics)
        } else {
            Vec::new()
        };

        Ok(Self { content, skip_scripts, head_seo, diagnostics })
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

fn compile_list(field: &str, sources: &[String], diagnostics: &mut Vec<String>) -> Vec<Selector> {
    sources
        .iter()
        .filter_map(|css| match Selector::parse(css) {
            Ok(sel) => Some(sel),
            Err(e) => {
                tracing::warn!(field, selector = %css, error = %e, "dropping invalid selector");
                diagnostics.push(format!("{field}: {css}: {e}"));
                None
            }
        })
        .collect()
}
