//! Engine configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWAPNAV_*)
//! 2. TOML config file (if SWAPNAV_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod rules;
mod validation;

pub use rules::UrlRules;
pub use validation::ConfigError;

/// Navigation engine configuration.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWAPNAV_*)
/// 2. TOML config file (if SWAPNAV_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavConfig {
    /// Global kill-switch.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Selector for the swappable region, in the live and in fetched documents.
    #[serde(default = "default_content_selector")]
    pub content_selector: String,

    /// Master switch for the page cache.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Query parameter names that force a cache bypass.
    #[serde(default = "default_ignore_url_params")]
    pub ignore_url_params: Vec<String>,

    /// Regexes over path+query that force native navigation.
    #[serde(default = "default_ignore_url_patterns")]
    pub ignore_url_patterns: Vec<String>,

    /// Class that opts a link (or any of its ancestors) out of interception.
    #[serde(default = "default_no_ajax_class")]
    pub no_ajax_class: String,

    /// Prefetch on hover, focus and press.
    #[serde(default = "default_true")]
    pub prefetch_on_hover: bool,

    /// Debounce before an intent signal turns into a prefetch.
    #[serde(default = "default_prefetch_delay_ms")]
    pub prefetch_delay_ms: u64,

    /// Maximum number of links observed for viewport prefetching.
    #[serde(default = "default_prefetch_max_entries")]
    pub prefetch_max_entries: usize,

    /// Prefetch links as they enter the viewport.
    #[serde(default)]
    pub prefetch_in_viewport: bool,

    /// Primary navigation timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Substrings that identify critical inline scripts.
    #[serde(default = "default_critical_script_keywords")]
    pub critical_script_keywords: Vec<String>,

    /// Inline scripts shorter than this are never critical.
    #[serde(default = "default_min_critical_script_len")]
    pub min_critical_script_len: usize,

    /// Copy selected head metadata from fetched pages.
    #[serde(default = "default_true")]
    pub sync_head_seo: bool,

    /// Which head metadata to copy.
    #[serde(default)]
    pub head_seo: HeadSeoConfig,

    /// Script `type` values never re-executed.
    #[serde(default = "default_skip_inline_script_types")]
    pub skip_inline_script_types: Vec<String>,

    /// Selectors of scripts never re-executed.
    #[serde(default = "default_skip_inline_script_selectors")]
    pub skip_inline_script_selectors: Vec<String>,

    /// Load `async`/opted-in external scripts concurrently.
    #[serde(default = "default_true")]
    pub allow_async_external_scripts: bool,

    /// Attribute that opts an external script into concurrent loading.
    #[serde(default = "default_async_script_attribute")]
    pub async_script_attribute: String,

    /// Selector of the primary scrollable region; the window when unset.
    #[serde(default)]
    pub scroll_container: Option<String>,

    /// Delay before the content-replaced signal fires.
    #[serde(default = "default_ready_delay_ms")]
    pub ready_delay_ms: u64,

    /// Hand freshly inserted images without loading hints to the runtime.
    #[serde(default = "default_true")]
    pub optimize_images: bool,

    /// Raise asset failures from debug to warn level.
    #[serde(default)]
    pub debug: bool,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to read per response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

/// Head metadata copied from fetched documents into the live head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadSeoConfig {
    /// Sync `link[rel="canonical"]`.
    #[serde(default = "default_true")]
    pub canonical: bool,

    /// `meta[name=...]` values to sync.
    #[serde(default = "default_meta_names")]
    pub meta_names: Vec<String>,

    /// `meta[property=...]` values to sync.
    #[serde(default = "default_meta_properties")]
    pub meta_properties: Vec<String>,

    /// Sync `script[type="application/ld+json"]` blocks.
    #[serde(default = "default_true")]
    pub structured_data: bool,

    /// Any other head selectors to sync.
    #[serde(default)]
    pub extra_selectors: Vec<String>,
}

impl Default for HeadSeoConfig {
    fn default() -> Self {
        Self {
            canonical: true,
            meta_names: default_meta_names(),
            meta_properties: default_meta_properties(),
            structured_data: true,
            extra_selectors: Vec::new(),
        }
    }
}

impl HeadSeoConfig {
    /// Expand into the CSS selectors applied to both heads, in sync order.
    pub fn selectors(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.canonical {
            out.push(r#"link[rel="canonical"]"#.to_string());
        }
        out.extend(self.meta_names.iter().map(|n| format!(r#"meta[name="{n}"]"#)));
        out.extend(self.meta_properties.iter().map(|p| format!(r#"meta[property="{p}"]"#)));
        if self.structured_data {
            out.push(r#"script[type="application/ld+json"]"#.to_string());
        }
        out.extend(self.extra_selectors.iter().cloned());
        out
    }
}

fn default_true() -> bool {
    true
}

fn default_content_selector() -> String {
    "#content".into()
}

fn default_ignore_url_params() -> Vec<String> {
    vec!["nocache".into(), "preview".into(), "s".into()]
}

fn default_ignore_url_patterns() -> Vec<String> {
    vec![
        r"^/wp-admin".into(),
        r"^/wp-login\.php".into(),
        r"\.(pdf|zip|rar|gz|jpe?g|png|gif|webp|svg|mp3|mp4|webm)(\?|$)".into(),
    ]
}

fn default_no_ajax_class() -> String {
    "no-ajax".into()
}

fn default_prefetch_delay_ms() -> u64 {
    65
}

fn default_prefetch_max_entries() -> usize {
    20
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_critical_script_keywords() -> Vec<String> {
    vec!["Config".into(), "_params".into(), "__INITIAL_STATE__".into()]
}

fn default_min_critical_script_len() -> usize {
    20
}

fn default_skip_inline_script_types() -> Vec<String> {
    vec!["application/ld+json".into(), "application/json".into(), "text/template".into()]
}

fn default_skip_inline_script_selectors() -> Vec<String> {
    vec!["[data-swapnav-skip]".into()]
}

fn default_async_script_attribute() -> String {
    "data-swapnav-async".into()
}

fn default_ready_delay_ms() -> u64 {
    50
}

fn default_user_agent() -> String {
    "swapnav/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_meta_names() -> Vec<String> {
    vec!["description".into(), "robots".into()]
}

fn default_meta_properties() -> Vec<String> {
    vec!["og:title".into(), "og:description".into(), "og:url".into()]
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            content_selector: default_content_selector(),
            cache_enabled: true,
            ignore_url_params: default_ignore_url_params(),
            ignore_url_patterns: default_ignore_url_patterns(),
            no_ajax_class: default_no_ajax_class(),
            prefetch_on_hover: true,
            prefetch_delay_ms: default_prefetch_delay_ms(),
            prefetch_max_entries: default_prefetch_max_entries(),
            prefetch_in_viewport: false,
            request_timeout_ms: default_request_timeout_ms(),
            critical_script_keywords: default_critical_script_keywords(),
            min_critical_script_len: default_min_critical_script_len(),
            sync_head_seo: true,
            head_seo: HeadSeoConfig::default(),
            skip_inline_script_types: default_skip_inline_script_types(),
            skip_inline_script_selectors: default_skip_inline_script_selectors(),
            allow_async_external_scripts: true,
            async_script_attribute: default_async_script_attribute(),
            scroll_container: None,
            ready_delay_ms: default_ready_delay_ms(),
            optimize_images: true,
            debug: false,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl NavConfig {
    /// Primary navigation timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Intent debounce as a Duration.
    pub fn prefetch_delay(&self) -> Duration {
        Duration::from_millis(self.prefetch_delay_ms)
    }

    /// Ready-signal delay as a Duration.
    pub fn ready_delay(&self) -> Duration {
        Duration::from_millis(self.ready_delay_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWAPNAV_`
    /// 2. TOML file from `SWAPNAV_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("SWAPNAV_CONFIG_FILE").ok();
        Self::load_from(file.as_deref())
    }

    /// Same as [`NavConfig::load`] with an explicit TOML file instead of `SWAPNAV_CONFIG_FILE`.
    pub fn load_from(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(
            Env::prefixed("SWAPNAV_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document layered over the defaults, without touching the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml))
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NavConfig::default();
        assert!(config.enabled);
        assert_eq!(config.content_selector, "#content");
        assert!(config.cache_enabled);
        assert!(config.ignore_url_params.contains(&"nocache".to_string()));
        assert_eq!(config.no_ajax_class, "no-ajax");
        assert_eq!(config.prefetch_delay_ms, 65);
        assert_eq!(config.prefetch_max_entries, 20);
        assert!(!config.prefetch_in_viewport);
        assert_eq!(config.request_timeout_ms, 10_000);
        assert!(config.scroll_container.is_none());
        assert!(!config.debug);
    }

    #[test]
    fn test_durations() {
        let config = NavConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_millis(10_000));
        assert_eq!(config.prefetch_delay(), Duration::from_millis(65));
        assert_eq!(config.ready_delay(), Duration::from_millis(50));
    }

    #[test]
    fn test_head_seo_selectors() {
        let seo = HeadSeoConfig {
            canonical: true,
            meta_names: vec!["description".into()],
            meta_properties: vec![],
            structured_data: false,
            extra_selectors: vec!["link[rel=\"alternate\"]".into()],
        };
        assert_eq!(
            seo.selectors(),
            vec![
                r#"link[rel="canonical"]"#.to_string(),
                r#"meta[name="description"]"#.to_string(),
                r#"link[rel="alternate"]"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_from_toml_overrides() {
        let config = NavConfig::from_toml_str(
            r#"
            content_selector = "main.site-main"
            ignore_url_params = ["nocache"]
            prefetch_in_viewport = true

            [head_seo]
            structured_data = false
            "#,
        )
        .unwrap();
        assert_eq!(config.content_selector, "main.site-main");
        assert_eq!(config.ignore_url_params, vec!["nocache".to_string()]);
        assert!(config.prefetch_in_viewport);
        assert!(!config.head_seo.structured_data);
        assert!(config.head_seo.canonical);
        assert_eq!(config.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_from_toml_invalid_value() {
        let result = NavConfig::from_toml_str("request_timeout_ms = 5");
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "request_timeout_ms"));
    }

    #[test]
    fn test_from_toml_malformed() {
        let result = NavConfig::from_toml_str("enabled = = true");
        assert!(matches!(result, Err(ConfigError::LoadFailed(_))));
    }
}
