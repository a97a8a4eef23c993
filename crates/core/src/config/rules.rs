//! Precompiled URL exclusion patterns.

use regex::Regex;
use url::Url;

/// `ignore_url_patterns` compiled once at engine construction.
///
/// Patterns that fail to compile are dropped and recorded in
/// [`UrlRules::diagnostics`]; they never match anything.
#[derive(Debug, Clone, Default)]
pub struct UrlRules {
    patterns: Vec<Regex>,
    diagnostics: Vec<String>,
}

impl UrlRules {
    /// Compile every pattern, keeping the valid ones in their configured order.
    pub fn compile(patterns: &[String]) -> Self {
        let mut rules = Self::default();
        for pattern in patterns {
            match Regex::new(pattern) {
                Ok(re) => rules.patterns.push(re),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "dropping invalid ignore_url_patterns entry");
                    rules.diagnostics.push(format!("ignore_url_patterns: {pattern}: {e}"));
                }
            }
        }
        rules
    }

    /// Whether the URL's path plus query matches any pattern.
    pub fn is_ignored(&self, url: &Url) -> bool {
        let target = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        self.patterns.iter().any(|re| re.is_match(&target))
    }

    /// Number of patterns that compiled.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Messages for every dropped pattern.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}
