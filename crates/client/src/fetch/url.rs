//! URL resolution for link targets.

use url::Url;

/// Error type for link URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a link href against the document URL.
///
/// Steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references against `base`
/// 3. Require http or https
///
/// The fragment is kept; callers decide whether it matters.
pub fn resolve(href: &str, base: &Url) -> Result<Url, UrlError> {
    let trimmed = href.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}

/// Copy of `url` without its fragment.
pub fn without_fragment(url: &Url) -> Url {
    let mut out = url.clone();
    out.set_fragment(None);
    out
}

/// Whether two URLs address the same document (equal apart from the fragment).
pub fn same_document(a: &Url, b: &Url) -> bool {
    without_fragment(a) == without_fragment(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/blog/post/").unwrap()
    }

    #[test]
    fn test_resolve_absolute() {
        let url = resolve("https://example.com/about", &base()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve("/shop", &base()).unwrap().as_str(), "https://example.com/shop");
        assert_eq!(resolve("comments", &base()).unwrap().as_str(), "https://example.com/blog/post/comments");
    }

    #[test]
    fn test_resolve_keeps_fragment() {
        let url = resolve("#reviews", &base()).unwrap();
        assert_eq!(url.fragment(), Some("reviews"));
        assert_eq!(url.path(), "/blog/post/");
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve("  /about  ", &base()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        assert!(matches!(resolve("mailto:a@example.com", &base()), Err(UrlError::UnsupportedScheme(_))));
        assert!(matches!(resolve("javascript:void(0)", &base()), Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve("", &base()), Err(UrlError::Empty)));
        assert!(matches!(resolve("   ", &base()), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_invalid() {
        assert!(matches!(resolve("http://[::1", &base()), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_same_document() {
        let a = Url::parse("https://example.com/a?x=1#top").unwrap();
        let b = Url::parse("https://example.com/a?x=1").unwrap();
        let c = Url::parse("https://example.com/a?x=2").unwrap();
        assert!(same_document(&a, &b));
        assert!(!same_document(&a, &c));
        assert_eq!(without_fragment(&a).as_str(), "https://example.com/a?x=1");
    }
}
