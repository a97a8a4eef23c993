//! Interception decisions for link activations.
//!
//! ### Decision order (first match wins)
//! 1. Injected [`NavigationHooks::should_skip`] unless it abstains.
//! 2. Unparseable or non-http(s) URL, other origin, new browsing context,
//!    forced download, held modifier key.
//! 3. Path+query matches an `ignore_url_patterns` entry.
//! 4. The link or an ancestor carries `no_ajax_class`.
//! 5. Otherwise intercept.
//!
//! The matcher is total: malformed input ends in native navigation.

use serde::Serialize;
use swapnav_core::{NavConfig, UrlRules};
use url::Url;

use crate::dom::{LinkRef, Modifiers};
use crate::fetch::resolve;

/// Answer of an escape-hatch hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Yes,
    No,
    Abstain,
}

/// Escape-hatch strategy injected at construction.
pub trait NavigationHooks {
    /// `Yes` forces native navigation, `No` forces interception.
    fn should_skip(&self, href: &str, link: &LinkRef) -> Verdict {
        let _ = (href, link);
        Verdict::Abstain
    }

    /// `Yes` keeps the engine from initializing.
    fn should_abort_init(&self) -> Verdict {
        Verdict::Abstain
    }
}

/// Why a link was left to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Hook,
    Unparseable,
    Scheme,
    CrossOrigin,
    NewContext,
    Download,
    Modifier,
    Pattern,
    Excluded,
}

/// Outcome of [`Matcher::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Intercept(Url),
    Native(Rejection),
}

impl Decision {
    pub fn is_intercept(&self) -> bool {
        matches!(self, Decision::Intercept(_))
    }
}

/// Stateless link matcher.
pub struct Matcher {
    rules: UrlRules,
    no_ajax_class: String,
    hooks: Option<Box<dyn NavigationHooks>>,
}

impl Matcher {
    pub fn new(config: &NavConfig) -> Self {
        Self { rules: UrlRules::compile(&config.ignore_url_patterns), no_ajax_class: config.no_ajax_class.clone(), hooks: None }
    }

    pub fn with_hooks(mut self, hooks: Box<dyn NavigationHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub(crate) fn set_hooks(&mut self, hooks: Box<dyn NavigationHooks>) {
        self.hooks = Some(hooks);
    }

    pub fn hooks(&self) -> Option<&dyn NavigationHooks> {
        self.hooks.as_deref()
    }

    pub fn rules(&self) -> &UrlRules {
        &self.rules
    }

    pub fn should_intercept(&self, href: &str, current: &Url, link: &LinkRef, modifiers: Modifiers) -> bool {
        self.decide(href, current, link, modifiers).is_intercept()
    }

    /// Decide, keeping the reason for native navigation.
    pub fn decide(&self, href: &str, current: &Url, link: &LinkRef, modifiers: Modifiers) -> Decision {
        let hook = self.hooks.as_ref().map_or(Verdict::Abstain, |h| h.should_skip(href, link));

        let url = match resolve(href, current) {
            Ok(url) => url,
            Err(crate::fetch::UrlError::UnsupportedScheme(_)) => return Decision::Native(Rejection::Scheme),
            Err(_) => return Decision::Native(Rejection::Unparseable),
        };

        match hook {
            Verdict::Yes => return Decision::Native(Rejection::Hook),
            Verdict::No => return Decision::Intercept(url),
            Verdict::Abstain => {}
        }

        if url.origin() != current.origin() {
            return Decision::Native(Rejection::CrossOrigin);
        }
        if link.opens_new_context() {
            return Decision::Native(Rejection::NewContext);
        }
        if link.download {
            return Decision::Native(Rejection::Download);
        }
        if modifiers.any() {
            return Decision::Native(Rejection::Modifier);
        }

        if self.rules.is_ignored(&url) {
            return Decision::Native(Rejection::Pattern);
        }

        if link.has_class_in_chain(&self.no_ajax_class) {
            return Decision::Native(Rejection::Excluded);
        }

        Decision::Intercept(url)
    }
}
