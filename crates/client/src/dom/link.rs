//! Link activation data handed to the matcher and controller.

use std::time::Duration;

/// Attribute carrying a per-link navigation delay in milliseconds.
pub const DELAY_ATTRIBUTE: &str = "data-swapnav-delay";

/// The link a navigation originates from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkRef {
    /// Raw `href` attribute.
    pub href: String,
    /// `target` attribute.
    pub target: Option<String>,
    /// Whether the link carries `download`.
    pub download: bool,
    /// Classes of the link, then of each ancestor outwards.
    pub class_chain: Vec<Vec<String>>,
    /// Delay before navigating, from [`DELAY_ATTRIBUTE`].
    pub delay: Option<Duration>,
}

impl LinkRef {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into(), ..Default::default() }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_download(mut self) -> Self {
        self.download = true;
        self
    }

    /// Append one level of classes (the link first, then ancestors).
    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_chain.push(classes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Whether the link asks for another browsing context.
    pub fn opens_new_context(&self) -> bool {
        match self.target.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(t) => !t.eq_ignore_ascii_case("_self"),
        }
    }

    /// Whether the link or any ancestor carries `class`.
    pub fn has_class_in_chain(&self, class: &str) -> bool {
        !class.is_empty() && self.class_chain.iter().flatten().any(|c| c == class)
    }
}

/// Modifier keys held during activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.ctrl || self.meta || self.shift || self.alt
    }
}
