//! The platform side of the engine.
//!
//! Everything the engine cannot do on its own tree (run JavaScript, load
//! external assets, move browser history, scroll, leave the page) goes
//! through [`Runtime`].

use async_trait::async_trait;
use ego_tree::NodeId;
use url::Url;

/// An inline script handed to the runtime for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineScript {
    /// Script source text.
    pub text: String,
    /// `type` attribute, if any.
    pub script_type: Option<String>,
    /// Element in the live tree, if the script came from one.
    pub node: Option<NodeId>,
    /// Whether this is a critical configuration script.
    pub critical: bool,
}

impl InlineScript {
    pub fn critical(text: impl Into<String>) -> Self {
        Self { text: text.into(), script_type: None, node: None, critical: true }
    }
}

/// A newly inserted image without a loading hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub node: NodeId,
    pub src: Option<String>,
}

/// Errors from loading a single external asset.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load {url}: {reason}")]
    LoadFailed { url: String, reason: String },
}

/// Platform primitives consumed by the navigation engine.
#[async_trait(?Send)]
pub trait Runtime {
    /// Run an inline script.
    fn execute_script(&self, script: &InlineScript);

    /// Attach an external stylesheet. Fire-and-forget.
    fn append_stylesheet(&self, href: &Url);

    /// Load and run an external script, resolving once it has finished.
    async fn load_script(&self, src: &Url) -> Result<(), AssetError>;

    /// Push a new history entry.
    fn push_state(&self, url: &Url);

    /// Leave the engine and navigate natively.
    fn navigate(&self, url: &Url);

    /// Full reload of the current URL.
    fn reload(&self);

    /// Scroll the given region (a selector) or the window to the top.
    fn scroll_to_top(&self, region: Option<&str>);

    /// Smooth-scroll to the element with this id.
    fn scroll_to_fragment(&self, id: &str);

    /// Image optimization pass for freshly inserted images.
    fn optimize_images(&self, images: &[ImageRef]) {
        let _ = images;
    }
}
