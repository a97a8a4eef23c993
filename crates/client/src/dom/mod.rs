//! Document model: the live page, fetched documents and link descriptions.

pub mod fetched;
pub mod link;
pub mod page;
pub mod selectors;

pub use fetched::{CriticalScriptRules, ExternalScript, FetchedDocument, extract_critical_scripts};
pub use link::{LinkRef, Modifiers};
pub use page::Page;
pub use selectors::Selectors;
