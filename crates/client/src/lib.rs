//! Client-side navigation engine for swapnav.
//!
//! This crate owns the live page model, the link matcher, the fetch
//! pipeline with its cache replay path, external asset loading, the
//! prefetch scheduler and the click/history controller. Platform effects
//! go through the [`Runtime`] trait; network access through [`Fetcher`].

pub mod assets;
pub mod controller;
pub mod dom;
pub mod engine;
pub mod fetch;
pub mod matcher;
mod pipeline;
pub mod prefetch;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

pub use assets::{AssetLoader, AssetReport};
pub use controller::{ClickOutcome, PopOutcome};
pub use dom::{FetchedDocument, LinkRef, Modifiers, Page};
pub use engine::{ContentReplaced, LoadOutcome, NavState, Navigator};
pub use fetch::{FetchConfig, FetchResponse, Fetcher, HttpFetcher};
pub use matcher::{Decision, Matcher, NavigationHooks, Rejection, Verdict};
pub use prefetch::{PrefetchOutcome, PrefetchSkip, PrefetchTrigger};
pub use runtime::{AssetError, ImageRef, InlineScript, Runtime};
