//! Session-scoped page cache.
//!
//! Entries are keyed by the page URL with its fragment removed. Eligibility
//! is decided only when writing: a key present in the store was eligible at
//! insertion time. Nothing is evicted; the store lives as long as the engine.

pub mod hash;
pub mod store;

pub use hash::{ExecutedScripts, script_hash};
pub use store::{CacheEntry, CacheStore, cache_key};
