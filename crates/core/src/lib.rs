//! Core types and shared functionality for swapnav.
//!
//! This crate provides:
//! - Session page cache and the executed-script registry
//! - Unified error types
//! - Configuration structures and compiled URL rules

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheEntry, CacheStore, cache_key, script_hash};
pub use config::{ConfigError, HeadSeoConfig, NavConfig, UrlRules};
pub use error::Error;
