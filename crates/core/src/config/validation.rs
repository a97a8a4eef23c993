//! Configuration validation rules.
//!
//! This module provides validation logic for `NavConfig` values
//! after they have been loaded from environment, files, or defaults.
//! Individual URL patterns and selectors are not checked here: a broken
//! rule is dropped when rules are compiled, it never rejects the config.

use crate::config::NavConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl NavConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `content_selector` is blank
    /// - `request_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `prefetch_in_viewport` is on with `prefetch_max_entries` of 0
    /// - `user_agent` is empty or `max_bytes` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_selector.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "content_selector".into(),
                hint: "set SWAPNAV_CONTENT_SELECTOR to the swappable region".into(),
            });
        }

        if self.request_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.request_timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.prefetch_in_viewport && self.prefetch_max_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "prefetch_max_entries".into(),
                reason: "must be greater than 0 when prefetch_in_viewport is on".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }

        if !self.cache_enabled && !self.ignore_url_params.is_empty() {
            tracing::debug!(
                ignore_url_params = self.ignore_url_params.len(),
                "cache is disabled; ignore_url_params has no effect"
            );
        }

        Ok(())
    }
}
