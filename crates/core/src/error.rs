//! Unified error types for swapnav.
//!
//! Every failure the navigation pipeline can hit maps to one of these
//! variants. Only [`Error::Aborted`] is silent; everything else ends in a
//! fallback to native navigation.

use crate::config::ConfigError;

/// Unified error types for the navigation engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// URL could not be parsed or uses an unsupported scheme.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Transport failure or non-success status.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Response did not declare an HTML content type.
    #[error("CONTENT_TYPE: {0}")]
    ContentType(String),

    /// Response body exceeded the configured limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// The live document has no element matching the content selector.
    #[error("MISSING_CONTAINER: {0}")]
    MissingContainer(String),

    /// The fetched document has no element matching the content selector.
    #[error("MISSING_FRAGMENT: {0}")]
    MissingFragment(String),

    /// Request was superseded by a newer navigation or timed out.
    #[error("ABORTED")]
    Aborted,

    /// Configuration could not be loaded or compiled.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether this error is the silent cancellation outcome.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::HttpError("status 503".to_string());
        assert!(err.to_string().contains("HTTP_ERROR"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_is_abort() {
        assert!(Error::Aborted.is_abort());
        assert!(!Error::ContentType("application/json".into()).is_abort());
    }

    #[test]
    fn test_config_error_conversion() {
        let err: Error = ConfigError::LoadFailed("bad toml".into()).into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().starts_with("CONFIG_ERROR"));
    }
}
