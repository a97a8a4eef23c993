//! Errors raised by the swapnav binary itself.

/// Failures outside the engine: bad arguments, unusable start page, output.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The start URL did not parse or is not http(s).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The engine refused to start on the fetched page.
    #[error("INIT_FAILED: {0}")]
    InitFailed(String),

    /// A step could not be written to stdout.
    #[error("OUTPUT_FAILED: {0}")]
    Output(#[from] serde_json::Error),
}
