//! CLI error types.

use mikro_client::{ClientError, StreamError};
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// An API call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A log stream ended with a failure.
    #[error("log stream failed: {0}")]
    Stream(#[from] StreamError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
