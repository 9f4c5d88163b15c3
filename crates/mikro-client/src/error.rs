//! Error types for the Mikrocloud client.

use thiserror::Error;

/// Errors returned by REST operations and client setup.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body, or the status reason.
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A URL could not be built from the configured base.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The operation needs a session but none has been issued.
    #[error("not authenticated, log in first")]
    Unauthenticated,

    /// The session file could not be read or written.
    #[error("session error: {0}")]
    Session(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the API rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthenticated) || self.status() == Some(401)
    }
}

/// Terminal failures of a log stream.
///
/// Delivered at most once through the stream's error callback. Caller
/// cancellation is never reported as a `StreamError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The log endpoint answered with a non-success status.
    #[error("log stream rejected ({status}): {message}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body, or the status reason.
        message: String,
    },

    /// The response carried no readable body.
    #[error("log stream has no readable body: {0}")]
    BodyUnreadable(String),

    /// The connection failed while connecting or reading.
    #[error("log stream network failure: {0}")]
    Network(String),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
