use std::sync::Arc;

use thiserror::Error;

use crate::response::Response;

/// Result type for croc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for croc
///
/// Errors are cheap to clone so that the builder can hand the same value back
/// from `end()` and keep it as its sticky error.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Incomplete request configuration (missing method or url)
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing errors
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Malformed proxy configuration
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// Invalid header name or value
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, TLS or protocol failure reported by the transport
    #[error("Transport error: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// Timeout errors
    #[error("Request timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The response body stream failed mid-read
    #[error("Failed to read response body: {0}")]
    BodyRead(#[source] Arc<reqwest::Error>),
}

impl Error {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Create a new proxy error
    pub fn proxy(message: impl Into<String>) -> Self {
        Error::Proxy(message.into())
    }

    /// Create a new invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest(message.into())
    }

    /// Create a new timeout error
    pub fn timeout(duration: std::time::Duration) -> Self {
        Error::Timeout { duration }
    }

    /// Wrap a reqwest error raised while reading a response body
    pub fn body_read(err: reqwest::Error) -> Self {
        Error::BodyRead(Arc::new(err))
    }

    /// Check if this error was detected before any network I/O
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Url(_) | Error::Proxy(_) | Error::InvalidRequest(_)
        )
    }

    /// Check if this is a transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout { .. })
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Check if the response body could not be read
    pub fn is_body_read(&self) -> bool {
        matches!(self, Error::BodyRead(_))
    }

    /// Get the underlying reqwest error, if any
    pub fn as_reqwest_error(&self) -> Option<&reqwest::Error> {
        match self {
            Error::Transport(e) | Error::BodyRead(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Arc::new(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Error::InvalidRequest(format!("Invalid header name: {}", err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Error::InvalidRequest(format!("Invalid header value: {}", err))
    }
}

/// Failure of a one-shot exchange
///
/// When the request went out but its body could not be read, the response
/// metadata is still carried here.
#[derive(Error, Debug)]
#[error("{source}")]
pub struct ExchangeError {
    response: Option<Response>,
    #[source]
    source: Error,
}

impl ExchangeError {
    pub(crate) fn new(response: Option<Response>, source: Error) -> Self {
        Self { response, source }
    }

    /// Get the response, if one was received before the failure
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Get the underlying error
    pub fn error(&self) -> &Error {
        &self.source
    }

    /// Split into the received response and the error
    pub fn into_parts(self) -> (Option<Response>, Error) {
        (self.response, self.source)
    }
}

impl From<ExchangeError> for Error {
    fn from(err: ExchangeError) -> Self {
        err.source
    }
}
