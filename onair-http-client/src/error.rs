//! HTTP client error types.

use std::fmt;
use thiserror::Error;

/// Result type for HTTP client operations.
pub type Result<T> = std::result::Result<T, HttpClientError>;

/// An unsuccessful HTTP response (status code 300 or above).
///
/// Carries everything needed to inspect the failure after the response body
/// has been drained. An `HttpError` can also be used as a *pattern*: a status
/// of `0` matches any status and an empty body matches any body. See
/// [`HttpError::matches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    /// URL of the originating request.
    pub url: String,
    /// HTTP status code returned by the server.
    pub status: u16,
    /// Response body captured as text.
    pub body: String,
}

impl HttpError {
    /// Create an error for a failed response.
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a pattern for use with [`HttpError::matches`].
    ///
    /// ```
    /// use onair_http_client::HttpError;
    ///
    /// let not_found = HttpError::pattern(404, "");
    /// let mentions_missing = HttpError::pattern(0, "missing");
    ///
    /// let error = HttpError::new("https://api.example.com/shows/7", 404, "show missing");
    /// assert!(error.matches(&not_found));
    /// assert!(error.matches(&mentions_missing));
    /// ```
    pub fn pattern(status: u16, body: impl Into<String>) -> Self {
        Self::new(String::new(), status, body)
    }

    /// Check whether this error matches `pattern`.
    ///
    /// The status must be equal unless the pattern's status is `0`, and the
    /// pattern's body must be contained in this error's body unless it is
    /// empty. The URL is never compared.
    pub fn matches(&self, pattern: &HttpError) -> bool {
        (self.status == pattern.status || pattern.status == 0)
            && (pattern.body.is_empty() || self.body.contains(&pattern.body))
    }

    /// Check if the status is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the status is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Request to {} failed with status code {} and body {}",
            self.url, self.status, self.body
        )
    }
}

impl std::error::Error for HttpError {}

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The server answered with a status code of 300 or above.
    #[error(transparent)]
    Status(#[from] HttpError),

    /// The request's cancellation token fired.
    #[error("Request cancelled")]
    Cancelled,

    /// Transport failure reported by a custom transport.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request payload could not be serialized.
    #[error("Error encoding data: {0}")]
    Encode(String),

    /// Response body could not be deserialized.
    #[error("Error decoding response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request context value was requested but never set.
    #[error("{0} is not in the request context")]
    MissingContext(&'static str),

    /// Underlying HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error while reading a body.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HttpClientError {
    /// Check if this error must never be retried.
    ///
    /// Caller-side mistakes and cancellation are permanent. Transport
    /// failures, error statuses and decode failures are left to the backoff
    /// policy.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Cancelled
            | Self::InvalidUrl(_)
            | Self::Encode(_)
            | Self::Config(_)
            | Self::MissingContext(_) => true,
            Self::Http(e) => e.is_builder(),
            _ => false,
        }
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Check if this is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Transport(_)) || matches!(self, Self::Http(e) if e.is_connect())
    }

    /// Get the HTTP status code if this is a status error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status(e) => Some(e.status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Get the [`HttpError`] if this is a status error.
    pub fn http_error(&self) -> Option<&HttpError> {
        match self {
            Self::Status(e) => Some(e),
            _ => None,
        }
    }

    /// Check whether this is a status error matching `pattern`.
    pub fn matches(&self, pattern: &HttpError) -> bool {
        self.http_error().is_some_and(|e| e.matches(pattern))
    }
}
