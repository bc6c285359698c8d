//! Error types for governed HTTP calls.
//!
//! Every failure a caller can observe from [`Client::execute`](crate::Client::execute)
//! is one of the variants below. Non-success HTTP statuses are *not* errors at
//! this layer: a `500` response is returned as a normal [`Response`](crate::Response)
//! for the caller to interpret.

use std::io;

/// The main error type for governed HTTP calls.
///
/// # Examples
///
/// ```no_run
/// use governed_http::{Body, Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().build()?;
/// let request = http::Request::get("https://api.example.com/health")
///     .body(Body::empty())
///     .map_err(|e| Error::Configuration(e.to_string()))?;
///
/// match client.execute(request).await {
///     Ok(response) => println!("Status: {}", response.status()),
///     Err(Error::Cancelled) => eprintln!("Caller gave up"),
///     Err(Error::Timeout) => eprintln!("Timed out on every attempt"),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error reported by `reqwest` (connection refused, DNS, TLS, ...).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// An I/O error raised by a transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The logging transport could not capture the outgoing request body.
    #[error("failed to read request body: {0}")]
    RequestBodyRead(#[source] io::Error),

    /// The logging transport could not capture the incoming response body.
    #[error("failed to read response body: {0}")]
    ResponseBodyRead(#[source] io::Error),

    /// An error produced by a custom transport wrapper.
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid configuration was provided.
    ///
    /// Raised by [`ClientBuilder::build`](crate::ClientBuilder::build), for
    /// example when wire logging is enabled without a logger.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The caller's cancellation token fired before the call completed.
    #[error("Request cancelled")]
    Cancelled,

    /// Failed to serialize a JSON request body.
    #[error("Failed to serialize request: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Failed to deserialize a JSON response body.
    ///
    /// The raw body is kept so it can be inspected when debugging.
    #[error("Failed to deserialize response: {serde_error}")]
    Deserialization {
        /// The raw response body, lossily decoded.
        raw_response: String,
        /// The serde error message.
        serde_error: String,
    },
}

impl Error {
    /// Returns `true` if the retry policy may attempt the request again.
    ///
    /// Every failure is retried until the budget runs out, except
    /// cancellation: once the caller's token fires no further attempt is made.
    ///
    /// # Examples
    ///
    /// ```
    /// use governed_http::Error;
    ///
    /// assert!(Error::Timeout.is_retryable());
    /// assert!(!Error::Cancelled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::Cancelled)
    }

    /// Wraps an arbitrary error raised by a custom transport.
    pub fn transport(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Transport(error.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(error)
        }
    }
}

/// A specialized `Result` type for governed HTTP calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_read_errors_name_their_side() {
        let err = Error::RequestBodyRead(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert_eq!(err.to_string(), "failed to read request body: eof");
        assert!(err.is_retryable());

        let err = Error::ResponseBodyRead(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(err.to_string(), "failed to read response body: reset");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_only_cancellation_is_final() {
        assert!(!Error::Cancelled.is_retryable());
        assert!(Error::Configuration("bad".to_string()).is_retryable());
        assert!(Error::InvalidUrl(url::ParseError::EmptyHost).is_retryable());
        assert!(Error::Deserialization {
            raw_response: "not json".to_string(),
            serde_error: "expected value".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn test_transport_wraps_custom_errors() {
        let err = Error::transport("span exporter unavailable");
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Transport error: span exporter unavailable");
    }
}
