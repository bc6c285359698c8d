//! The base transport: network I/O through `reqwest`.

use futures_util::future::BoxFuture;
use futures_util::TryStreamExt;
use std::io;
use std::time::Duration;
use url::Url;

use super::Transport;
use crate::{Body, Error, Request, Response, Result};

/// Settings for the `reqwest` client behind an [`HttpTransport`].
///
/// `HttpTransportConfig::default()` produces a fresh value every time, so
/// clients never share or mutate a process-wide default.
///
/// # Examples
///
/// ```
/// use governed_http::transport::HttpTransportConfig;
/// use std::time::Duration;
///
/// let config = HttpTransportConfig {
///     timeout: Duration::from_secs(30),
///     ..Default::default()
/// };
/// assert_eq!(config.max_idle_connections_per_host, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Overall timeout for one request, from connect until the body is read.
    pub timeout: Duration,
    /// Maximum idle connections across all hosts.
    ///
    /// `reqwest` pools per host only; this value is advisory.
    pub max_idle_connections: usize,
    /// Maximum idle connections kept per host.
    pub max_idle_connections_per_host: usize,
    /// How long an idle pooled connection is kept.
    pub idle_connection_timeout: Duration,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// TCP keep-alive probe interval.
    pub tcp_keepalive: Duration,
    /// Timeout for waiting on response data once the request is written.
    pub response_header_timeout: Duration,
    /// Wait for a `100 Continue` before sending a body.
    ///
    /// Not supported by `reqwest`; this value is advisory.
    pub expect_continue_timeout: Duration,
    /// Negotiate gzip response compression.
    pub compression: bool,
    /// Take the proxy from `HTTP_PROXY`, `HTTPS_PROXY` and `NO_PROXY`.
    pub proxy_from_env: bool,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_idle_connections: 100,
            max_idle_connections_per_host: 100,
            idle_connection_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            tcp_keepalive: Duration::from_secs(3),
            response_header_timeout: Duration::from_secs(10),
            expect_continue_timeout: Duration::from_secs(1),
            compression: true,
            proxy_from_env: true,
        }
    }
}

impl HttpTransportConfig {
    fn client_builder(&self) -> reqwest::ClientBuilder {
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.max_idle_connections_per_host)
            .pool_idle_timeout(self.idle_connection_timeout)
            .connect_timeout(self.connect_timeout)
            .tcp_keepalive(self.tcp_keepalive)
            .read_timeout(self.response_header_timeout)
            .gzip(self.compression);

        if self.proxy_from_env {
            builder
        } else {
            builder.no_proxy()
        }
    }
}

/// Sends requests over the network with a pooled `reqwest` client.
///
/// Response bodies are streamed: the body of the returned response reads from
/// the connection as it is consumed.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(config: &HttpTransportConfig) -> Result<Self> {
        let client = config.client_builder().build().map_err(|e| {
            Error::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self { client })
    }

    /// Wraps an already configured `reqwest` client.
    ///
    /// None of the [`HttpTransportConfig`] defaults are applied to `client`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        let (parts, body) = request.into_parts();
        let url = Url::parse(&parts.uri.to_string())?;

        let mut builder = self
            .client
            .request(parts.method, url)
            .version(parts.version)
            .headers(parts.headers);
        if let Some(body) = body.into_reqwest() {
            builder = builder.body(body);
        }

        let response = builder.send().await?;

        let mut converted = ::http::Response::builder()
            .status(response.status())
            .version(response.version());
        if let Some(headers) = converted.headers_mut() {
            headers.extend(response.headers().clone());
        }

        let stream = response.bytes_stream().map_err(io::Error::other);
        converted
            .body(Body::wrap_stream(stream))
            .map_err(Error::transport)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        Box::pin(self.execute(request))
    }
}
