//! HTTP client with admission control, retries and wire logging.
//!
//! The [`Client`] type is the main entry point for sending requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    clock::{Clock, SystemClock},
    rate_limit::RateLimiter,
    retry::{RetryPolicy, RetryStrategy},
    transport::{HttpTransport, HttpTransportConfig, Transport, TransportChain, TransportWrapper},
    Body, Error, Request, Response, Result,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// An HTTP client that rate-limits, retries and optionally logs every request.
///
/// The client is designed to be reused across many requests and is cheap to
/// clone; clones share the same rate limiter and transport chain. Separate
/// clients never share admission state.
///
/// # Examples
///
/// ```no_run
/// use governed_http::{Body, Client};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::builder()
///     .rate_limit_requests_per_second(10)
///     .build()?;
///
/// let request = http::Request::post("https://api.example.com/users")
///     .header("content-type", "application/json")
///     .body(Body::from(r#"{"name":"Alice"}"#))?;
///
/// let response = client.execute(request).await?;
/// println!("Status: {}", response.status());
/// println!("Body: {}", response.into_body().text().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: TransportChain,
    rate_limiter: RateLimiter,
    retry_strategy: RetryStrategy,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Sends a request through the rate limiter, the retry policy and the
    /// transport chain.
    ///
    /// Only transport failures are retried. A response with any status code,
    /// including `5xx`, is returned as `Ok`.
    ///
    /// The same request is reused for every attempt. Buffered bodies are sent
    /// again in full; a streaming body can be read only once, so attempts after
    /// the first send it empty.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt once retries are exhausted.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.execute_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), but returns [`Error::Cancelled`] as
    /// soon as `cancel` fires, whether the call is waiting for admission,
    /// backing off between attempts or waiting on the network.
    pub async fn execute_with_cancellation(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let start_time = Instant::now();
        let retry_policy = RetryPolicy::new(self.inner.retry_strategy.clone());
        let mut template = ReplayableRequest::new(request);
        let mut attempts = 0;

        let response = retry_policy
            .execute(cancel, |attempt| {
                attempts = attempt;
                let request = template.next_attempt();
                self.attempt(request, attempt)
            })
            .await?;

        tracing::info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            attempts = attempts,
            "Received HTTP response"
        );

        Ok(response)
    }

    /// Executes a single attempt: wait for admission, then send.
    async fn attempt(&self, request: Request, attempt: usize) -> Result<Response> {
        self.inner.rate_limiter.acquire().await;

        tracing::debug!(
            method = %request.method(),
            url = %request.uri(),
            attempt = attempt,
            "Executing HTTP request"
        );

        self.inner.transport.send(request).await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.inner.transport)
            .field("rate_limiter", &self.inner.rate_limiter)
            .field("retry_strategy", &self.inner.retry_strategy)
            .finish()
    }
}

/// Holds the caller's request and hands out one copy per attempt.
struct ReplayableRequest {
    parts: http::request::Parts,
    body: Option<Body>,
}

impl ReplayableRequest {
    fn new(request: Request) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body: Some(body),
        }
    }

    fn next_attempt(&mut self) -> Request {
        let body = match self.body.as_ref().and_then(Body::try_clone) {
            Some(replay) => replay,
            None => self.body.take().unwrap_or_default(),
        };

        let mut request = Request::new(body);
        *request.method_mut() = self.parts.method.clone();
        *request.uri_mut() = self.parts.uri.clone();
        *request.version_mut() = self.parts.version;
        *request.headers_mut() = self.parts.headers.clone();
        *request.extensions_mut() = self.parts.extensions.clone();
        request
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use governed_http::{ClientBuilder, RetryStrategy};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), governed_http::Error> {
/// let subscriber = tracing_subscriber::fmt()
///     .with_max_level(tracing::Level::DEBUG)
///     .finish();
///
/// let client = ClientBuilder::new()
///     .rate_limit_requests_per_second(5)
///     .retry_strategy(RetryStrategy::ExponentialBackoff {
///         initial_delay: Duration::from_millis(100),
///         max_delay: Duration::from_secs(10),
///         max_retries: 3,
///         jitter: true,
///     })
///     .wire_logging(subscriber)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    rate_limit_requests_per_second: u32,
    rate_limit_burst: Option<u32>,
    clock: Arc<dyn Clock>,
    wire_logging_enabled: bool,
    logger: Option<tracing::Dispatch>,
    transport_wrappers: Vec<TransportWrapper>,
    retry_strategy: RetryStrategy,
    http_config: HttpTransportConfig,
    base_transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings: one request per
    /// second, the system clock, no wire logging, no wrappers, and the default
    /// exponential backoff.
    pub fn new() -> Self {
        Self {
            rate_limit_requests_per_second: 1,
            rate_limit_burst: None,
            clock: Arc::new(SystemClock),
            wire_logging_enabled: false,
            logger: None,
            transport_wrappers: Vec::new(),
            retry_strategy: RetryStrategy::default_backoff(),
            http_config: HttpTransportConfig::default(),
            base_transport: None,
        }
    }

    /// Sets the steady-state admission rate. Must be at least 1.
    pub fn rate_limit_requests_per_second(mut self, requests_per_second: u32) -> Self {
        self.rate_limit_requests_per_second = requests_per_second;
        self
    }

    /// Sets how many requests may be admitted back to back after the client
    /// has been idle. Defaults to the rate.
    pub fn rate_limit_burst(mut self, burst: u32) -> Self {
        self.rate_limit_burst = Some(burst);
        self
    }

    /// Replaces the time source used by the rate limiter.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Enables wire logging, sending records to `logger`.
    pub fn wire_logging(mut self, logger: impl Into<tracing::Dispatch>) -> Self {
        self.logger = Some(logger.into());
        self.wire_logging_enabled = true;
        self
    }

    /// Turns wire logging on or off. Enabling it requires a [`logger`](Self::logger).
    pub fn wire_logging_enabled(mut self, enabled: bool) -> Self {
        self.wire_logging_enabled = enabled;
        self
    }

    /// Sets the sink for wire logging records.
    pub fn logger(mut self, logger: impl Into<tracing::Dispatch>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    /// Adds a decorator at the outer end of the transport chain.
    ///
    /// Wrappers are applied in call order, so the last one added sees
    /// requests first.
    pub fn transport_wrapper<F, T>(mut self, wrapper: F) -> Self
    where
        F: FnOnce(Arc<dyn Transport>) -> T + Send + 'static,
        T: Transport + 'static,
    {
        self.transport_wrappers
            .push(Box::new(move |inner: Arc<dyn Transport>| {
                Arc::new(wrapper(inner)) as Arc<dyn Transport>
            }));
        self
    }

    /// Sets the backoff schedule. A fresh retry policy following it is
    /// created for every call.
    pub fn retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// Sets the configuration of the built-in `reqwest` transport.
    pub fn http_config(mut self, config: HttpTransportConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Replaces the built-in `reqwest` transport with `transport`.
    pub fn base_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.base_transport = Some(Arc::new(transport));
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if wire logging is enabled without a
    /// logger, if the rate is zero, or if the HTTP client cannot be built.
    pub fn build(self) -> Result<Client> {
        if self.rate_limit_requests_per_second == 0 {
            return Err(Error::Configuration(
                "Rate limit must be at least one request per second".to_string(),
            ));
        }

        let logging = match (self.wire_logging_enabled, self.logger) {
            (true, Some(logger)) => Some(logger),
            (true, None) => {
                return Err(Error::Configuration(
                    "Wire logging requires a logger".to_string(),
                ))
            }
            (false, _) => None,
        };

        let base: Arc<dyn Transport> = match self.base_transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&self.http_config)?),
        };

        let rate_limiter = RateLimiter::with_burst(
            self.rate_limit_requests_per_second,
            self.rate_limit_burst
                .unwrap_or(self.rate_limit_requests_per_second),
            self.clock,
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport: TransportChain::new(base, logging, self.transport_wrappers),
                rate_limiter,
                retry_strategy: self.retry_strategy,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
