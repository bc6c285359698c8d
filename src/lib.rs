//! # governed-http - an outbound HTTP client with guard rails
//!
//! `governed-http` wraps raw request execution with three controls:
//!
//! - **Admission control** - a token-bucket [`RateLimiter`](rate_limit::RateLimiter)
//!   bounds how often new requests may begin.
//! - **Resilience** - a [`RetryPolicy`] retries transport failures with
//!   exponential backoff and jitter. HTTP status codes never trigger a retry.
//! - **Observability** - an optional [`LoggingTransport`](transport::LoggingTransport)
//!   logs request and response bodies, and arbitrary decorators (tracing,
//!   metrics) plug in as [transport wrappers](ClientBuilder::transport_wrapper).
//!
//! ## Quick Start
//!
//! ```no_run
//! use governed_http::{Body, Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .rate_limit_requests_per_second(5)
//!         .build()?;
//!
//!     let request = http::Request::get("https://api.example.com/users/123")
//!         .body(Body::empty())?;
//!
//!     let response = client.execute(request).await?;
//!     println!("Status: {}", response.status());
//!     println!("Body: {}", response.into_body().text().await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## How a call is executed
//!
//! Every [`Client::execute`] call builds a fresh retry policy. Each attempt
//! first waits for the rate limiter, then sends the request through the
//! transport chain: the last wrapper added is outermost, wire logging (when
//! enabled) sits directly on the base `reqwest` transport. Errors travel back
//! unchanged; the policy retries them until its budget runs out and then
//! returns the final attempt's error.
//!
//! ## Wire logging
//!
//! ```no_run
//! use governed_http::Client;
//!
//! # fn example() -> Result<(), governed_http::Error> {
//! let subscriber = tracing_subscriber::fmt()
//!     .with_max_level(tracing::Level::DEBUG)
//!     .finish();
//!
//! let client = Client::builder()
//!     .wire_logging(subscriber)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod body;
mod client;
pub mod clock;
mod error;
pub mod rate_limit;
pub mod retry;
pub mod transport;

pub use body::Body;
pub use client::{Client, ClientBuilder};
pub use error::{Error, Result};
pub use retry::{RetryPolicy, RetryStrategy};
pub use tokio_util::sync::CancellationToken;

/// A request as it travels through the transport chain.
pub type Request = http::Request<Body>;

/// A response as it travels back through the transport chain.
pub type Response = http::Response<Body>;
