//! Example demonstrating custom transport wrappers.
//!
//! A wrapper is any function from one transport to another. Here one adds a
//! header and another times each attempt; the timing wrapper is added last, so
//! it is outermost and measures everything below it.
//!
//! Run with: `cargo run --example transport_wrappers`

use futures_util::future::BoxFuture;
use governed_http::transport::Transport;
use governed_http::{Body, Client, Request, Response, Result};
use std::sync::Arc;
use std::time::Instant;

struct UserAgent {
    inner: Arc<dyn Transport>,
    value: http::HeaderValue,
}

impl Transport for UserAgent {
    fn send(&self, mut request: Request) -> BoxFuture<'_, Result<Response>> {
        request
            .headers_mut()
            .insert(http::header::USER_AGENT, self.value.clone());
        self.inner.send(request)
    }
}

struct Timing {
    inner: Arc<dyn Transport>,
}

impl Transport for Timing {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        Box::pin(async move {
            let started = Instant::now();
            let url = request.uri().clone();
            let result = self.inner.send(request).await;
            tracing::info!(url = %url, elapsed_ms = started.elapsed().as_millis(), ok = result.is_ok(), "Attempt finished");
            result
        })
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("governed_http=debug,transport_wrappers=info")
        .init();

    let client = Client::builder()
        .transport_wrapper(|inner| UserAgent {
            inner,
            value: http::HeaderValue::from_static("governed-http-demo/0.1"),
        })
        .transport_wrapper(|inner| Timing { inner })
        .build()?;

    let request = http::Request::get("https://httpbin.org/user-agent").body(Body::empty())?;
    let response = client.execute(request).await?;

    println!("Status: {}", response.status());
    println!("Body: {}", response.into_body().text().await?);

    Ok(())
}
