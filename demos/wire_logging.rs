//! Example demonstrating wire logging of request and response bodies.
//!
//! The logger is an ordinary `tracing` subscriber handed to the client. Wire
//! records go to it even when the process-wide subscriber filters them out.
//!
//! Run with: `cargo run --example wire_logging`

use governed_http::{Body, Client};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let wire_logger = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .finish();

    let client = Client::builder().wire_logging(wire_logger).build()?;

    let request = http::Request::post("https://httpbin.org/anything")
        .header("content-type", "text/plain")
        .body(Body::from("hello from governed-http"))?;

    let response = client.execute(request).await?;

    // The logger consumed the body, but the caller still gets all of it.
    println!("Status: {}", response.status());
    println!("Body length: {} bytes", response.into_body().collect().await?.len());

    Ok(())
}
