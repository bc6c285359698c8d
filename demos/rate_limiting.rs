//! Example demonstrating admission control.
//!
//! This example shows how to:
//! - Bound a client to a number of requests per second
//! - Share one limiter between tasks by cloning the client
//! - Give up on a request stuck waiting for admission
//!
//! Run with: `cargo run --example rate_limiting`

use governed_http::{Body, CancellationToken, Client, Error};
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("governed_http=info")
        .init();

    println!("=== Example 1: Two Requests Per Second ===");
    let client = Client::builder()
        .rate_limit_requests_per_second(2)
        .build()?;

    let started = Instant::now();
    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                let request = http::Request::get(format!("https://httpbin.org/get?i={}", i))
                    .body(Body::empty())?;
                let response = client.execute(request).await?;
                println!("request {} -> {} after {:?}", i, response.status(), started.elapsed());
                Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
            })
        })
        .collect();

    for task in tasks {
        if let Err(e) = task.await? {
            println!("request failed: {}", e);
        }
    }
    println!();

    println!("=== Example 2: Cancelling an Admission Wait ===");
    let client = Client::builder()
        .rate_limit_requests_per_second(1)
        .rate_limit_burst(1)
        .build()?;

    let request = || http::Request::get("https://httpbin.org/get").body(Body::empty());
    client.execute(request()?).await?;

    // The next admission is a second away; give up after 100ms.
    let cancel = CancellationToken::new();
    let timer = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        timer.cancel();
    });

    match client.execute_with_cancellation(request()?, &cancel).await {
        Err(Error::Cancelled) => println!("Cancelled while waiting for admission"),
        Ok(response) => println!("Unexpected success: {}", response.status()),
        Err(e) => println!("Error: {}", e),
    }

    Ok(())
}
