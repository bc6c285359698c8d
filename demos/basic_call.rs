//! Basic example demonstrating simple GET and POST requests.
//!
//! This example shows how to:
//! - Create a client with basic configuration
//! - Send a GET request and read the body
//! - Send a JSON POST request and decode the response
//!
//! Run with: `cargo run --example basic_call`

use governed_http::{Body, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("governed_http=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .rate_limit_requests_per_second(2)
        .build()?;

    println!("=== GET Request Example ===");
    let request = http::Request::get("https://jsonplaceholder.typicode.com/posts/1")
        .body(Body::empty())?;
    let response = client.execute(request).await?;

    println!("Status code: {}", response.status());
    let post: Post = response.into_body().json_value().await?;
    println!("Post ID: {}", post.id);
    println!("Title: {}", post.title);
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };
    let request = http::Request::post("https://jsonplaceholder.typicode.com/posts")
        .header("content-type", "application/json")
        .body(Body::json(&new_post)?)?;
    let response = client.execute(request).await?;

    println!("Status code: {}", response.status());
    println!("Content-Type: {:?}", response.headers().get("content-type"));
    let created: Post = response.into_body().json_value().await?;
    println!("Created post ID: {}", created.id);

    Ok(())
}
