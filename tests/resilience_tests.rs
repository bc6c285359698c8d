//! Retry, cancellation, admission and body-capture behavior, exercised with
//! in-memory transports.

mod common;

use bytes::Bytes;
use common::Capture;
use futures_util::future::BoxFuture;
use futures_util::stream;
use governed_http::clock::MockClock;
use governed_http::transport::Transport;
use governed_http::{Body, CancellationToken, Client, Error, Request, Response, Result, RetryStrategy};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::Level;

fn request() -> Request {
    http::Request::get("http://service.test/resource")
        .body(Body::empty())
        .unwrap()
}

/// Fails every call with an error naming the attempt.
#[derive(Clone, Default)]
struct AlwaysFails {
    calls: Arc<AtomicUsize>,
}

impl Transport for AlwaysFails {
    fn send(&self, _request: Request) -> BoxFuture<'_, Result<Response>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Box::pin(async move {
            Err(Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("connection refused on attempt {}", call),
            )))
        })
    }
}

/// Responds with `status`, echoing the request body, and keeps every body it saw.
#[derive(Clone)]
struct Echo {
    status: u16,
    bodies: Arc<Mutex<Vec<Bytes>>>,
}

impl Echo {
    fn new(status: u16) -> Self {
        Self {
            status,
            bodies: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Transport for Echo {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        Box::pin(async move {
            let body = request.into_body().collect().await?;
            self.bodies.lock().unwrap().push(body.clone());
            let response = http::Response::builder()
                .status(self.status)
                .body(Body::from(body))
                .map_err(Error::transport)?;
            Ok(response)
        })
    }
}

/// Never answers.
struct Hangs;

impl Transport for Hangs {
    fn send(&self, _request: Request) -> BoxFuture<'_, Result<Response>> {
        Box::pin(std::future::pending())
    }
}

#[tokio::test(start_paused = true)]
async fn test_default_policy_exhausts_attempts_and_returns_last_error() {
    let transport = AlwaysFails::default();
    let calls = Arc::clone(&transport.calls);

    let client = Client::builder()
        .clock(MockClock::default())
        .base_transport(transport)
        .build()
        .unwrap();

    let err = client.execute(request()).await.unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 5);
    // The final attempt's error, not the first one and not an aggregate.
    assert_eq!(err.to_string(), "I/O error: connection refused on attempt 5");
}

#[tokio::test(start_paused = true)]
async fn test_configured_strategy_bounds_attempts() {
    let transport = AlwaysFails::default();
    let calls = Arc::clone(&transport.calls);

    let client = Client::builder()
        .clock(MockClock::default())
        .retry_strategy(RetryStrategy::Linear {
            delay: Duration::from_millis(10),
            max_retries: 2,
        })
        .base_transport(transport)
        .build()
        .unwrap();

    let err = client.execute(request()).await.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(err.to_string().ends_with("attempt 3"));

    // A fresh policy per call: the budget is not shared between calls.
    client.execute(request()).await.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_server_error_status_is_not_retried() {
    let transport = Echo::new(500);
    let bodies = Arc::clone(&transport.bodies);

    let client = Client::builder()
        .clock(MockClock::default())
        .base_transport(transport)
        .build()
        .unwrap();

    let response = client.execute(request()).await.unwrap();
    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_during_admission_wait_returns_promptly() {
    let client = Client::builder()
        .rate_limit_requests_per_second(1)
        .base_transport(Echo::new(200))
        .build()
        .unwrap();

    // Takes the only token; the next call has to wait a full second.
    client.execute(request()).await.unwrap();

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let result = client.execute_with_cancellation(request(), &cancel).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(started.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn test_cancel_during_network_wait() {
    let client = Client::builder()
        .clock(MockClock::default())
        .base_transport(Hangs)
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = client.execute_with_cancellation(request(), &cancel).await;
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[tokio::test]
async fn test_sequential_calls_take_at_least_n_minus_one_intervals() {
    for rate in [1u32, 3, 20] {
        let clock = MockClock::default();
        let client = Client::builder()
            .rate_limit_requests_per_second(rate)
            .clock(clock.clone())
            .base_transport(Echo::new(200))
            .build()
            .unwrap();

        let n = 7u32;
        for _ in 0..n {
            client.execute(request()).await.unwrap();
        }

        assert!(clock.elapsed() >= Duration::from_secs(1) / rate * (n - 1));
    }
}

#[tokio::test]
async fn test_clients_do_not_share_admission_state() {
    let clock = MockClock::default();
    let build = || {
        Client::builder()
            .rate_limit_requests_per_second(1)
            .clock(clock.clone())
            .base_transport(Echo::new(200))
            .build()
            .unwrap()
    };
    let (first, second) = (build(), build());

    let (a, b) = tokio::join!(first.execute(request()), second.execute(request()));
    a.unwrap();
    b.unwrap();

    // Each client admitted its first request immediately.
    assert_eq!(clock.elapsed(), Duration::ZERO);

    // A clone shares its client's bucket.
    first.clone().execute(request()).await.unwrap();
    assert_eq!(clock.elapsed(), Duration::from_secs(1));
}

#[tokio::test]
async fn test_logged_request_body_is_forwarded_intact() {
    let transport = Echo::new(200);
    let bodies = Arc::clone(&transport.bodies);
    let capture = Capture::default();

    let client = Client::builder()
        .clock(MockClock::default())
        .wire_logging(capture.dispatch())
        .base_transport(transport)
        .build()
        .unwrap();

    let chunks = vec![
        Ok::<_, io::Error>(Bytes::from("streamed ")),
        Ok(Bytes::from("payload")),
    ];
    let request = http::Request::put("http://service.test/upload")
        .body(Body::wrap_stream(stream::iter(chunks)))
        .unwrap();

    let response = client.execute(request).await.unwrap();

    assert_eq!(bodies.lock().unwrap()[0], "streamed payload");
    assert_eq!(response.into_body().collect().await.unwrap(), "streamed payload");

    let sent = capture.with_message("Sending request");
    assert_eq!(sent[0].field("body"), Some("streamed payload"));
    assert_eq!(sent[0].field("method"), Some("PUT"));
}

#[tokio::test(start_paused = true)]
async fn test_request_body_read_failure_is_retried_with_empty_body() {
    let transport = Echo::new(200);
    let bodies = Arc::clone(&transport.bodies);
    let capture = Capture::default();

    let client = Client::builder()
        .clock(MockClock::default())
        .wire_logging(capture.dispatch())
        .base_transport(transport)
        .build()
        .unwrap();

    let chunks = vec![
        Ok(Bytes::from("partial")),
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "client went away")),
    ];
    let request = http::Request::post("http://service.test/upload")
        .body(Body::wrap_stream(stream::iter(chunks)))
        .unwrap();

    // The stream fails during capture on the first attempt. The retry can only
    // send what is left of a single-use body: nothing.
    let response = client.execute(request).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(*bodies.lock().unwrap(), vec![Bytes::new()]);
    assert!(capture.with_message("Sending request").is_empty());
}

#[tokio::test]
async fn test_response_body_read_failure_names_response_side() {
    struct BrokenBody;

    impl Transport for BrokenBody {
        fn send(&self, _request: Request) -> BoxFuture<'_, Result<Response>> {
            Box::pin(async {
                let chunks = vec![
                    Ok(Bytes::from("head")),
                    Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
                ];
                Ok(http::Response::new(Body::wrap_stream(stream::iter(chunks))))
            })
        }
    }

    let capture = Capture::default();
    let client = Client::builder()
        .clock(MockClock::default())
        .retry_strategy(RetryStrategy::None)
        .wire_logging(capture.dispatch())
        .base_transport(BrokenBody)
        .build()
        .unwrap();

    let err = client.execute(request()).await.unwrap_err();

    match &err {
        Error::ResponseBodyRead(source) => assert_eq!(source.kind(), io::ErrorKind::ConnectionReset),
        other => panic!("Expected ResponseBodyRead, got {:?}", other),
    }
    assert_eq!(err.to_string(), "failed to read response body: reset");
    assert!(capture.with_message("Received response").is_empty());
}

#[tokio::test]
async fn test_inner_error_is_logged_and_propagated_unchanged() {
    let capture = Capture::default();
    let client = Client::builder()
        .clock(MockClock::default())
        .retry_strategy(RetryStrategy::None)
        .wire_logging(capture.dispatch())
        .base_transport(AlwaysFails::default())
        .build()
        .unwrap();

    let err = client
        .execute(
            http::Request::post("http://service.test/")
                .body(Body::from("body"))
                .unwrap(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::ConnectionRefused));

    let errors = capture.with_message("Received error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].level, Level::ERROR);
    assert_eq!(
        errors[0].field("error"),
        Some("I/O error: connection refused on attempt 1")
    );
    assert_eq!(capture.with_message("Sending request").len(), 1);
    assert!(capture.with_message("Received response").is_empty());
}
