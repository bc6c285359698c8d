//! Wire logging of request and response bodies.
//!
//! [`LoggingTransport`] reads each body fully into memory, hands an
//! equivalent buffered body on (to the inner transport for requests, to the
//! caller for responses), and emits one structured record per direction to
//! its own [`tracing::Dispatch`]. Bodies longer than [`MAX_LOGGED_BODY_BYTES`]
//! are truncated in the record only; the bytes on the wire are never touched.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tracing::Dispatch;

use super::Transport;
use crate::{Body, Error, Request, Response, Result};

/// Bodies are logged up to this many bytes (1 MiB).
pub const MAX_LOGGED_BODY_BYTES: usize = 1 << 20;

/// Appended to the logged copy of a body cut at [`MAX_LOGGED_BODY_BYTES`].
pub const TRUNCATION_MARKER: &str = "...(truncated)";

/// A decorator logging request and response bodies at `debug` level.
///
/// Records:
///
/// - `"Sending request"` with `method`, `url`, `body`, for requests with a body;
/// - `"Received response"` with `status`, `body`, for responses with a body;
/// - `"Received error"` at `error` level with `error`, when the inner transport fails.
///
/// # Examples
///
/// ```
/// use governed_http::transport::{HttpTransport, HttpTransportConfig, LoggingTransport};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), governed_http::Error> {
/// let subscriber = tracing_subscriber::fmt()
///     .with_max_level(tracing::Level::DEBUG)
///     .finish();
/// let transport = LoggingTransport::new(
///     Arc::new(HttpTransport::new(&HttpTransportConfig::default())?),
///     tracing::Dispatch::new(subscriber),
/// );
/// # let _ = transport;
/// # Ok(())
/// # }
/// ```
pub struct LoggingTransport {
    inner: Arc<dyn Transport>,
    dispatch: Dispatch,
}

impl LoggingTransport {
    /// Wraps `inner`, sending records to `dispatch`.
    pub fn new(inner: Arc<dyn Transport>, dispatch: impl Into<Dispatch>) -> Self {
        Self {
            inner,
            dispatch: dispatch.into(),
        }
    }

    async fn round_trip(&self, request: Request) -> Result<Response> {
        let (parts, body) = request.into_parts();

        let body = if body.is_empty() {
            body
        } else {
            let captured = body.collect().await.map_err(Error::RequestBodyRead)?;
            let logged = loggable(&captured);
            tracing::dispatcher::with_default(&self.dispatch, || {
                tracing::debug!(
                    method = %parts.method,
                    url = %parts.uri,
                    body = %logged,
                    "Sending request"
                );
            });
            Body::from(captured)
        };

        let response = match self.inner.send(Request::from_parts(parts, body)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::dispatcher::with_default(&self.dispatch, || {
                    tracing::error!(error = %e, "Received error");
                });
                return Err(e);
            }
        };

        let (parts, body) = response.into_parts();
        if body.is_empty() {
            return Ok(Response::from_parts(parts, body));
        }

        let captured = body.collect().await.map_err(Error::ResponseBodyRead)?;
        let logged = loggable(&captured);
        tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::debug!(
                status = %parts.status,
                body = %logged,
                "Received response"
            );
        });

        Ok(Response::from_parts(parts, Body::from(captured)))
    }
}

impl Transport for LoggingTransport {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        Box::pin(self.round_trip(request))
    }
}

/// The text logged for a captured body.
///
/// An oversized body is cut at [`MAX_LOGGED_BODY_BYTES`], moved back to the
/// start of a UTF-8 sequence that would otherwise be split.
fn loggable(body: &Bytes) -> String {
    if body.len() > MAX_LOGGED_BODY_BYTES {
        let cut = utf8_cut(body, MAX_LOGGED_BODY_BYTES);
        let mut text = String::from_utf8_lossy(&body[..cut]).into_owned();
        text.push_str(TRUNCATION_MARKER);
        text
    } else {
        String::from_utf8_lossy(body).into_owned()
    }
}

/// Largest index `<= limit` that does not fall inside a UTF-8 sequence.
///
/// Backs off over at most three continuation bytes, so non-UTF-8 bodies are
/// still cut close to `limit`.
fn utf8_cut(body: &[u8], limit: usize) -> usize {
    let is_continuation = |b: u8| b & 0b1100_0000 == 0b1000_0000;
    let mut cut = limit;
    while cut > limit.saturating_sub(3) && cut < body.len() && is_continuation(body[cut]) {
        cut -= 1;
    }
    cut
}
