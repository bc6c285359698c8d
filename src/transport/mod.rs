//! The transport capability and its decorator chain.
//!
//! A [`Transport`] sends one request and produces a response or an error.
//! Decorators implement the same trait around an inner transport, and a
//! [`TransportChain`] is the result of layering them once over a base
//! transport that performs the network I/O.

use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

use crate::{Request, Response, Result};

pub mod http;
pub mod logging;

pub use self::http::{HttpTransport, HttpTransportConfig};
pub use self::logging::LoggingTransport;

/// Sends a request and produces a response or an error.
///
/// Implementations must be safe to call concurrently: one chain is shared by
/// every call made through a client. Dropping the returned future must cancel
/// any work in flight.
///
/// # Examples
///
/// A decorator counting requests before delegating to the transport it wraps:
///
/// ```
/// use governed_http::transport::Transport;
/// use governed_http::{Request, Response, Result};
/// use futures_util::future::BoxFuture;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// struct Counting {
///     inner: Arc<dyn Transport>,
///     sent: AtomicUsize,
/// }
///
/// impl Transport for Counting {
///     fn send(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
///         self.sent.fetch_add(1, Ordering::Relaxed);
///         self.inner.send(request)
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Sends `request` and resolves to the response or the transport error.
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        (**self).send(request)
    }
}

/// Maps one transport to another; used to add a decorator to the chain.
///
/// Wrappers are applied once, when the client is built.
pub type TransportWrapper = Box<dyn FnOnce(Arc<dyn Transport>) -> Arc<dyn Transport> + Send>;

/// An immutable stack of decorators ending in a base transport.
///
/// The base transport is innermost. When wire logging is on, a
/// [`LoggingTransport`] wraps it directly. Each wrapper then wraps the result
/// of the previous step, so the last wrapper supplied is outermost: it sees
/// outgoing requests first and incoming responses last.
#[derive(Clone)]
pub struct TransportChain {
    outermost: Arc<dyn Transport>,
    layers: usize,
}

impl TransportChain {
    /// Folds `wrappers` over `base`, inserting `logging` directly above it.
    pub fn new(
        base: Arc<dyn Transport>,
        logging: Option<tracing::Dispatch>,
        wrappers: Vec<TransportWrapper>,
    ) -> Self {
        let mut layers = 0;
        let mut transport = base;

        if let Some(dispatch) = logging {
            transport = Arc::new(LoggingTransport::new(transport, dispatch));
            layers += 1;
        }

        for wrapper in wrappers {
            transport = wrapper(transport);
            layers += 1;
        }

        Self {
            outermost: transport,
            layers,
        }
    }

    /// Number of decorators above the base transport.
    pub fn layers(&self) -> usize {
        self.layers
    }
}

impl Transport for TransportChain {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        self.outermost.send(request)
    }
}

impl fmt::Debug for TransportChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportChain")
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}
