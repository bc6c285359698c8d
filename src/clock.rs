//! Time sources for the rate limiter.
//!
//! [`SystemClock`] is used in production. [`MockClock`] lets tests control
//! time explicitly: its `sleep` advances the clock instead of waiting, so
//! rate-limited code paths run instantly and deterministically.

use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A source of the current time and a way to wait.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Completes once `duration` has elapsed on this clock.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Real-time clock backed by the tokio timer.
///
/// Both `now` and `sleep` read tokio's clock, so they stay consistent when a
/// runtime's time is paused and auto-advanced.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Clock controlled by the test.
///
/// All clones share the same underlying time value, so advancing time in one
/// clone affects all clones.
///
/// # Examples
///
/// ```
/// use governed_http::clock::{Clock, MockClock};
/// use std::time::{Duration, Instant};
///
/// # async fn example() {
/// let start = Instant::now();
/// let clock = MockClock::new(start);
///
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), start + Duration::from_secs(10));
///
/// // Sleeping returns immediately and moves the clock forward.
/// clock.sleep(Duration::from_millis(500)).await;
/// assert_eq!(clock.elapsed(), Duration::from_millis(10_500));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    current_time: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific instant.
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let mut time = self
            .current_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *time += duration;
    }

    /// Time advanced since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.now().saturating_duration_since(self.start)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self
            .current_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.advance(duration);
        Box::pin(tokio::task::yield_now())
    }
}
