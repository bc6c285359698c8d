//! Token-bucket admission control.
//!
//! A [`RateLimiter`] bounds how frequently new requests may *begin*,
//! independent of how long they take. It is expressed as a cell-rate schedule:
//! every admission pushes the next admissible instant one emission interval
//! (`1s / rate`) into the future, and idle time lets the schedule fall behind
//! `now` by at most `burst - 1` intervals. That is exactly a token bucket of
//! capacity `burst` refilled at `rate` tokens per second, holding one token
//! when fresh.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};

/// Admission gate shared by every call made through one client.
///
/// # Examples
///
/// ```
/// use governed_http::clock::MockClock;
/// use governed_http::rate_limit::RateLimiter;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() {
/// let clock = MockClock::default();
/// let limiter = RateLimiter::new(2, Arc::new(clock.clone()));
///
/// for _ in 0..5 {
///     limiter.acquire().await;
/// }
///
/// // Four waits of half a second each.
/// assert!(clock.elapsed() >= Duration::from_secs(2));
/// # }
/// ```
pub struct RateLimiter {
    interval: Duration,
    max_slack: Duration,
    clock: Arc<dyn Clock>,
    next_admission: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `requests_per_second` requests per second,
    /// with a bucket capacity equal to the rate.
    ///
    /// A rate of zero is treated as one.
    pub fn new(requests_per_second: u32, clock: Arc<dyn Clock>) -> Self {
        Self::with_burst(requests_per_second, requests_per_second, clock)
    }

    /// Creates a limiter with an explicit bucket capacity.
    ///
    /// Zero values for either argument are treated as one.
    pub fn with_burst(requests_per_second: u32, burst: u32, clock: Arc<dyn Clock>) -> Self {
        let interval = Duration::from_secs(1) / requests_per_second.max(1);
        let max_slack = interval * (burst.max(1) - 1);

        Self {
            interval,
            max_slack,
            clock,
            next_admission: Mutex::new(None),
        }
    }

    /// Waits until one more request may be issued without exceeding the rate.
    ///
    /// Never fails. Dropping the returned future abandons the wait without
    /// consuming a token.
    pub async fn acquire(&self) {
        let mut waited = Duration::ZERO;

        loop {
            let wait = match self.try_admit(self.clock.now()) {
                Ok(()) => break,
                Err(wait) => wait,
            };

            self.clock.sleep(wait).await;
            waited += wait;
        }

        tracing::trace!(waited_ms = waited.as_millis(), "Request admitted");
    }

    /// Admits at `now` if the bucket holds a token, otherwise returns how long
    /// to wait before trying again.
    fn try_admit(&self, now: Instant) -> Result<(), Duration> {
        let mut next = self
            .next_admission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let earliest = now.checked_sub(self.max_slack).unwrap_or(now);
        let admit_at = next.map_or(now, |scheduled| scheduled.max(earliest));

        if admit_at > now {
            return Err(admit_at - now);
        }

        *next = Some(admit_at + self.interval);
        Ok(())
    }

    /// The time between two admissions at the steady-state rate.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(1, Arc::new(SystemClock))
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("interval", &self.interval)
            .field("max_slack", &self.max_slack)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
