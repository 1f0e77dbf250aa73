//! Bounded, jittered access to hosts that throttle aggressive clients.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Semaphore;
use tracing::trace;

/// Limits how many requests a provider has in flight against its host, and
/// holds each slot for a random pause after the request completes.
///
/// The pause is taken while the slot is still held, so with `max_in_flight`
/// slots the host sees at most `max_in_flight` requests per pause window.
#[derive(Debug)]
pub struct RequestGate {
    permits: Semaphore,
    min_delay: Duration,
    max_delay: Duration,
}

impl RequestGate {
    /// Creates a gate with `max_in_flight` slots and a pause drawn uniformly
    /// from `min_delay..max_delay` after each request.
    #[must_use]
    pub fn new(max_in_flight: usize, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            permits: Semaphore::new(max_in_flight.max(1)),
            min_delay,
            max_delay,
        }
    }

    /// Runs `request` inside a slot, then pauses before releasing it.
    pub async fn run<F, T>(&self, request: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is owned by the gate and never closed.
        let _permit = self.permits.acquire().await.ok();
        let output = request.await;
        let pause = self.jitter();
        trace!(pause_ms = pause.as_millis(), "holding gate slot");
        tokio::time::sleep(pause).await;
        output
    }

    /// Number of slots currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    fn jitter(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..self.max_delay)
    }
}
