//! Batch progress counters and ordered notification delivery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// One progress notification.
///
/// `total_count` grows while providers report their item counts, so a
/// report can legitimately carry `current_count > total_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressReport {
    /// Descriptors whose transfer attempt has finished (success or failure).
    pub current_count: usize,
    /// Sum of the item counts reported so far.
    pub total_count: usize,
}

/// Thread-safe progress counters with serialized notification.
///
/// Counters are atomics so [`snapshot`](Self::snapshot) never blocks. Every
/// mutation takes the subscriber lock for the "increment + notify" step, so
/// subscribers observe reports in one total order and `current_count` never
/// decreases between two consecutive reports.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    current: AtomicUsize,
    total: AtomicUsize,
    subscribers: Mutex<Vec<UnboundedSender<ProgressReport>>>,
}

impl ProgressTracker {
    /// Creates a tracker at (0, 0) with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber that receives every subsequent report.
    ///
    /// Dropping the receiver unsubscribes; closed receivers are pruned on the
    /// next notification.
    pub fn subscribe(&self) -> UnboundedReceiver<ProgressReport> {
        let (sender, receiver) = unbounded_channel();
        self.lock_subscribers().push(sender);
        receiver
    }

    /// Adds a provider's item count to the running total and notifies.
    pub fn record_total(&self, delta: usize) {
        self.update_and_notify(|| {
            self.total.fetch_add(delta, Ordering::SeqCst);
        });
    }

    /// Counts one finished transfer attempt and notifies.
    pub fn record_completion(&self) {
        self.update_and_notify(|| {
            self.current.fetch_add(1, Ordering::SeqCst);
        });
    }

    /// Returns the current counters without notifying anyone.
    #[must_use]
    pub fn snapshot(&self) -> ProgressReport {
        ProgressReport {
            current_count: self.current.load(Ordering::SeqCst),
            total_count: self.total.load(Ordering::SeqCst),
        }
    }

    /// Resets both counters to zero. Subscribers are kept.
    pub(crate) fn reset(&self) {
        let _guard = self.lock_subscribers();
        self.current.store(0, Ordering::SeqCst);
        self.total.store(0, Ordering::SeqCst);
    }

    fn update_and_notify(&self, update: impl FnOnce()) {
        let mut subscribers = self.lock_subscribers();
        update();
        let report = self.snapshot();
        subscribers.retain(|subscriber| subscriber.send(report).is_ok());
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<UnboundedSender<ProgressReport>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn drain(receiver: &mut UnboundedReceiver<ProgressReport>) -> Vec<ProgressReport> {
        let mut reports = Vec::new();
        while let Ok(report) = receiver.try_recv() {
            reports.push(report);
        }
        reports
    }

    #[test]
    fn test_tracker_starts_at_zero() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.snapshot(), ProgressReport::default());
    }

    #[test]
    fn test_tracker_notifies_each_update_in_order() {
        let tracker = ProgressTracker::new();
        let mut receiver = tracker.subscribe();

        tracker.record_total(3);
        tracker.record_completion();
        tracker.record_total(2);
        tracker.record_completion();

        let reports = drain(&mut receiver);
        let pairs: Vec<(usize, usize)> = reports
            .iter()
            .map(|r| (r.current_count, r.total_count))
            .collect();
        assert_eq!(pairs, vec![(0, 3), (1, 3), (1, 5), (2, 5)]);
    }

    #[test]
    fn test_tracker_allows_current_to_exceed_total() {
        let tracker = ProgressTracker::new();
        tracker.record_completion();
        tracker.record_completion();
        assert_eq!(
            tracker.snapshot(),
            ProgressReport {
                current_count: 2,
                total_count: 0
            }
        );
    }

    #[test]
    fn test_tracker_reset_keeps_subscribers() {
        let tracker = ProgressTracker::new();
        let mut receiver = tracker.subscribe();
        tracker.record_total(4);
        tracker.reset();
        assert_eq!(tracker.snapshot(), ProgressReport::default());

        tracker.record_completion();
        let reports = drain(&mut receiver);
        assert_eq!(reports.last().unwrap().current_count, 1);
        assert_eq!(reports.last().unwrap().total_count, 0);
    }

    #[test]
    fn test_tracker_prunes_dropped_subscribers() {
        let tracker = ProgressTracker::new();
        let receiver = tracker.subscribe();
        drop(receiver);
        tracker.record_completion();
        assert!(tracker.lock_subscribers().is_empty());
    }

    #[test]
    fn test_tracker_concurrent_completions_are_monotonic() {
        let tracker = Arc::new(ProgressTracker::new());
        let mut receiver = tracker.subscribe();
        let mut handles = Vec::new();

        for _ in 0..8 {
            let tracker = Arc::clone(&tracker);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    tracker.record_completion();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let reports = drain(&mut receiver);
        assert_eq!(reports.len(), 800);
        assert!(
            reports
                .windows(2)
                .all(|pair| pair[1].current_count == pair[0].current_count + 1)
        );
        assert_eq!(tracker.snapshot().current_count, 800);
    }
}
