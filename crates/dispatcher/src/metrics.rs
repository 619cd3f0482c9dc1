//! Consumer metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single consumer
#[derive(Debug, Default)]
pub struct ConsumerMetrics {
    /// Current queue length of the consumer channel
    queue_len: AtomicUsize,
    /// Frames passed to `consume_frame` successfully
    consumed_count: AtomicU64,
    /// Hook failures
    failure_count: AtomicU64,
    /// Envelopes not delivered because the consumer had stopped
    undelivered_count: AtomicU64,
}

impl ConsumerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn consumed_count(&self) -> u64 {
        self.consumed_count.load(Ordering::Relaxed)
    }

    pub fn inc_consumed_count(&self) {
        self.consumed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn undelivered_count(&self) -> u64 {
        self.undelivered_count.load(Ordering::Relaxed)
    }

    pub fn inc_undelivered_count(&self) {
        self.undelivered_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            consumed_count: self.consumed_count(),
            failure_count: self.failure_count(),
            undelivered_count: self.undelivered_count(),
        }
    }
}

/// Snapshot of consumer metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub consumed_count: u64,
    pub failure_count: u64,
    pub undelivered_count: u64,
}
