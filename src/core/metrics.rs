//! Router metrics for observability
//!
//! Counters describing what the client did with the events it was given.
//! They never gate routing; they exist so callers and tests can see how many
//! events were dropped, sampled away, or failed at a sink.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the event router
///
/// # Example
///
/// ```
/// use logler::RouterMetrics;
///
/// let metrics = RouterMetrics::new();
/// metrics.record_routed();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.routed_count(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct RouterMetrics {
    /// Events that were serialized and written to the console
    routed: AtomicU64,

    /// Events discarded before any sink saw them (empty, unserializable)
    dropped: AtomicU64,

    /// Successful writes to syslog / aggregator sinks
    remote_writes: AtomicU64,

    /// Remote writes skipped by sampling
    remote_skipped: AtomicU64,

    /// Sink writes that returned an error or panicked
    sink_failures: AtomicU64,

    /// Rows handed to the analytics streamer
    rows_queued: AtomicU64,

    /// Rows the analytics streamer refused
    rows_rejected: AtomicU64,
}

impl RouterMetrics {
    pub const fn new() -> Self {
        Self {
            routed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            remote_writes: AtomicU64::new(0),
            remote_skipped: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            rows_queued: AtomicU64::new(0),
            rows_rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn routed_count(&self) -> u64 {
        self.routed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn remote_writes(&self) -> u64 {
        self.remote_writes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn remote_skipped(&self) -> u64 {
        self.remote_skipped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rows_queued(&self) -> u64 {
        self.rows_queued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rows_rejected(&self) -> u64 {
        self.rows_rejected.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_routed(&self) -> u64 {
        self.routed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_remote_write(&self) -> u64 {
        self.remote_writes.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_remote_skipped(&self) -> u64 {
        self.remote_skipped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_row_queued(&self) -> u64 {
        self.rows_queued.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_row_rejected(&self) -> u64 {
        self.rows_rejected.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of events dropped, as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been logged yet.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.routed_count() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.routed.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.remote_writes.store(0, Ordering::Relaxed);
        self.remote_skipped.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
        self.rows_queued.store(0, Ordering::Relaxed);
        self.rows_rejected.store(0, Ordering::Relaxed);
    }
}

impl Default for RouterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RouterMetrics {
    /// Snapshot of the current counter values
    fn clone(&self) -> Self {
        Self {
            routed: AtomicU64::new(self.routed_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            remote_writes: AtomicU64::new(self.remote_writes()),
            remote_skipped: AtomicU64::new(self.remote_skipped()),
            sink_failures: AtomicU64::new(self.sink_failures()),
            rows_queued: AtomicU64::new(self.rows_queued()),
            rows_rejected: AtomicU64::new(self.rows_rejected()),
        }
    }
}
