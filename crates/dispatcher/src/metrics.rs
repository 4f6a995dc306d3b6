//! Per-sink delivery counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::Timestamp;
use parking_lot::Mutex;

/// Delivery counters for one sink
///
/// Updated by the publishing side (`record_queued`, `record_dropped`) and
/// by the sink worker (`record_written`, `record_failed`).
#[derive(Debug, Default)]
pub struct SinkMetrics {
    queue_len: AtomicUsize,
    written: AtomicU64,
    bytes_written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    last_written: Mutex<Option<Timestamp>>,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message accepted into the queue, which now holds `queue_len` messages
    pub fn record_queued(&self, queue_len: usize) {
        self.queue_len.store(queue_len, Ordering::Relaxed);
    }

    /// Message rejected because the queue was full
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Worker took a message off the queue
    pub fn record_dequeued(&self, queue_len: usize) {
        self.queue_len.store(queue_len, Ordering::Relaxed);
    }

    /// Message of `bytes` payload bytes written, stamped `timestamp`
    pub fn record_written(&self, bytes: usize, timestamp: Timestamp) {
        self.written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
        let mut last = self.last_written.lock();
        if last.map_or(true, |prev| timestamp >= prev) {
            *last = Some(timestamp);
        }
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn write_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
            last_written: *self.last_written.lock(),
        }
    }
}

/// Point-in-time copy of `SinkMetrics` (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub bytes_written: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
    /// Newest message timestamp written so far
    pub last_written: Option<Timestamp>,
}

impl MetricsSnapshot {
    /// Messages offered to the sink, whatever their fate
    pub fn offered(&self) -> u64 {
        self.write_count + self.failure_count + self.dropped_count + self.queue_len as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_tracks_bytes_and_newest_timestamp() {
        let metrics = SinkMetrics::new();
        metrics.record_queued(2);
        metrics.record_written(1_221_120, Timestamp { sec: 10, nanosec: 5 });
        metrics.record_written(814_080, Timestamp { sec: 9, nanosec: 0 });
        metrics.record_dequeued(0);
        metrics.record_failed();
        metrics.record_dropped();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.write_count, 2);
        assert_eq!(snapshot.bytes_written, 2_035_200);
        assert_eq!(snapshot.last_written, Some(Timestamp { sec: 10, nanosec: 5 }));
        assert_eq!(snapshot.offered(), 4);
    }
}
