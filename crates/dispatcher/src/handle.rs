//! SinkHandle - one bounded queue and one worker task per sink

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{ImageMessage, MessageSink};

use crate::metrics::SinkMetrics;

/// What happened to a message handed to `SinkHandle::try_send`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queue at capacity; the message is gone
    Dropped,
    /// Worker has exited
    Closed,
}

/// Sending side of a running sink
///
/// A slow or failing sink only ever affects its own queue.
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<ImageMessage>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker for `sink` on the current Tokio runtime
    pub fn spawn<S: MessageSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = SinkWorker {
            sink,
            rx,
            metrics: Arc::clone(&metrics),
        };

        Self {
            name,
            tx,
            metrics,
            worker: tokio::spawn(worker.run()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Enqueue without waiting; callable from blocking threads
    pub fn try_send(&self, message: ImageMessage) -> Delivery {
        match self.tx.try_send(message) {
            Ok(()) => {
                let queued = self.tx.max_capacity() - self.tx.capacity();
                self.metrics.record_queued(queued);
                Delivery::Queued
            }
            Err(TrySendError::Full(dropped)) => {
                self.metrics.record_dropped();
                warn!(sink = %self.name, timestamp = %dropped.timestamp(), "Queue full, message dropped");
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker is gone");
                Delivery::Closed
            }
        }
    }

    /// Close the queue and wait for the worker
    ///
    /// Messages already queued are written, then the sink is flushed and closed.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        let Self { name, tx, worker, .. } = self;
        drop(tx);
        if let Err(e) = worker.await {
            error!(sink = %name, error = ?e, "Sink worker panicked");
        }
    }
}

struct SinkWorker<S> {
    sink: S,
    rx: mpsc::Receiver<ImageMessage>,
    metrics: Arc<SinkMetrics>,
}

impl<S: MessageSink> SinkWorker<S> {
    #[instrument(name = "sink_worker", skip(self), fields(sink = %self.sink.name()))]
    async fn run(mut self) {
        debug!("Sink worker started");

        while let Some(message) = self.rx.recv().await {
            self.metrics.record_dequeued(self.rx.len());
            self.write(&message).await;
        }

        let name = self.sink.name().to_string();
        if let Err(e) = self.sink.flush().await {
            error!(sink = %name, error = %e, "Flush failed on shutdown");
        }
        if let Err(e) = self.sink.close().await {
            error!(sink = %name, error = %e, "Close failed on shutdown");
        }
        debug!("Sink worker stopped");
    }

    /// A failed write is counted and logged; the worker keeps going
    async fn write(&mut self, message: &ImageMessage) {
        match self.sink.write(message).await {
            Ok(()) => self
                .metrics
                .record_written(message.data().len(), message.timestamp()),
            Err(e) => {
                self.metrics.record_failed();
                error!(
                    sink = %self.sink.name(),
                    timestamp = %message.timestamp(),
                    error = %e,
                    "Write failed"
                );
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{ContractError, PixelFormat, Timestamp};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    pub(crate) fn depth_message(sec: i32) -> ImageMessage {
        let data = Bytes::from(vec![0u8; 2 * 2 * 2]);
        ImageMessage::new(
            2,
            2,
            PixelFormat::DepthMono16,
            data,
            Timestamp { sec, nanosec: 0 },
        )
        .unwrap()
    }

    /// Counts writes and closes; optionally slow or always failing
    struct CountingSink {
        name: String,
        write_count: Arc<AtomicU64>,
        closed: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl CountingSink {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                write_count: Arc::default(),
                closed: Arc::default(),
                should_fail: false,
                delay_ms: 0,
            }
        }
    }

    impl MessageSink for CountingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, _message: &ImageMessage) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "disk full"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.closed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_handle_basic() {
        let sink = CountingSink::new("test");
        let (write_count, closed) = (Arc::clone(&sink.write_count), Arc::clone(&sink.closed));

        let handle = SinkHandle::spawn(sink, 10);
        for i in 0..5 {
            assert_eq!(handle.try_send(depth_message(i)), Delivery::Queued);
        }

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 5);
        assert_eq!(closed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.snapshot().bytes_written, 5 * 8);
        assert_eq!(metrics.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_sink_handle_queue_full() {
        let mut sink = CountingSink::new("slow");
        sink.delay_ms = 100;

        let handle = SinkHandle::spawn(sink, 2);
        let outcomes: Vec<_> = (0..10).map(|i| handle.try_send(depth_message(i))).collect();

        assert!(outcomes.contains(&Delivery::Dropped));
        assert!(handle.metrics().dropped_count() > 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let mut sink = CountingSink::new("failing");
        sink.should_fail = true;

        let handle = SinkHandle::spawn(sink, 10);
        for i in 0..3 {
            handle.try_send(depth_message(i));
        }

        sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.metrics().failure_count(), 3);

        // Worker survives failures
        assert_eq!(handle.try_send(depth_message(3)), Delivery::Queued);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_try_send_from_blocking_thread() {
        let sink = CountingSink::new("blocking");
        let write_count = Arc::clone(&sink.write_count);
        let handle = Arc::new(SinkHandle::spawn(sink, 4));

        let sender = Arc::clone(&handle);
        let delivery = tokio::task::spawn_blocking(move || sender.try_send(depth_message(0)))
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Queued);

        let handle = Arc::try_unwrap(handle).ok().unwrap();
        handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 1);
    }
}
