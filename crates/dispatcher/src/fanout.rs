//! ChannelFanout - ChannelPublisher over a set of sink handles

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{Channel, ChannelPublisher, ContractError, ImageMessage};
use parking_lot::Mutex;
use tracing::{debug, instrument, trace};

use crate::handle::{Delivery, SinkHandle};
use crate::metrics::{MetricsSnapshot, SinkMetrics};

/// Publisher for one channel
///
/// `publish` clones the message (a refcount bump on its payload) into every
/// bound sink queue and returns immediately. A channel with no sinks accepts
/// and discards messages.
pub struct ChannelFanout {
    channel: Channel,
    topic: String,
    handles: Mutex<Vec<SinkHandle>>,
    /// Outlives the handles so counts stay readable after shutdown
    sink_metrics: Vec<(String, Arc<SinkMetrics>)>,
    published: AtomicU64,
    closed: AtomicBool,
}

impl ChannelFanout {
    pub fn new(channel: Channel, topic: impl Into<String>, handles: Vec<SinkHandle>) -> Self {
        let sink_metrics = handles
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect();
        Self {
            channel,
            topic: topic.into(),
            handles: Mutex::new(handles),
            sink_metrics,
            published: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Messages accepted so far
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn sink_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// Metrics for every bound sink, including after `shutdown`
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.sink_metrics
            .iter()
            .map(|(name, metrics)| (name.clone(), metrics.snapshot()))
            .collect()
    }

    /// Close the channel, drain every sink queue, then flush and close the sinks
    ///
    /// Later `publish` calls fail with `ChannelClosed`.
    #[instrument(name = "channel_fanout_shutdown", skip(self), fields(topic = %self.topic))]
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let handles = std::mem::take(&mut *self.handles.lock());

        for handle in handles {
            handle.shutdown().await;
        }

        debug!(
            topic = %self.topic,
            published = self.published_count(),
            "Channel closed"
        );
    }
}

impl ChannelPublisher for ChannelFanout {
    fn channel(&self) -> Channel {
        self.channel
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn publish(&self, message: ImageMessage) -> Result<(), ContractError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ContractError::ChannelClosed {
                channel: self.topic.clone(),
            });
        }

        let handles = self.handles.lock();
        let mut queued = 0usize;
        let mut live = 0usize;
        for handle in handles.iter() {
            match handle.try_send(message.clone()) {
                Delivery::Queued => {
                    queued += 1;
                    live += 1;
                }
                Delivery::Dropped => live += 1,
                Delivery::Closed => {}
            }
        }

        if !handles.is_empty() && live == 0 {
            return Err(ContractError::ChannelClosed {
                channel: self.topic.clone(),
            });
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        trace!(topic = %self.topic, sinks = handles.len(), queued, "Message fanned out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::depth_message;
    use crate::sinks::LogSink;

    #[tokio::test]
    async fn test_fanout_to_all_sinks() {
        let fanout = ChannelFanout::new(
            Channel::Depth,
            "depth_frame",
            vec![
                SinkHandle::spawn(LogSink::new("a"), 8),
                SinkHandle::spawn(LogSink::new("b"), 8),
            ],
        );

        for i in 0..3 {
            fanout.publish(depth_message(i)).unwrap();
        }
        assert_eq!(fanout.published_count(), 3);

        assert_eq!(fanout.metrics().len(), 2);

        // Shutdown drains queues before closing
        fanout.shutdown().await;
        let after = fanout.metrics();
        assert_eq!(after.len(), 2);
        for (_, snapshot) in after {
            assert_eq!(snapshot.write_count, 3);
        }
    }

    #[tokio::test]
    async fn test_publish_after_shutdown_is_closed() {
        let fanout = ChannelFanout::new(
            Channel::Depth,
            "depth_frame",
            vec![SinkHandle::spawn(LogSink::new("a"), 8)],
        );
        fanout.shutdown().await;

        let err = fanout.publish(depth_message(0)).unwrap_err();
        assert!(matches!(err, ContractError::ChannelClosed { .. }));
        assert_eq!(fanout.sink_count(), 0);
    }

    #[tokio::test]
    async fn test_channel_without_sinks_accepts() {
        let fanout = ChannelFanout::new(Channel::Color, "color_frame", Vec::new());
        assert!(fanout.publish(depth_message(0)).is_ok());
        assert_eq!(fanout.topic(), "color_frame");
        assert_eq!(fanout.channel(), Channel::Color);
    }
}
