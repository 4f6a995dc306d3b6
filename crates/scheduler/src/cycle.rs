//! CaptureCycle - one capture → convert → publish pass

use std::sync::Arc;
use std::time::Instant;

use capture::{Clock, FrameCapturer, FrameConverter, SharedRenderTarget, SystemClock};
use contracts::{Channel, ChannelPublisher, ContractError, ImageMessage, RenderTarget};
use observability::metrics::{self, CycleMetricsAggregator, CycleOutcome};
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

/// Everything one publish cycle touches
///
/// A failed capture or conversion skips the whole cycle: either both
/// channels publish or neither does.
pub struct CaptureCycle<T, C = SystemClock> {
    target: SharedRenderTarget<T>,
    capturer: FrameCapturer,
    converter: FrameConverter<C>,
    color: Arc<dyn ChannelPublisher>,
    depth: Arc<dyn ChannelPublisher>,
    stats: Arc<Mutex<CycleMetricsAggregator>>,
}

impl<T, C> CaptureCycle<T, C>
where
    T: RenderTarget,
    C: Clock,
{
    /// # Errors
    /// `ConfigValidation` if a publisher is bound to the wrong channel.
    pub fn new(
        target: SharedRenderTarget<T>,
        capturer: FrameCapturer,
        converter: FrameConverter<C>,
        color: Arc<dyn ChannelPublisher>,
        depth: Arc<dyn ChannelPublisher>,
    ) -> Result<Self, ContractError> {
        for (publisher, expected) in [(&color, Channel::Color), (&depth, Channel::Depth)] {
            if publisher.channel() != expected {
                return Err(ContractError::config_validation(
                    "channels",
                    format!(
                        "publisher '{}' is bound to {}, expected {}",
                        publisher.topic(),
                        publisher.channel(),
                        expected
                    ),
                ));
            }
        }

        Ok(Self {
            target,
            capturer,
            converter,
            color,
            depth,
            stats: Arc::new(Mutex::new(CycleMetricsAggregator::new())),
        })
    }

    /// Shared handle to the per-run statistics
    pub fn stats(&self) -> Arc<Mutex<CycleMetricsAggregator>> {
        Arc::clone(&self.stats)
    }

    /// Run one cycle
    ///
    /// Blocks while the renderer holds the target; call from a blocking
    /// context.
    pub fn run_once(&self) -> CycleOutcome {
        let started = Instant::now();

        let outcome = match self.produce() {
            Ok((color, depth)) => {
                self.publish(&*self.color, color);
                self.publish(&*self.depth, depth);
                CycleOutcome::Published
            }
            Err(e) if e.is_defect() => {
                error!(error = %e, "capture/convert contract violated, cycle skipped");
                CycleOutcome::Defect
            }
            Err(e @ ContractError::ClockOutOfRange { .. }) => {
                warn!(error = %e, "cannot timestamp frame, cycle skipped");
                CycleOutcome::ClockFailed
            }
            Err(e) => {
                warn!(error = %e, "capture failed, cycle skipped");
                CycleOutcome::CaptureFailed
            }
        };

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        metrics::record_cycle_metrics(outcome, latency_ms);
        self.stats.lock().record_cycle(outcome, latency_ms);

        trace!(outcome = outcome.as_str(), latency_ms, "cycle complete");
        outcome
    }

    /// Capture both channels from one render state, then convert them
    fn produce(&self) -> Result<(ImageMessage, ImageMessage), ContractError> {
        let frame = {
            let target = self.target.read();
            self.capturer.capture(&*target)?
        };

        let color = self.converter.convert(frame.color)?;
        let depth = self.converter.convert(frame.depth)?;
        Ok((color, depth))
    }

    fn publish(&self, publisher: &dyn ChannelPublisher, message: ImageMessage) {
        let bytes = message.data().len();
        let topic = publisher.topic();

        match publisher.publish(message) {
            Ok(()) => {
                debug!(topic, bytes, "message published");
                metrics::record_message_published(topic, bytes);
                self.stats.lock().record_message(topic, true);
            }
            Err(e) => {
                warn!(topic, error = %e, "publish failed");
                metrics::record_publish_failure(topic);
                self.stats.lock().record_message(topic, false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture::{ManualClock, SyntheticRenderTarget};
    use contracts::{PixelFormat, RowOrigin};

    /// Publisher that keeps every message it receives
    struct RecordingPublisher {
        channel: Channel,
        topic: String,
        messages: Mutex<Vec<ImageMessage>>,
        closed: bool,
    }

    impl RecordingPublisher {
        fn new(channel: Channel) -> Arc<Self> {
            Arc::new(Self {
                channel,
                topic: format!("{}_frame", channel),
                messages: Mutex::new(Vec::new()),
                closed: false,
            })
        }

        fn closed(channel: Channel) -> Arc<Self> {
            Arc::new(Self {
                channel,
                topic: format!("{}_frame", channel),
                messages: Mutex::new(Vec::new()),
                closed: true,
            })
        }

        fn received(&self) -> Vec<ImageMessage> {
            self.messages.lock().clone()
        }
    }

    impl ChannelPublisher for RecordingPublisher {
        fn channel(&self) -> Channel {
            self.channel
        }

        fn topic(&self) -> &str {
            &self.topic
        }

        fn publish(&self, message: ImageMessage) -> Result<(), ContractError> {
            if self.closed {
                return Err(ContractError::ChannelClosed {
                    channel: self.topic.clone(),
                });
            }
            self.messages.lock().push(message);
            Ok(())
        }
    }

    fn cycle_over(
        target: SyntheticRenderTarget,
        width: u32,
        height: u32,
        origin: RowOrigin,
        color: Arc<RecordingPublisher>,
        depth: Arc<RecordingPublisher>,
    ) -> CaptureCycle<SyntheticRenderTarget> {
        CaptureCycle::new(
            SharedRenderTarget::new(target),
            FrameCapturer::new(width, height).unwrap(),
            FrameConverter::new(origin),
            color,
            depth,
        )
        .unwrap()
    }

    #[test]
    fn test_cycle_publishes_both_channels() {
        let (color, depth) = (
            RecordingPublisher::new(Channel::Color),
            RecordingPublisher::new(Channel::Depth),
        );
        let cycle = cycle_over(
            SyntheticRenderTarget::rendered_at(8, 6, RowOrigin::BottomLeft, 0),
            8,
            6,
            RowOrigin::BottomLeft,
            color.clone(),
            depth.clone(),
        );

        assert_eq!(cycle.run_once(), CycleOutcome::Published);

        let color_msgs = color.received();
        let depth_msgs = depth.received();
        assert_eq!(color_msgs.len(), 1);
        assert_eq!(depth_msgs.len(), 1);
        assert_eq!(color_msgs[0].encoding(), "rgb8");
        assert_eq!(color_msgs[0].step(), 24);
        assert_eq!(depth_msgs[0].encoding(), "mono16");
        assert_eq!(depth_msgs[0].step(), 16);

        // Image top row (green 0, nearest depth) comes first after correction
        assert!(color_msgs[0].row(0).unwrap().chunks(3).all(|px| px[1] == 0));
        assert_eq!(&depth_msgs[0].row(0).unwrap()[..2], &500u16.to_le_bytes());

        let stats = cycle.stats();
        let stats = stats.lock();
        assert_eq!(stats.published_cycles, 1);
        assert_eq!(stats.messages_published.get("color_frame"), Some(&1));
        assert_eq!(stats.messages_published.get("depth_frame"), Some(&1));
    }

    #[test]
    fn test_unavailable_target_skips_both_channels() {
        let (color, depth) = (
            RecordingPublisher::new(Channel::Color),
            RecordingPublisher::new(Channel::Depth),
        );
        let cycle = cycle_over(
            SyntheticRenderTarget::new(4, 4, RowOrigin::TopLeft),
            4,
            4,
            RowOrigin::TopLeft,
            color.clone(),
            depth.clone(),
        );

        assert_eq!(cycle.run_once(), CycleOutcome::CaptureFailed);
        assert!(color.received().is_empty());
        assert!(depth.received().is_empty());

        cycle.target.write().render(0);
        assert_eq!(cycle.run_once(), CycleOutcome::Published);
        assert_eq!(color.received().len(), 1);

        let stats = cycle.stats();
        assert_eq!(stats.lock().capture_failures, 1);
        assert_eq!(stats.lock().total_cycles, 2);
    }

    #[test]
    fn test_zero_width_target_skips_cycle() {
        let (color, depth) = (
            RecordingPublisher::new(Channel::Color),
            RecordingPublisher::new(Channel::Depth),
        );
        let cycle = cycle_over(
            SyntheticRenderTarget::rendered_at(0, 4, RowOrigin::TopLeft, 0),
            4,
            4,
            RowOrigin::TopLeft,
            color.clone(),
            depth.clone(),
        );

        assert_eq!(cycle.run_once(), CycleOutcome::CaptureFailed);
        assert_eq!(cycle.run_once(), CycleOutcome::CaptureFailed);
        assert!(color.received().is_empty());
        assert!(depth.received().is_empty());
    }

    #[test]
    fn test_closed_channel_does_not_block_other_channel() {
        let (color, depth) = (
            RecordingPublisher::closed(Channel::Color),
            RecordingPublisher::new(Channel::Depth),
        );
        let cycle = cycle_over(
            SyntheticRenderTarget::rendered_at(2, 2, RowOrigin::TopLeft, 0),
            2,
            2,
            RowOrigin::TopLeft,
            color,
            depth.clone(),
        );

        assert_eq!(cycle.run_once(), CycleOutcome::Published);
        assert_eq!(depth.received().len(), 1);

        let stats = cycle.stats();
        assert_eq!(stats.lock().publish_failures.get("color_frame"), Some(&1));
    }

    #[test]
    fn test_static_target_yields_identical_depth() {
        let depth = RecordingPublisher::new(Channel::Depth);
        let cycle = cycle_over(
            SyntheticRenderTarget::rendered_at(6, 5, RowOrigin::BottomLeft, 3),
            6,
            5,
            RowOrigin::BottomLeft,
            RecordingPublisher::new(Channel::Color),
            depth.clone(),
        );

        cycle.run_once();
        cycle.run_once();

        let msgs = depth.received();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].data(), msgs[1].data());
        assert_eq!(msgs[0].pixel_format().unwrap(), PixelFormat::DepthMono16);
    }

    #[test]
    fn test_timestamps_follow_clock() {
        use chrono::{TimeZone, Utc};

        let clock = Arc::new(ManualClock::new(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        ));
        let color = RecordingPublisher::new(Channel::Color);
        let cycle = CaptureCycle::new(
            SharedRenderTarget::new(SyntheticRenderTarget::rendered_at(
                2,
                2,
                RowOrigin::TopLeft,
                0,
            )),
            FrameCapturer::new(2, 2).unwrap(),
            FrameConverter::with_clock(RowOrigin::TopLeft, clock.clone()),
            color.clone(),
            RecordingPublisher::new(Channel::Depth),
        )
        .unwrap();

        cycle.run_once();
        clock.advance(chrono::Duration::seconds(1));
        cycle.run_once();

        let msgs = color.received();
        assert_eq!(msgs[0].timestamp().sec, 1_700_000_000);
        assert_eq!(msgs[1].timestamp().sec, 1_700_000_001);
    }

    #[test]
    fn test_unrepresentable_clock_counts_as_clock_failure() {
        use chrono::{TimeZone, Utc};

        // 2100-01-01 does not fit the 32-bit seconds field
        let clock = Arc::new(ManualClock::new(
            Utc.timestamp_opt(4_102_444_800, 0).unwrap(),
        ));
        let depth = RecordingPublisher::new(Channel::Depth);
        let cycle = CaptureCycle::new(
            SharedRenderTarget::new(SyntheticRenderTarget::rendered_at(
                2,
                2,
                RowOrigin::TopLeft,
                0,
            )),
            FrameCapturer::new(2, 2).unwrap(),
            FrameConverter::with_clock(RowOrigin::TopLeft, clock.clone()),
            RecordingPublisher::new(Channel::Color),
            depth.clone(),
        )
        .unwrap();

        assert_eq!(cycle.run_once(), CycleOutcome::ClockFailed);
        assert!(depth.received().is_empty());

        clock.set(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        assert_eq!(cycle.run_once(), CycleOutcome::Published);

        let stats = cycle.stats();
        let stats = stats.lock();
        assert_eq!(stats.clock_failures, 1);
        assert_eq!(stats.capture_failures, 0);
        assert_eq!(stats.defects, 0);
    }

    #[test]
    fn test_swapped_publishers_rejected() {
        let result = CaptureCycle::new(
            SharedRenderTarget::new(SyntheticRenderTarget::new(2, 2, RowOrigin::TopLeft)),
            FrameCapturer::new(2, 2).unwrap(),
            FrameConverter::new(RowOrigin::TopLeft),
            RecordingPublisher::new(Channel::Depth),
            RecordingPublisher::new(Channel::Color),
        );
        assert!(matches!(result, Err(ContractError::ConfigValidation { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scheduled_cycles_publish() {
        use crate::PublishScheduler;
        use std::time::Duration;

        let color = RecordingPublisher::new(Channel::Color);
        let cycle = Arc::new(cycle_over(
            SyntheticRenderTarget::rendered_at(4, 4, RowOrigin::BottomLeft, 0),
            4,
            4,
            RowOrigin::BottomLeft,
            color.clone(),
            RecordingPublisher::new(Channel::Depth),
        ));

        let scheduler = PublishScheduler::new(50.0).unwrap();
        scheduler.start_cycle(Arc::clone(&cycle));
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.stop().await;

        let fired = scheduler.fire_count();
        assert!(fired >= 1);
        assert_eq!(color.received().len() as u64, fired);
        assert_eq!(cycle.stats().lock().total_cycles, fired);
    }
}
