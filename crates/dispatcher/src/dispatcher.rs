//! ChannelDispatcher - builds the per-channel fan-outs from configuration

use std::sync::Arc;

use tracing::{info, instrument};

use contracts::{
    CameraBlueprint, Channel, ChannelPublisher, ChannelsConfig, ContractError, SinkConfig, SinkType,
};

use crate::error::DispatcherError;
use crate::fanout::ChannelFanout;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink, NetworkSink};

/// Open the sink described by `config` and spawn its worker
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(config: &SinkConfig, topic: &str) -> Result<SinkHandle, DispatcherError> {
    let fail = |source: ContractError| {
        DispatcherError::sink_creation(&config.name, config.channel, config.sink_type, source)
    };

    let handle = match config.sink_type {
        SinkType::Log => SinkHandle::spawn(LogSink::new(&config.name), config.queue_capacity),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, topic, &config.params).map_err(|e| {
                fail(ContractError::config_validation(
                    format!("sinks.{}.params", config.name),
                    e.to_string(),
                ))
            })?;
            SinkHandle::spawn(sink, config.queue_capacity)
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(fail)?;
            SinkHandle::spawn(sink, config.queue_capacity)
        }
    };
    Ok(handle)
}

/// Fan-out for one channel with every sink bound to it
async fn build_fanout(
    channel: Channel,
    channels: &ChannelsConfig,
    sinks: &[SinkConfig],
) -> Result<ChannelFanout, DispatcherError> {
    let topic = channels.topic(channel);
    let mut handles = Vec::new();
    for config in sinks.iter().filter(|s| s.channel == channel) {
        handles.push(create_sink_handle(config, topic).await?);
    }

    info!(%channel, topic, sinks = handles.len(), "Channel ready");
    Ok(ChannelFanout::new(channel, topic, handles))
}

/// Owns one `ChannelFanout` per channel
pub struct ChannelDispatcher {
    color: Arc<ChannelFanout>,
    depth: Arc<ChannelFanout>,
}

impl ChannelDispatcher {
    /// Create a dispatcher from prebuilt fan-outs (for testing)
    pub fn with_fanouts(color: ChannelFanout, depth: ChannelFanout) -> Self {
        Self {
            color: Arc::new(color),
            depth: Arc::new(depth),
        }
    }

    /// Build both channels and spawn their sink workers
    #[instrument(
        name = "dispatcher_build",
        skip(channels, sinks),
        fields(sink_count = sinks.len())
    )]
    pub async fn build(
        channels: &ChannelsConfig,
        sinks: &[SinkConfig],
    ) -> Result<Self, DispatcherError> {
        let color = build_fanout(Channel::Color, channels, sinks).await?;
        let depth = build_fanout(Channel::Depth, channels, sinks).await?;
        Ok(Self::with_fanouts(color, depth))
    }

    /// Publisher for `channel`
    pub fn publisher(&self, channel: Channel) -> Arc<dyn ChannelPublisher> {
        self.fanout(channel).clone()
    }

    pub fn fanout(&self, channel: Channel) -> &Arc<ChannelFanout> {
        match channel {
            Channel::Color => &self.color,
            Channel::Depth => &self.depth,
        }
    }

    /// Get metrics for all sinks, color channel first
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        let mut all = self.color.metrics();
        all.extend(self.depth.metrics());
        all
    }

    /// Shut both channels down
    ///
    /// Call only after the scheduler has stopped; queued messages are written
    /// before each sink is flushed and closed.
    #[instrument(name = "dispatcher_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        self.color.shutdown().await;
        self.depth.shutdown().await;
        info!("Dispatcher shutdown complete");
    }
}

/// Convenience function to create a dispatcher from a blueprint
pub async fn create_dispatcher(
    blueprint: &CameraBlueprint,
) -> Result<ChannelDispatcher, DispatcherError> {
    ChannelDispatcher::build(&blueprint.channels, &blueprint.sinks).await
}
