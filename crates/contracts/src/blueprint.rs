//! CameraBlueprint - Config Loader output
//!
//! Describes the complete publisher setup: node, camera resolution and rate,
//! channel topics, synthetic render settings and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Channel, RowOrigin};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete publisher blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Publisher node settings
    #[serde(default)]
    pub node: NodeConfig,

    /// Virtual camera settings
    pub camera: CameraConfig,

    /// Channel topic names
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Synthetic render target settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Output routing
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Publisher node settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name announced to the transport
    #[serde(default = "default_node_name")]
    pub name: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: default_node_name(),
        }
    }
}

fn default_node_name() -> String {
    "synthetic_camera".to_string()
}

/// Virtual camera settings, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Render target width in pixels, must be > 0
    #[serde(default = "default_texture_width")]
    pub texture_width: u32,

    /// Render target height in pixels, must be > 0
    #[serde(default = "default_texture_height")]
    pub texture_height: u32,

    /// Publish cycles per second, must be > 0
    #[serde(default = "default_publish_rate")]
    pub publish_rate: f64,

    /// Native row origin of the renderer
    #[serde(default)]
    pub origin: RowOrigin,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            texture_width: default_texture_width(),
            texture_height: default_texture_height(),
            publish_rate: default_publish_rate(),
            origin: RowOrigin::default(),
        }
    }
}

fn default_texture_width() -> u32 {
    848
}

fn default_texture_height() -> u32 {
    480
}

fn default_publish_rate() -> f64 {
    1.0
}

/// Channel topic names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Topic for rgb8 color frames
    #[serde(default = "default_color_topic")]
    pub color: String,

    /// Topic for mono16 depth frames
    #[serde(default = "default_depth_topic")]
    pub depth: String,
}

impl ChannelsConfig {
    /// Topic bound to `channel`
    pub fn topic(&self, channel: Channel) -> &str {
        match channel {
            Channel::Color => &self.color,
            Channel::Depth => &self.depth,
        }
    }
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            color: default_color_topic(),
            depth: default_depth_topic(),
        }
    }
}

fn default_color_topic() -> String {
    "color_frame".to_string()
}

fn default_depth_topic() -> String {
    "depth_frame".to_string()
}

/// Synthetic render target settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Frames rendered per second, must be > 0
    #[serde(default = "default_render_rate")]
    pub render_rate: f64,

    /// Animate the scene between frames (false keeps the target unchanged)
    #[serde(default = "default_animate")]
    pub animate: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            render_rate: default_render_rate(),
            animate: default_animate(),
        }
    }
}

fn default_render_rate() -> f64 {
    30.0
}

fn default_animate() -> bool {
    true
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Channel the sink receives
    pub channel: Channel,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Sink-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    8
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log summary
    Log,
    /// Record to disk
    File,
    /// UDP stream
    Network,
}

impl CameraBlueprint {
    /// Sinks bound to `channel`
    pub fn sinks_for(&self, channel: Channel) -> impl Iterator<Item = &SinkConfig> {
        self.sinks.iter().filter(move |s| s.channel == channel)
    }
}
