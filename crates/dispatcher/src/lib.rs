//! # Dispatcher
//!
//! Publisher side of the camera.
//!
//! Responsibilities:
//! - Accept `ImageMessage`s per channel (`ChannelFanout` implements `ChannelPublisher`)
//! - Fan out to every sink bound to that channel
//! - Isolate slow sinks so publishing never blocks the capture cycle

pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{ImageMessage, MessageSink};
pub use dispatcher::{create_dispatcher, ChannelDispatcher};
pub use error::DispatcherError;
pub use fanout::ChannelFanout;
pub use handle::{Delivery, SinkHandle};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, LogSink, NetworkSink};
