//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! pixel and message data model, the render-target and publisher seams,
//! the sink trait, the error taxonomy and the configuration blueprint.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Time Model
//! - Messages are stamped with wall-clock time (`sec` + `nanosec` since the
//!   Unix epoch), taken at conversion time
//! - `nanosec` is always in `[0, 1e9)`

mod blueprint;
mod error;
mod message;
mod pixel;
mod publisher;
mod render_target;
mod sink;

pub use blueprint::*;
pub use error::*;
pub use message::{Channel, ImageMessage, Timestamp};
pub use pixel::{
    decode_mono16, decode_rgb8, encode_mono16, encode_mono16_into, encode_rgb8, PixelBuffer,
    PixelFormat, Rgb8, RowOrigin,
};
pub use publisher::ChannelPublisher;
pub use render_target::RenderTarget;
pub use sink::*;
