//! ChannelPublisher trait - outbound channel abstraction

use crate::{Channel, ContractError, ImageMessage};

/// Publisher bound to one logical channel
///
/// `publish` is a non-blocking hand-off. Delivery, ordering and backpressure
/// belong to the implementation; callers never wait for acknowledgment.
pub trait ChannelPublisher: Send + Sync {
    /// Logical channel this publisher is bound to
    fn channel(&self) -> Channel;

    /// Transport topic name (e.g. `color_frame`)
    fn topic(&self) -> &str;

    /// Hand a message to the transport
    ///
    /// # Errors
    /// `ChannelClosed` if nothing is left behind the channel to receive it.
    fn publish(&self, message: ImageMessage) -> Result<(), ContractError>;
}
