//! Dispatcher error types

use contracts::{Channel, ContractError, SinkType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A configured sink could not be opened, so the channel cannot be built
    #[error("cannot open {sink_type:?} sink '{name}' on the {channel} channel: {source}")]
    SinkCreation {
        name: String,
        channel: Channel,
        sink_type: SinkType,
        #[source]
        source: ContractError,
    },
}

impl DispatcherError {
    pub fn sink_creation(
        name: impl Into<String>,
        channel: Channel,
        sink_type: SinkType,
        source: ContractError,
    ) -> Self {
        Self::SinkCreation {
            name: name.into(),
            channel,
            sink_type,
            source,
        }
    }

    /// Name of the sink that failed
    pub fn sink_name(&self) -> &str {
        match self {
            Self::SinkCreation { name, .. } => name,
        }
    }
}
