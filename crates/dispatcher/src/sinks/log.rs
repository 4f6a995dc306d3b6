//! LogSink - logs message summary via tracing

use contracts::{ContractError, ImageMessage, MessageSink};
use tracing::{info, instrument};

/// Sink that logs message summaries for debugging
pub struct LogSink {
    name: String,
    received: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: 0,
        }
    }

    fn log_message_summary(&self, message: &ImageMessage) {
        info!(
            sink = %self.name,
            seq = self.received,
            encoding = message.encoding(),
            width = message.width(),
            height = message.height(),
            step = message.step(),
            bytes = message.data().len(),
            timestamp = %message.timestamp(),
            "ImageMessage received"
        );
    }
}

impl MessageSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, message),
        fields(sink = %self.name, encoding = message.encoding())
    )]
    async fn write(&mut self, message: &ImageMessage) -> Result<(), ContractError> {
        self.received += 1;
        self.log_message_summary(message);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, received = self.received, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::depth_message;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");

        assert!(sink.write(&depth_message(1)).await.is_ok());
        assert!(sink.write(&depth_message(2)).await.is_ok());
        assert_eq!(sink.received, 2);
        assert!(sink.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
