//! NetworkSink - one UDP datagram per image message

use contracts::{ContractError, ImageMessage, MessageSink};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, instrument, warn};

/// Largest payload a single IPv4 UDP datagram can carry
const UDP_PAYLOAD_LIMIT: usize = 65_507;

/// Wire encoding of the datagram payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    #[default]
    Json,
    Bincode,
}

impl NetworkFormat {
    fn parse(value: Option<&str>) -> Result<Self, String> {
        match value {
            None | Some("json") => Ok(Self::Json),
            Some("bincode") => Ok(Self::Bincode),
            Some(other) => Err(format!("unknown format '{other}', expected json or bincode")),
        }
    }

    fn encode(self, message: &ImageMessage) -> Result<Vec<u8>, String> {
        match self {
            Self::Json => serde_json::to_vec(message).map_err(|e| format!("json: {e}")),
            Self::Bincode => bincode::serialize(message).map_err(|e| format!("bincode: {e}")),
        }
    }
}

/// Where and how a `NetworkSink` streams
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    pub addr: SocketAddr,
    pub format: NetworkFormat,
    /// Encoded messages above this size are rejected
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    /// Read `addr`, `format` and `max_packet_size` from sink params
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr = params
            .get("addr")
            .ok_or("missing 'addr' parameter")?
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid addr: {e}"))?;

        let format = NetworkFormat::parse(params.get("format").map(String::as_str))?;

        let max_packet_size = params
            .get("max_packet_size")
            .map(|s| s.parse::<usize>().map_err(|e| format!("invalid max_packet_size: {e}")))
            .transpose()?
            .unwrap_or(65_000);
        if max_packet_size == 0 || max_packet_size > UDP_PAYLOAD_LIMIT {
            return Err(format!(
                "max_packet_size must be in 1..={UDP_PAYLOAD_LIMIT}, got {max_packet_size}"
            ));
        }

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Streams each message to a fixed peer, best effort
///
/// A message whose encoding exceeds `max_packet_size` fails the write and is
/// never split or truncated. Send errors from the socket are logged only.
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    #[instrument(name = "network_sink_new", skip(name, config), fields(target = %config.addr))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let local: SocketAddr = if config.addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(config.addr).await?;

        debug!(sink = %name, format = ?config.format, "NetworkSink connected");

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    #[instrument(name = "network_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("sinks.{name}.params"), e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: name,
                message: e.to_string(),
            })
    }

    fn datagram(&self, message: &ImageMessage) -> Result<Vec<u8>, ContractError> {
        let payload = self
            .config
            .format
            .encode(message)
            .map_err(|e| ContractError::sink_write(&self.name, e))?;

        if payload.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = payload.len(),
                max = self.config.max_packet_size,
                "Message does not fit in one datagram"
            );
            return Err(ContractError::sink_write(
                &self.name,
                format!(
                    "encoded message is {} bytes, limit is {}",
                    payload.len(),
                    self.config.max_packet_size
                ),
            ));
        }
        Ok(payload)
    }
}

impl MessageSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, message),
        fields(sink = %self.name, timestamp = %message.timestamp())
    )]
    async fn write(&mut self, message: &ImageMessage) -> Result<(), ContractError> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(ContractError::sink_write(&self.name, "socket closed"));
        };
        let payload = self.datagram(message)?;

        if let Err(e) = socket.send(&payload).await {
            warn!(sink = %self.name, error = %e, "UDP send failed");
        } else {
            debug!(sink = %self.name, bytes = payload.len(), "Datagram sent");
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if self.socket.take().is_some() {
            debug!(sink = %self.name, "NetworkSink closed");
        }
        Ok(())
    }
}
