//! FileSink - records messages to disk, one PNG per message

use contracts::{decode_mono16, ContractError, ImageMessage, MessageSink, PixelFormat};
use image::{ImageBuffer, Luma, RgbImage};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// Write a JSON sidecar next to every image
    pub write_metadata: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        let write_metadata = match params.get("metadata").map(String::as_str) {
            Some("true") | None => true,
            Some("false") => false,
            Some(other) => return Err(format!("invalid 'metadata' value '{}'", other)),
        };

        Ok(Self {
            base_path,
            write_metadata,
        })
    }
}

/// Message header written as the JSON sidecar
#[derive(Serialize)]
struct MessageMeta<'a> {
    width: u32,
    height: u32,
    encoding: &'a str,
    step: u32,
    sec: i32,
    nanosec: u32,
}

/// Sink that records messages under `<base_path>/<topic>/<sec>_<nanosec>.png`
pub struct FileSink {
    name: String,
    dir: PathBuf,
    config: FileSinkConfig,
    written: u64,
}

impl FileSink {
    /// Create a new FileSink for one topic
    pub fn new(
        name: impl Into<String>,
        topic: &str,
        config: FileSinkConfig,
    ) -> std::io::Result<Self> {
        let dir = config.base_path.join(topic);
        fs::create_dir_all(&dir)?;

        Ok(Self {
            name: name.into(),
            dir,
            config,
            written: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        topic: &str,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Self::new(name, topic, config)
    }

    /// Output directory for this sink
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stem(message: &ImageMessage) -> String {
        let ts = message.timestamp();
        format!("{}_{:09}", ts.sec, ts.nanosec)
    }

    fn write_message_to_disk(&self, message: &ImageMessage) -> Result<(), ContractError> {
        let stem = Self::stem(message);
        self.save_image(&self.dir.join(format!("{stem}.png")), message)?;

        if self.config.write_metadata {
            let ts = message.timestamp();
            let meta = MessageMeta {
                width: message.width(),
                height: message.height(),
                encoding: message.encoding(),
                step: message.step(),
                sec: ts.sec,
                nanosec: ts.nanosec,
            };
            let file = File::create(self.dir.join(format!("{stem}.json")))?;
            serde_json::to_writer_pretty(file, &meta)
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }

        Ok(())
    }

    fn save_image(&self, path: &Path, message: &ImageMessage) -> Result<(), ContractError> {
        let (width, height) = (message.width(), message.height());
        let too_short = || ContractError::sink_write(&self.name, "message data shorter than image");

        let saved = match message.pixel_format()? {
            PixelFormat::ColorRgb8 => RgbImage::from_raw(width, height, message.data().to_vec())
                .ok_or_else(too_short)?
                .save(path),
            PixelFormat::DepthMono16 => {
                let depth = decode_mono16(message.data())?;
                ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, depth)
                    .ok_or_else(too_short)?
                    .save(path)
            }
        };

        saved.map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    fn persist_message(&mut self, message: &ImageMessage) -> Result<(), ContractError> {
        self.write_message_to_disk(message).map_err(|e| {
            error!(
                sink = %self.name,
                timestamp = %message.timestamp(),
                error = %e,
                "Write failed"
            );
            e
        })?;
        self.written += 1;
        Ok(())
    }
}

impl MessageSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, message),
        fields(sink = %self.name, timestamp = %message.timestamp())
    )]
    async fn write(&mut self, message: &ImageMessage) -> Result<(), ContractError> {
        self.persist_message(message)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, written = self.written, dir = %self.dir.display(), "FileSink closed");
        Ok(())
    }
}
