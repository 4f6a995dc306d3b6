//! ImageMessage - FrameConverter output
//!
//! The published artifact. Field layout matches the `sensor_msgs/Image`
//! shape consumers already decode: `{width, height, encoding, step, data,
//! timestamp}`.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ContractError, PixelFormat};

/// Logical output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Color,
    Depth,
}

impl Channel {
    /// Both channels, color first
    pub const ALL: [Channel; 2] = [Channel::Color, Channel::Depth];

    /// Pixel format bound to this channel
    pub const fn format(self) -> PixelFormat {
        match self {
            Self::Color => PixelFormat::ColorRgb8,
            Self::Depth => PixelFormat::DepthMono16,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Depth => "depth",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capture instant as seconds since the Unix epoch plus a nanosecond remainder
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    pub sec: i32,
    /// Always in `[0, 1_000_000_000)`
    pub nanosec: u32,
}

impl Timestamp {
    const NANOS_PER_SEC: u32 = 1_000_000_000;

    /// Split a wall-clock instant into whole seconds and nanoseconds
    ///
    /// A leap-second instant (chrono reports `nanosec >= 1e9`) is clamped to
    /// the last nanosecond of the preceding second so ordering is preserved.
    ///
    /// # Errors
    /// `ClockOutOfRange` if the seconds do not fit the wire field.
    pub fn from_datetime(instant: DateTime<Utc>) -> Result<Self, ContractError> {
        let sec = i32::try_from(instant.timestamp()).map_err(|_| {
            ContractError::ClockOutOfRange {
                message: format!("{instant} does not fit a 32-bit seconds field"),
            }
        })?;
        let nanosec = instant
            .timestamp_subsec_nanos()
            .min(Self::NANOS_PER_SEC - 1);
        Ok(Self { sec, nanosec })
    }

    /// Seconds as a float, for logging
    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nanosec as f64 / Self::NANOS_PER_SEC as f64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nanosec)
    }
}

/// Image message
///
/// Immutable once constructed; `data.len() == step * height` always holds
/// for messages built through [`ImageMessage::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMessage {
    width: u32,
    height: u32,
    encoding: String,
    step: u32,
    data: Bytes,
    timestamp: Timestamp,
}

impl ImageMessage {
    /// Build a message for `format`, deriving `encoding` and `step`
    ///
    /// # Errors
    /// `BufferSizeMismatch` if `data` does not hold exactly `step * height` bytes.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Bytes,
        timestamp: Timestamp,
    ) -> Result<Self, ContractError> {
        let step = format.row_stride(width);
        let expected = step * height as usize;
        if data.len() != expected {
            return Err(ContractError::buffer_size_mismatch(
                format!("{format} {width}x{height} message"),
                expected,
                data.len(),
            ));
        }
        let step = u32::try_from(step)
            .map_err(|_| ContractError::buffer_size_mismatch("row stride", u32::MAX as usize, step))?;

        Ok(Self {
            width,
            height,
            encoding: format.encoding().to_string(),
            step,
            data,
            timestamp,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Resolve the encoding tag back to a pixel format
    ///
    /// # Errors
    /// `UnsupportedFormat` if the tag is unknown (e.g. a message decoded from
    /// a foreign producer).
    pub fn pixel_format(&self) -> Result<PixelFormat, ContractError> {
        PixelFormat::from_encoding(&self.encoding)
    }

    /// Bytes of row `index`, top row first
    pub fn row(&self, index: u32) -> Option<&[u8]> {
        if index >= self.height {
            return None;
        }
        let step = self.step as usize;
        let start = index as usize * step;
        self.data.get(start..start + step)
    }
}
