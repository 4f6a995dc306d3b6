//! PixelBuffer - FrameCapturer output
//!
//! One captured frame in a normalized in-memory layout, plus the per-format
//! codecs between typed pixels and raw bytes.

use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Pixel format of a captured buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8-bit red, green, blue
    ColorRgb8,
    /// 16-bit unsigned depth, little-endian
    DepthMono16,
}

impl PixelFormat {
    /// Bytes occupied by one pixel
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::ColorRgb8 => 3,
            Self::DepthMono16 => 2,
        }
    }

    /// Wire encoding tag
    pub const fn encoding(self) -> &'static str {
        match self {
            Self::ColorRgb8 => "rgb8",
            Self::DepthMono16 => "mono16",
        }
    }

    /// Resolve a wire encoding tag
    ///
    /// # Errors
    /// `UnsupportedFormat` for any tag other than `rgb8` / `mono16`.
    pub fn from_encoding(encoding: &str) -> Result<Self, ContractError> {
        match encoding {
            "rgb8" => Ok(Self::ColorRgb8),
            "mono16" => Ok(Self::DepthMono16),
            other => Err(ContractError::unsupported_format(other)),
        }
    }

    /// Bytes per row for the given width
    pub fn row_stride(self, width: u32) -> usize {
        width as usize * self.bytes_per_pixel()
    }

    /// Total byte length for the given geometry
    pub fn frame_len(self, width: u32, height: u32) -> usize {
        self.row_stride(width) * height as usize
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoding())
    }
}

impl FromStr for PixelFormat {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_encoding(s)
    }
}

/// Which image edge row 0 of the renderer's native storage represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrigin {
    /// Row 0 is the top of the image (matches the wire format)
    TopLeft,
    /// Row 0 is the bottom of the image (OpenGL-style textures)
    #[default]
    BottomLeft,
}

impl RowOrigin {
    /// Whether rows must be reversed to reach the top-left wire convention
    pub fn needs_flip(self) -> bool {
        matches!(self, Self::BottomLeft)
    }
}

impl fmt::Display for RowOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopLeft => f.write_str("top_left"),
            Self::BottomLeft => f.write_str("bottom_left"),
        }
    }
}

/// Captured frame
///
/// The byte length always equals `width * height * bytes_per_pixel(format)`;
/// construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    bytes: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer, checking the size invariant
    ///
    /// # Errors
    /// `BufferSizeMismatch` if `bytes` does not match the geometry.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        bytes: Vec<u8>,
    ) -> Result<Self, ContractError> {
        let expected = format.frame_len(width, height);
        if bytes.len() != expected {
            return Err(ContractError::buffer_size_mismatch(
                format!("{format} {width}x{height} pixel buffer"),
                expected,
                bytes.len(),
            ));
        }
        Ok(Self {
            width,
            height,
            format,
            bytes,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bytes per row
    pub fn row_stride(&self) -> usize {
        self.format.row_stride(self.width)
    }

    /// Consume the buffer, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// One RGB8 pixel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// View RGB8 pixels as raw bytes
pub fn encode_rgb8(pixels: &[Rgb8]) -> &[u8] {
    bytemuck::cast_slice(pixels)
}

/// View raw bytes as RGB8 pixels
///
/// # Errors
/// `BufferSizeMismatch` if the length is not a multiple of 3.
pub fn decode_rgb8(bytes: &[u8]) -> Result<&[Rgb8], ContractError> {
    bytemuck::try_cast_slice(bytes).map_err(|_| {
        ContractError::buffer_size_mismatch(
            "rgb8 decode",
            bytes.len() - bytes.len() % 3,
            bytes.len(),
        )
    })
}

/// Encode depth samples as little-endian bytes
pub fn encode_mono16(depth: &[u16]) -> Vec<u8> {
    depth.iter().flat_map(|d| d.to_le_bytes()).collect()
}

/// Encode depth samples into an existing byte slice
///
/// # Errors
/// `BufferSizeMismatch` if `dst` is not exactly twice the sample count.
pub fn encode_mono16_into(depth: &[u16], dst: &mut [u8]) -> Result<(), ContractError> {
    if dst.len() != depth.len() * 2 {
        return Err(ContractError::buffer_size_mismatch(
            "mono16 encode",
            depth.len() * 2,
            dst.len(),
        ));
    }
    for (chunk, sample) in dst.chunks_exact_mut(2).zip(depth) {
        chunk.copy_from_slice(&sample.to_le_bytes());
    }
    Ok(())
}

/// Decode little-endian bytes into depth samples
///
/// # Errors
/// `BufferSizeMismatch` if the length is odd.
pub fn decode_mono16(bytes: &[u8]) -> Result<Vec<u16>, ContractError> {
    if bytes.len() % 2 != 0 {
        return Err(ContractError::buffer_size_mismatch(
            "mono16 decode",
            bytes.len() - 1,
            bytes.len(),
        ));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect())
}
