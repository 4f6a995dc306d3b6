//! FrameConverter - PixelBuffer to ImageMessage
//!
//! Three steps, in order:
//! 1. Reverse row order when the renderer stores rows bottom-up
//! 2. Derive `encoding` and `step` from the pixel format
//! 3. Stamp the wall-clock instant as whole seconds + nanoseconds

use bytes::Bytes;
use contracts::{ContractError, ImageMessage, PixelBuffer, RowOrigin, Timestamp};
use tracing::trace;

use crate::clock::{Clock, SystemClock};

/// Reverse the order of `row_len`-byte rows in place
///
/// Row contents are untouched. Applying it twice restores the input.
/// `bytes.len()` must be a multiple of `row_len`; a trailing partial row is
/// left where it is.
pub fn flip_rows(bytes: &mut [u8], row_len: usize) {
    if row_len == 0 {
        return;
    }
    let rows = bytes.len() / row_len;
    for top in 0..rows / 2 {
        let bottom = rows - 1 - top;
        let (head, tail) = bytes.split_at_mut(bottom * row_len);
        head[top * row_len..(top + 1) * row_len].swap_with_slice(&mut tail[..row_len]);
    }
}

/// Converts captured buffers into wire messages
///
/// The origin convention is fixed at construction, never per frame.
#[derive(Debug, Clone)]
pub struct FrameConverter<C = SystemClock> {
    origin: RowOrigin,
    clock: C,
}

impl FrameConverter<SystemClock> {
    /// Converter stamping with the system wall clock
    pub fn new(origin: RowOrigin) -> Self {
        Self::with_clock(origin, SystemClock)
    }
}

impl<C: Clock> FrameConverter<C> {
    pub fn with_clock(origin: RowOrigin, clock: C) -> Self {
        Self { origin, clock }
    }

    pub fn origin(&self) -> RowOrigin {
        self.origin
    }

    /// Convert one buffer
    ///
    /// # Errors
    /// - `BufferSizeMismatch` if the buffer breaks its size invariant (defect)
    /// - `ClockOutOfRange` if the wall clock does not fit the timestamp field
    pub fn convert(&self, buffer: PixelBuffer) -> Result<ImageMessage, ContractError> {
        let (width, height, format) = (buffer.width(), buffer.height(), buffer.format());
        let stride = buffer.row_stride();
        let mut bytes = buffer.into_bytes();

        let expected = stride * height as usize;
        if bytes.len() != expected {
            return Err(ContractError::buffer_size_mismatch(
                format!("{format} conversion input"),
                expected,
                bytes.len(),
            ));
        }

        if self.origin.needs_flip() {
            flip_rows(&mut bytes, stride);
        }

        let timestamp = Timestamp::from_datetime(self.clock.now())?;

        trace!(
            encoding = format.encoding(),
            width,
            height,
            step = stride,
            %timestamp,
            "buffer converted"
        );

        ImageMessage::new(width, height, format, Bytes::from(bytes), timestamp)
    }
}
