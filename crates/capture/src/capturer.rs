//! FrameCapturer - reads a render target into two PixelBuffers

use contracts::{ContractError, PixelBuffer, PixelFormat, RenderTarget};
use tracing::trace;

/// Color and depth buffers read from the same render target state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub color: PixelBuffer,
    pub depth: PixelBuffer,
}

/// Reads a render target of a fixed, configured resolution
#[derive(Debug, Clone, Copy)]
pub struct FrameCapturer {
    width: u32,
    height: u32,
}

impl FrameCapturer {
    /// Create a capturer for the configured target resolution
    ///
    /// # Errors
    /// `ConfigValidation` if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, ContractError> {
        if width == 0 || height == 0 {
            return Err(ContractError::config_validation(
                "camera.texture_width / camera.texture_height",
                format!("capture resolution must be positive, got {width}x{height}"),
            ));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Read color (rgb8) and depth (mono16) from `target`
    ///
    /// The caller must hold the target stable for the duration of the call
    /// (see `SharedRenderTarget::read`) so both reads see the same frame.
    ///
    /// # Errors
    /// `CaptureUnavailable` if the target is not initialized, has a zero
    /// dimension, or differs from the configured resolution.
    pub fn capture<T>(&self, target: &T) -> Result<CapturedFrame, ContractError>
    where
        T: RenderTarget + ?Sized,
    {
        self.check_target(target)?;

        let color = self.read(PixelFormat::ColorRgb8, |dst| target.read_color(dst))?;
        let depth = self.read(PixelFormat::DepthMono16, |dst| target.read_depth(dst))?;

        trace!(
            width = self.width,
            height = self.height,
            color_bytes = color.bytes().len(),
            depth_bytes = depth.bytes().len(),
            "frame captured"
        );

        Ok(CapturedFrame { color, depth })
    }

    fn check_target<T>(&self, target: &T) -> Result<(), ContractError>
    where
        T: RenderTarget + ?Sized,
    {
        let (width, height) = (target.width(), target.height());
        if width == 0 || height == 0 {
            return Err(ContractError::capture_unavailable(format!(
                "render target has zero dimensions ({width}x{height})"
            )));
        }
        if !target.is_ready() {
            return Err(ContractError::capture_unavailable(
                "render target not initialized",
            ));
        }
        if (width, height) != (self.width, self.height) {
            return Err(ContractError::capture_unavailable(format!(
                "render target is {width}x{height}, expected {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    fn read<F>(&self, format: PixelFormat, read_into: F) -> Result<PixelBuffer, ContractError>
    where
        F: FnOnce(&mut [u8]) -> Result<(), ContractError>,
    {
        let mut bytes = vec![0u8; format.frame_len(self.width, self.height)];
        read_into(&mut bytes)?;
        PixelBuffer::new(self.width, self.height, format, bytes)
    }
}
