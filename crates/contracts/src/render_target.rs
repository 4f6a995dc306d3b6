//! RenderTarget trait - offscreen target abstraction
//!
//! The scene renderer owns the target; this crate only describes how the
//! capture side reads it.

use crate::ContractError;

/// Offscreen render target holding the latest color and depth frame
///
/// Reads must not alter the presented contents. Both channels are stored in
/// the renderer's native row order; orientation is corrected downstream.
pub trait RenderTarget: Send + Sync {
    /// Target width in pixels (fixed after initialization)
    fn width(&self) -> u32;

    /// Target height in pixels (fixed after initialization)
    fn height(&self) -> u32;

    /// Whether the target has been initialized and holds a rendered frame
    fn is_ready(&self) -> bool;

    /// Copy the color channel as RGB8 into `dst` (`width * height * 3` bytes)
    fn read_color(&self, dst: &mut [u8]) -> Result<(), ContractError>;

    /// Copy the depth channel as little-endian mono16 into `dst`
    /// (`width * height * 2` bytes)
    fn read_depth(&self, dst: &mut [u8]) -> Result<(), ContractError>;
}
