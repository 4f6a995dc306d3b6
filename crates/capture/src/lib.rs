//! # Capture
//!
//! Render target → PixelBuffer → ImageMessage.
//!
//! Responsibilities:
//! - Read color and depth from one render target state (`FrameCapturer`)
//! - Correct row order, derive encoding/step, stamp time (`FrameConverter`)
//! - Serialize capture against rendering (`SharedRenderTarget`)
//! - Provide a synthetic render target for running without an engine

mod capturer;
mod clock;
mod converter;
mod shared;
mod synthetic;

pub use capturer::{CapturedFrame, FrameCapturer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use converter::{flip_rows, FrameConverter};
pub use shared::SharedRenderTarget;
pub use synthetic::{SyntheticRenderTarget, SyntheticRenderer, SyntheticRendererConfig};
