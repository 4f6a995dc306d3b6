//! Synthetic render target
//!
//! Stands in for the engine camera when no renderer is attached: draws a
//! color gradient and a depth ramp into an offscreen target, in the
//! renderer's native row order, on its own render thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{
    encode_mono16_into, encode_rgb8, ContractError, PixelFormat, RenderTarget, Rgb8, RowOrigin,
};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::SharedRenderTarget;

/// Nearest depth in the scene (millimetres)
const DEPTH_NEAR_MM: u32 = 500;
/// Depth span from the top image row to the bottom one (millimetres)
const DEPTH_SPAN_MM: u32 = 4000;

/// In-memory offscreen target
#[derive(Debug, Clone)]
pub struct SyntheticRenderTarget {
    width: u32,
    height: u32,
    origin: RowOrigin,
    color: Vec<Rgb8>,
    depth: Vec<u16>,
    frame_index: u64,
    rendered: bool,
}

impl SyntheticRenderTarget {
    /// Allocate a target; it is not ready until the first `render`
    pub fn new(width: u32, height: u32, origin: RowOrigin) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            origin,
            color: vec![Rgb8::default(); pixels],
            depth: vec![0; pixels],
            frame_index: 0,
            rendered: false,
        }
    }

    /// A target with frame `frame_index` already rendered
    pub fn rendered_at(width: u32, height: u32, origin: RowOrigin, frame_index: u64) -> Self {
        let mut target = Self::new(width, height, origin);
        target.render(frame_index);
        target
    }

    /// Index of the frame currently presented
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn origin(&self) -> RowOrigin {
        self.origin
    }

    /// Draw frame `frame_index`
    ///
    /// Color: red follows x, green follows the image row (top = 0), blue
    /// carries the frame index. Depth grows from near at the top image row to
    /// far at the bottom one.
    pub fn render(&mut self, frame_index: u64) {
        let (w, h) = (self.width as usize, self.height as usize);
        let blue = (frame_index % 256) as u8;
        let x_den = w.saturating_sub(1).max(1);
        let y_den = h.saturating_sub(1).max(1);

        for image_row in 0..h {
            let storage_row = match self.origin {
                RowOrigin::TopLeft => image_row,
                RowOrigin::BottomLeft => h - 1 - image_row,
            };
            let green = (image_row * 255 / y_den) as u8;
            let depth = DEPTH_NEAR_MM + (image_row * DEPTH_SPAN_MM as usize / y_den) as u32;

            let start = storage_row * w;
            for x in 0..w {
                self.color[start + x] = Rgb8::new((x * 255 / x_den) as u8, green, blue);
                self.depth[start + x] = depth.min(u16::MAX as u32) as u16;
            }
        }

        self.frame_index = frame_index;
        self.rendered = true;
    }

    fn check_dst(&self, format: PixelFormat, dst: &[u8]) -> Result<(), ContractError> {
        if !self.rendered {
            return Err(ContractError::capture_unavailable("nothing rendered yet"));
        }
        let expected = format.frame_len(self.width, self.height);
        if dst.len() != expected {
            return Err(ContractError::buffer_size_mismatch(
                format!("{format} read"),
                expected,
                dst.len(),
            ));
        }
        Ok(())
    }
}

impl RenderTarget for SyntheticRenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_ready(&self) -> bool {
        self.rendered
    }

    fn read_color(&self, dst: &mut [u8]) -> Result<(), ContractError> {
        self.check_dst(PixelFormat::ColorRgb8, dst)?;
        dst.copy_from_slice(encode_rgb8(&self.color));
        Ok(())
    }

    fn read_depth(&self, dst: &mut [u8]) -> Result<(), ContractError> {
        self.check_dst(PixelFormat::DepthMono16, dst)?;
        encode_mono16_into(&self.depth, dst)
    }
}

/// Synthetic renderer configuration
#[derive(Debug, Clone)]
pub struct SyntheticRendererConfig {
    /// Frames rendered per second
    pub render_rate: f64,
    /// Advance the frame index on every render
    pub animate: bool,
}

impl Default for SyntheticRendererConfig {
    fn default() -> Self {
        Self {
            render_rate: 30.0,
            animate: true,
        }
    }
}

/// Background render loop drawing into a shared target
///
/// Runs on its own thread, independent of the publish schedule.
pub struct SyntheticRenderer {
    target: SharedRenderTarget<SyntheticRenderTarget>,
    config: SyntheticRendererConfig,
    interval: Duration,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SyntheticRenderer {
    /// # Errors
    /// `ConfigValidation` unless `render_rate` is finite, positive and gives
    /// a non-zero frame interval.
    pub fn new(
        target: SharedRenderTarget<SyntheticRenderTarget>,
        config: SyntheticRendererConfig,
    ) -> Result<Self, ContractError> {
        let interval = Duration::try_from_secs_f64(1.0 / config.render_rate)
            .ok()
            .filter(|interval| config.render_rate > 0.0 && !interval.is_zero())
            .ok_or_else(|| {
                ContractError::config_validation(
                    "render.render_rate",
                    format!("must be a finite value > 0, got {}", config.render_rate),
                )
            })?;

        Ok(Self {
            target,
            config,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        })
    }

    /// Render the first frame synchronously, then keep rendering in the
    /// background. Idempotent.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let mut target = self.target.write();
            if !target.is_ready() {
                target.render(0);
            }
        }

        let target = self.target.clone();
        let running = Arc::clone(&self.running);
        let animate = self.config.animate;
        let interval = self.interval;

        let handle = thread::spawn(move || {
            let mut frame_index = target.read().frame_index();

            debug!(
                render_rate = 1.0 / interval.as_secs_f64(),
                animate, "synthetic renderer started"
            );

            while running.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if animate {
                    frame_index += 1;
                }
                target.write().render(frame_index);
                trace!(frame_index, "synthetic frame rendered");
            }

            debug!(frame_index, "synthetic renderer stopped");
        });

        *self.worker.lock() = Some(handle);
    }

    /// Stop the render loop and wait for the render thread
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for SyntheticRenderer {
    fn drop(&mut self) {
        self.stop();
    }
}
