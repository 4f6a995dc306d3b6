//! Pipeline orchestrator - coordinates all components.
//!
//! Wires the synthetic render target, the capture cycle, the publish
//! scheduler and the channel dispatcher, then runs until a stop condition.

use std::future::{pending, Future};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use capture::{
    FrameCapturer, FrameConverter, SharedRenderTarget, SyntheticRenderTarget, SyntheticRenderer,
    SyntheticRendererConfig,
};
use contracts::{CameraBlueprint, Channel};
use scheduler::{CaptureCycle, PublishScheduler};
use tokio::sync::watch;
use tracing::{info, warn};

use super::{PipelineStats, StopReason};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The camera blueprint configuration
    pub blueprint: CameraBlueprint,

    /// Stop after this many completed cycles (None = unlimited)
    pub max_cycles: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the publisher until `shutdown` resolves or a configured limit is hit
    ///
    /// Teardown order: scheduler (in-flight cycle completes), then the
    /// dispatcher (queued messages are written), then the renderer.
    pub async fn run<S>(self, shutdown: S) -> Result<PipelineStats>
    where
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        let camera = &blueprint.camera;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_exporter(port)?;
        }

        // Render target
        let target = SharedRenderTarget::new(SyntheticRenderTarget::new(
            camera.texture_width,
            camera.texture_height,
            camera.origin,
        ));
        let renderer = SyntheticRenderer::new(
            target.clone(),
            SyntheticRendererConfig {
                render_rate: blueprint.render.render_rate,
                animate: blueprint.render.animate,
            },
        )
        .context("Invalid render rate")?;
        renderer.start();

        info!(
            width = camera.texture_width,
            height = camera.texture_height,
            origin = %camera.origin,
            render_rate = blueprint.render.render_rate,
            "Synthetic renderer started"
        );

        // Dispatcher
        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - published frames will be discarded");
        }
        for channel in Channel::ALL {
            if blueprint.sinks_for(channel).next().is_none() {
                warn!(%channel, "No sinks bound to channel");
            }
        }

        let dispatcher = dispatcher::create_dispatcher(blueprint)
            .await
            .context("Failed to create dispatcher")?;

        // Capture cycle
        let capturer = FrameCapturer::new(camera.texture_width, camera.texture_height)
            .context("Invalid camera resolution")?;
        let cycle = CaptureCycle::new(
            target,
            capturer,
            FrameConverter::new(camera.origin),
            dispatcher.publisher(Channel::Color),
            dispatcher.publisher(Channel::Depth),
        )
        .context("Failed to bind capture cycle")?;
        let cycle_stats = cycle.stats();

        // Scheduler
        let scheduler =
            PublishScheduler::new(camera.publish_rate).context("Invalid publish rate")?;
        let mut completed = scheduler.completed_cycles();
        scheduler.start_cycle(Arc::new(cycle));

        info!(
            node = %blueprint.node.name,
            rate_hz = scheduler.rate(),
            max_cycles = ?self.config.max_cycles,
            timeout_secs = ?self.config.timeout.map(|t| t.as_secs()),
            "Publisher running"
        );

        let stop_reason = self.wait_for_stop(&mut completed, shutdown).await;
        info!(%stop_reason, "Shutting down publisher...");

        scheduler.stop().await;
        dispatcher.shutdown().await;
        renderer.stop();

        let stats = PipelineStats {
            duration: start_time.elapsed(),
            stop_reason,
            fires: scheduler.fire_count(),
            cycles: cycle_stats.lock().summary(),
            sinks: dispatcher.metrics(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate = format!("{:.2}", stats.effective_rate()),
            "Publisher shutdown complete"
        );

        Ok(stats)
    }

    /// Resolve with the first stop condition to fire
    async fn wait_for_stop<S>(&self, completed: &mut watch::Receiver<u64>, shutdown: S) -> StopReason
    where
        S: Future<Output = ()>,
    {
        let max_cycles = self.config.max_cycles;
        let max_reached = async {
            match max_cycles {
                Some(max) => {
                    if completed.wait_for(|n| *n >= max).await.is_err() {
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };

        let timeout = self.config.timeout;
        let timed_out = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            _ = shutdown => StopReason::Signal,
            _ = max_reached => {
                info!(max_cycles = ?max_cycles, "Reached max cycles limit");
                StopReason::MaxCycles
            }
            _ = timed_out => {
                warn!(timeout_secs = ?timeout.map(|t| t.as_secs()), "Publisher timed out");
                StopReason::Timeout
            }
        }
    }
}
