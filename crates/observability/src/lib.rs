//! # Observability
//!
//! Structured logging and Prometheus metrics for the camera publisher.
//!
//! Logging and the metrics exporter are installed separately: every command
//! logs, only `run` serves metrics.
//!
//! ```ignore
//! use observability::{LogFormat, TracingConfig};
//! use observability::metrics::{self, CycleOutcome};
//!
//! observability::init_tracing(&TracingConfig { format: LogFormat::Compact, ..Default::default() })?;
//! observability::init_metrics_exporter(9000)?;
//!
//! let started = std::time::Instant::now();
//! cycle.run_once();
//! metrics::record_cycle_metrics(CycleOutcome::Published, started.elapsed().as_secs_f64() * 1000.0);
//! ```

pub mod metrics;

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_cycle_metrics, record_message_published, record_publish_failure, record_publish_rate,
    CycleMetricsAggregator, CycleOutcome, MetricsSummary, RunningStats, StatsSummary,
};

/// How log lines are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with thread and source location
    #[default]
    Json,
    Pretty,
    Compact,
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub format: LogFormat,
    /// Filter directive used when RUST_LOG is unset
    pub default_level: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            default_level: "info".to_string(),
        }
    }
}

/// Install the global tracing subscriber
///
/// RUST_LOG wins over `default_level`. Fails if a subscriber is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_level)
            .with_context(|| format!("Invalid log filter '{}'", config.default_level))?,
    };

    let layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(format = ?config.format, "Tracing initialized");
    Ok(())
}

/// Serve Prometheus metrics on `0.0.0.0:port`
pub fn init_metrics_exporter(port: u16) -> Result<SocketAddr> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on {addr}"))?;

    tracing::info!(%addr, "Prometheus metrics endpoint listening");
    Ok(addr)
}
