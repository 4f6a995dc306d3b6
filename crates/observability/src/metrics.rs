//! Publish cycle metrics
//!
//! Prometheus recorders for each capture → convert → publish cycle, plus an
//! in-memory aggregator for end-of-run summaries.

use std::collections::BTreeMap;

use metrics::{counter, gauge, histogram};

/// How a fired cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleOutcome {
    /// Both messages handed to their channels
    Published,
    /// Render target unavailable; cycle skipped
    CaptureFailed,
    /// Wall clock not representable as a message timestamp; cycle skipped
    ClockFailed,
    /// Contract violation between capture and conversion; cycle skipped
    Defect,
}

impl CycleOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::CaptureFailed => "capture_failed",
            Self::ClockFailed => "clock_failed",
            Self::Defect => "defect",
        }
    }
}

/// Record one fired cycle
///
/// # Example
///
/// ```ignore
/// use observability::metrics::{record_cycle_metrics, CycleOutcome};
///
/// record_cycle_metrics(CycleOutcome::Published, started.elapsed().as_secs_f64() * 1000.0);
/// ```
pub fn record_cycle_metrics(outcome: CycleOutcome, latency_ms: f64) {
    counter!(
        "camera_publisher_cycles_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!("camera_publisher_cycle_latency_ms").record(latency_ms);
}

/// Record one message handed to a channel
pub fn record_message_published(topic: &str, bytes: usize) {
    counter!(
        "camera_publisher_messages_published_total",
        "topic" => topic.to_string()
    )
    .increment(1);

    histogram!(
        "camera_publisher_message_bytes",
        "topic" => topic.to_string()
    )
    .record(bytes as f64);
}

/// Record a message the channel refused
pub fn record_publish_failure(topic: &str) {
    counter!(
        "camera_publisher_publish_failures_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// Record the configured schedule (rate in Hz)
pub fn record_publish_rate(rate_hz: f64) {
    gauge!("camera_publisher_publish_rate_hz").set(rate_hz);
}

/// Cycle metrics aggregator
///
/// Aggregates in memory for summaries at shutdown.
#[derive(Debug, Clone, Default)]
pub struct CycleMetricsAggregator {
    /// Cycles fired
    pub total_cycles: u64,

    /// Cycles that published both messages
    pub published_cycles: u64,

    /// Cycles skipped because the render target was unavailable
    pub capture_failures: u64,

    /// Cycles skipped because the clock could not be stamped
    pub clock_failures: u64,

    /// Cycles skipped on a contract violation
    pub defects: u64,

    /// Messages accepted per topic
    pub messages_published: BTreeMap<String, u64>,

    /// Messages refused per topic
    pub publish_failures: BTreeMap<String, u64>,

    /// Cycle latency (ms)
    pub latency_stats: RunningStats,
}

impl CycleMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with a finished cycle
    pub fn record_cycle(&mut self, outcome: CycleOutcome, latency_ms: f64) {
        self.total_cycles += 1;
        match outcome {
            CycleOutcome::Published => self.published_cycles += 1,
            CycleOutcome::CaptureFailed => self.capture_failures += 1,
            CycleOutcome::ClockFailed => self.clock_failures += 1,
            CycleOutcome::Defect => self.defects += 1,
        }
        self.latency_stats.push(latency_ms);
    }

    /// Update with one publish attempt
    pub fn record_message(&mut self, topic: &str, accepted: bool) {
        let counts = if accepted {
            &mut self.messages_published
        } else {
            &mut self.publish_failures
        };
        *counts.entry(topic.to_string()).or_insert(0) += 1;
    }

    /// Generate summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_cycles: self.total_cycles,
            published_cycles: self.published_cycles,
            capture_failures: self.capture_failures,
            clock_failures: self.clock_failures,
            defects: self.defects,
            skip_rate: if self.total_cycles > 0 {
                (self.capture_failures + self.clock_failures + self.defects) as f64 / self.total_cycles as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            messages_published: self.messages_published.clone(),
            publish_failures: self.publish_failures.clone(),
        }
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_cycles: u64,
    pub published_cycles: u64,
    pub capture_failures: u64,
    pub clock_failures: u64,
    pub defects: u64,
    pub skip_rate: f64,
    pub latency_ms: StatsSummary,
    pub messages_published: BTreeMap<String, u64>,
    pub publish_failures: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Publish Metrics Summary ===")?;
        writeln!(f, "Total cycles: {}", self.total_cycles)?;
        writeln!(f, "Published cycles: {}", self.published_cycles)?;
        writeln!(
            f,
            "Skipped cycles: {} capture, {} clock, {} defect ({:.2}%)",
            self.capture_failures, self.clock_failures, self.defects, self.skip_rate
        )?;
        writeln!(f, "Cycle latency (ms): {}", self.latency_ms)?;

        if !self.messages_published.is_empty() {
            writeln!(f, "Messages published:")?;
            for (topic, count) in &self.messages_published {
                writeln!(f, "  {}: {}", topic, count)?;
            }
        }
        if !self.publish_failures.is_empty() {
            writeln!(f, "Publish failures:")?;
            for (topic, count) in &self.publish_failures {
                writeln!(f, "  {}: {}", topic, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
