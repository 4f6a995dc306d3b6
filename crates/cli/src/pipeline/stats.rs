//! Pipeline statistics and metrics.

use std::fmt;
use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::MetricsSummary;

/// Why the publish loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// Ctrl+C or SIGTERM
    #[default]
    Signal,
    /// `--max-cycles` reached
    MaxCycles,
    /// `--timeout` elapsed
    Timeout,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal => write!(f, "signal"),
            Self::MaxCycles => write!(f, "max_cycles"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Statistics from a publisher run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Why the run ended
    pub stop_reason: StopReason,

    /// Cycles fired by the scheduler
    pub fires: u64,

    /// Per-cycle outcomes and per-topic message counts
    pub cycles: MetricsSummary,

    /// Final metrics per sink, color channel first
    pub sinks: Vec<(String, MetricsSnapshot)>,
}

impl PipelineStats {
    /// Published cycles per second of wall time
    pub fn effective_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.cycles.published_cycles as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Publisher Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stop reason: {}", self.stop_reason);
        println!("   ├─ Cycles fired: {}", self.fires);
        println!("   ├─ Cycles published: {}", self.cycles.published_cycles);
        println!("   └─ Effective rate: {:.2} Hz", self.effective_rate());

        println!("\nCycle Metrics");
        println!("   ├─ Capture failures: {}", self.cycles.capture_failures);
        println!("   ├─ Clock failures: {}", self.cycles.clock_failures);
        println!("   ├─ Defects: {}", self.cycles.defects);
        println!("   ├─ Skip rate: {:.2}%", self.cycles.skip_rate);
        println!("   └─ Latency (ms): {}", self.cycles.latency_ms);

        if !self.cycles.messages_published.is_empty() {
            println!("\nMessages Published");
            for (topic, count) in &self.cycles.messages_published {
                let failed = self.cycles.publish_failures.get(topic).copied().unwrap_or(0);
                println!("   ├─ {}: {} ({} failed)", topic, count, failed);
            }
        }

        if !self.sinks.is_empty() {
            println!("\nSinks");
            for (name, metrics) in &self.sinks {
                println!(
                    "   ├─ {}: written={} ({:.1} MiB), failed={}, dropped={}",
                    name,
                    metrics.write_count,
                    metrics.bytes_written as f64 / (1024.0 * 1024.0),
                    metrics.failure_count,
                    metrics.dropped_count
                );
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_rate() {
        let stats = PipelineStats {
            duration: Duration::from_secs(4),
            cycles: MetricsSummary {
                published_cycles: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!((stats.effective_rate() - 0.5).abs() < f64::EPSILON);
        assert_eq!(PipelineStats::default().effective_rate(), 0.0);
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::MaxCycles.to_string(), "max_cycles");
        assert_eq!(StopReason::default().to_string(), "signal");
    }
}
