//! Pipeline statistics.

use std::time::Duration;

use dispatcher::{ConsumerSummary, RunReport};
use ingestion::StopReason;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Frames physically read across all files
    pub frames_read: u64,

    /// Frames accepted by the selection policy
    pub frames_accepted: u64,

    /// Frames rejected by range or stride
    pub frames_skipped: u64,

    /// Trajectory files opened
    pub files_opened: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Whether frames were fanned out to worker threads
    pub fan_out: bool,

    pub stop_reason: StopReason,

    /// Reader failure that ended the run early
    pub read_error: Option<String>,

    pub consumers: Vec<ConsumerSummary>,
}

impl PipelineStats {
    pub fn from_report(report: RunReport) -> Self {
        Self {
            frames_read: report.frames_read,
            frames_accepted: report.frames_accepted,
            frames_skipped: report.source_metrics.frames_skipped,
            files_opened: report.source_metrics.files_opened,
            duration: report.elapsed,
            fan_out: report.fan_out,
            stop_reason: report.stop_reason,
            read_error: report.read_error,
            consumers: report.consumers,
        }
    }

    /// Accepted frames per second of wall time
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_accepted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of read frames that were accepted, in percent
    pub fn acceptance_rate(&self) -> f64 {
        if self.frames_read > 0 {
            (self.frames_accepted as f64 / self.frames_read as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Files opened: {}", self.files_opened);
        println!("   ├─ Frames read: {}", self.frames_read);
        println!(
            "   ├─ Frames accepted: {} ({:.2}%)",
            self.frames_accepted,
            self.acceptance_rate()
        );
        println!("   ├─ Frames skipped: {}", self.frames_skipped);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!(
            "   ├─ Mode: {}",
            if self.fan_out { "fan-out" } else { "single consumer" }
        );
        println!("   └─ Stop reason: {:?}", self.stop_reason);

        if let Some(ref message) = self.read_error {
            println!("\nRead error");
            println!("   └─ {message}");
        }

        if !self.consumers.is_empty() {
            println!("\nConsumers ({})", self.consumers.len());
            let last = self.consumers.len() - 1;
            for (i, consumer) in self.consumers.iter().enumerate() {
                let branch = if i == last { "└─" } else { "├─" };
                let last_frame = consumer
                    .last_meta
                    .map(|meta| meta.absolute_frame.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "   {branch} #{} {}: {} frames, last frame {last_frame}",
                    consumer.ordinal, consumer.name, consumer.frames_consumed
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
    fn test_rates() {
        let stats = PipelineStats {
            frames_read: 10,
            frames_accepted: 5,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert!((stats.fps() - 2.5).abs() < 1e-9);
        assert!((stats.acceptance_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_rates_empty_run() {
        let stats = PipelineStats::default();
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.acceptance_rate(), 0.0);
    }
}
