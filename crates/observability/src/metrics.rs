//! Pipeline metrics collection
//!
//! Thin wrappers over the `metrics` facade plus an in-memory aggregator
//! for the end-of-run summary.

use contracts::FrameMetadata;
use metrics::{counter, gauge, histogram};

/// Record one frame decoded from a trajectory file
pub fn record_frame_read() {
    counter!("trajflow_frames_read_total").increment(1);
}

/// Record a frame rejected by the selection filter
pub fn record_frame_skipped() {
    counter!("trajflow_frames_skipped_total").increment(1);
}

/// Record an accepted frame and its position in the run
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_frame_accepted;
///
/// record_frame_accepted(&envelope.meta);
/// ```
pub fn record_frame_accepted(meta: &FrameMetadata) {
    counter!("trajflow_frames_accepted_total").increment(1);
    gauge!("trajflow_last_frame").set(meta.absolute_frame as f64);
    gauge!("trajflow_last_time_ps").set(meta.absolute_time);
}

/// Record a failure that terminated the reader
pub fn record_read_error() {
    counter!("trajflow_read_errors_total").increment(1);
}

/// Record one frame handed to a consumer hook
pub fn record_frame_consumed(consumer: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "trajflow_frames_consumed_total",
        "consumer" => consumer.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record time spent inside `consume_frame`
pub fn record_consume_latency_ms(consumer: &str, latency_ms: f64) {
    histogram!(
        "trajflow_consume_latency_ms",
        "consumer" => consumer.to_string()
    )
    .record(latency_ms);
}

/// Record the number of buffered envelopes in a channel
pub fn record_channel_depth(channel: &str, depth: usize) {
    gauge!(
        "trajflow_channel_depth",
        "channel" => channel.to_string()
    )
    .set(depth as f64);
}

/// Frame metadata aggregator
///
/// Accumulates accepted-frame statistics in memory for the run summary.
#[derive(Debug, Clone, Default)]
pub struct FrameStatsAggregator {
    /// Accepted frames seen
    pub total_frames: u64,

    /// First accepted (absolute index, time)
    pub first: Option<(u64, f64)>,

    /// Last accepted (absolute index, time)
    pub last: Option<(u64, f64)>,

    /// Frames that opened a frame-count window
    pub windows_started: u64,

    /// Gap in absolute index between consecutive accepted frames
    pub index_gap_stats: RunningStats,

    /// Time step between consecutive accepted frames (ps)
    pub time_step_stats: RunningStats,
}

impl FrameStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one accepted frame into the statistics
    pub fn update(&mut self, meta: &FrameMetadata) {
        self.total_frames += 1;
        if meta.starts_frame_window() {
            self.windows_started += 1;
        }

        if let Some((last_frame, last_time)) = self.last {
            self.index_gap_stats
                .push(meta.absolute_frame.saturating_sub(last_frame) as f64);
            self.time_step_stats.push(meta.absolute_time - last_time);
        }

        self.first.get_or_insert((meta.first_frame, meta.first_time));
        self.last = Some((meta.absolute_frame, meta.absolute_time));
    }

    /// Build summary report
    pub fn summary(&self) -> FrameSummary {
        FrameSummary {
            total_frames: self.total_frames,
            first: self.first,
            last: self.last,
            windows_started: self.windows_started,
            index_gap: StatsSummary::from(&self.index_gap_stats),
            time_step_ps: StatsSummary::from(&self.time_step_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Accepted-frame summary
#[derive(Debug, Clone, Default)]
pub struct FrameSummary {
    pub total_frames: u64,
    pub first: Option<(u64, f64)>,
    pub last: Option<(u64, f64)>,
    pub windows_started: u64,
    pub index_gap: StatsSummary,
    pub time_step_ps: StatsSummary,
}

impl FrameSummary {
    /// Simulation time covered by the accepted frames
    pub fn time_span(&self) -> f64 {
        match (self.first, self.last) {
            (Some((_, first)), Some((_, last))) => last - first,
            _ => 0.0,
        }
    }
}

impl std::fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Frame Summary ===")?;
        writeln!(f, "Accepted frames: {}", self.total_frames)?;
        match (self.first, self.last) {
            (Some((ff, ft)), Some((lf, lt))) => {
                writeln!(f, "First frame: {ff} (t={ft:.3} ps)")?;
                writeln!(f, "Last frame: {lf} (t={lt:.3} ps)")?;
                writeln!(f, "Time span: {:.3} ps", self.time_span())?;
            }
            _ => writeln!(f, "No frames accepted")?,
        }
        if self.windows_started > 0 {
            writeln!(f, "Frame windows started: {}", self.windows_started)?;
        }
        writeln!(f, "Index gap: {}", self.index_gap)?;
        writeln!(f, "Time step (ps): {}", self.time_step_ps)?;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(valid: u64, abs: u64, time: f64, window: Option<u64>) -> FrameMetadata {
        FrameMetadata {
            absolute_frame: abs,
            absolute_time: time,
            valid_frame: valid,
            window_size_frames: window,
            window_size_time: None,
            first_frame: 2,
            first_time: 4.0,
            last_frame: abs,
            last_time: time,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut agg = FrameStatsAggregator::new();
        agg.update(&meta(0, 2, 4.0, Some(2)));
        agg.update(&meta(1, 4, 8.0, Some(2)));
        agg.update(&meta(2, 6, 12.0, Some(2)));

        let summary = agg.summary();
        assert_eq!(summary.total_frames, 3);
        assert_eq!(summary.first, Some((2, 4.0)));
        assert_eq!(summary.last, Some((6, 12.0)));
        assert_eq!(summary.windows_started, 2);
        assert_eq!(summary.index_gap.count, 2);
        assert!((summary.index_gap.mean - 2.0).abs() < 1e-10);
        assert!((summary.time_step_ps.mean - 4.0).abs() < 1e-10);
        assert!((summary.time_span() - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut agg = FrameStatsAggregator::new();
        agg.update(&meta(0, 2, 4.0, None));
        let text = agg.summary().to_string();
        assert!(text.contains("Accepted frames: 1"));
        assert!(text.contains("Index gap: N/A"));

        agg.reset();
        assert!(agg.summary().to_string().contains("No frames accepted"));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls are no-ops
        record_frame_read();
        record_frame_skipped();
        record_frame_accepted(&meta(0, 0, 0.0, None));
        record_read_error();
        record_frame_consumed("log", true);
        record_consume_latency_ms("log", 0.5);
        record_channel_depth("source", 3);
    }
}
