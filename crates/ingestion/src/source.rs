//! Frame Source - the single reader
//!
//! Walks the trajectory files in order, assigns global frame indices,
//! applies the time override and selection filter, and publishes accepted
//! frames into a bounded channel. The channel is always stopped when the
//! reader exits, whatever the reason.

use std::any::Any;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use contracts::{
    Frame, FrameEnvelope, FrameMetadata, SelectionRange, SharedEnvelope, TimeOverride,
    TrajectoryOpener,
};
use tracing::{debug, error, info, instrument, trace};

use crate::channel::Channel;
use crate::filter::FrameFilter;
use crate::metrics::SourceMetrics;

/// Name of the reader thread
pub const READER_THREAD_NAME: &str = "frame-reader";

/// Why the reader stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// Every file was read to the end
    #[default]
    Exhausted,
    /// A frame lay past `last_frame` or `last_time`
    EndOfInterval,
    /// The channel was stopped by the receiving side
    ChannelClosed,
    /// A file failed to open or decode
    ReadError,
}

/// Outcome of one reader run
#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    pub frames_read: u64,
    pub frames_accepted: u64,
    /// Metadata of the last published frame
    pub last_meta: Option<FrameMetadata>,
    pub stop_reason: StopReason,
    /// Message of the failure that ended the run, if any
    pub read_error: Option<String>,
}

/// Per-run counters; a fresh one is created by every `run`
#[derive(Debug, Default)]
struct RunContext {
    next_index: u64,
    accepted: u64,
    first: Option<(u64, f64)>,
    report: SourceReport,
}

/// Single-threaded trajectory reader feeding one channel
pub struct FrameSource {
    files: Vec<PathBuf>,
    opener: Arc<dyn TrajectoryOpener>,
    range: SelectionRange,
    filter: FrameFilter,
    time_override: Option<TimeOverride>,
    log_interval: Option<u64>,
    metrics: Arc<SourceMetrics>,
}

impl FrameSource {
    /// Create a reader over `files` in the given order
    pub fn new(
        files: Vec<PathBuf>,
        opener: Arc<dyn TrajectoryOpener>,
        range: SelectionRange,
    ) -> Self {
        Self {
            files,
            opener,
            range,
            filter: FrameFilter::new(range),
            time_override: range.time_override(),
            log_interval: None,
            metrics: Arc::new(SourceMetrics::new()),
        }
    }

    /// Log "Loaded frame N" every `interval` absolute frames
    pub fn with_log_interval(mut self, interval: Option<u64>) -> Self {
        self.log_interval = interval.filter(|&n| n > 0);
        self
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> Arc<SourceMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Run the reader to completion on the current thread
    ///
    /// Read failures are logged and reported, never returned: the stream
    /// simply ends and consumers finish with what they received. A panic
    /// inside the opener or a reader counts as a read failure.
    #[instrument(
        name = "frame_source_run",
        skip(self, channel),
        fields(files = self.files.len(), capacity = channel.capacity())
    )]
    pub fn run(&self, channel: &Channel<SharedEnvelope>) -> SourceReport {
        let _stop = channel.stop_guard();
        let mut ctx = RunContext::default();

        'files: for path in &self.files {
            let opened = panic::catch_unwind(AssertUnwindSafe(|| self.opener.open(path)));
            let mut reader = match opened {
                Ok(Ok(reader)) => reader,
                Ok(Err(e)) => {
                    self.fail(&mut ctx, e.to_string());
                    break 'files;
                }
                Err(payload) => {
                    self.fail(&mut ctx, panic_message(&*payload, "opener"));
                    break 'files;
                }
            };
            self.metrics.record_file_opened();
            info!(path = %path.display(), "==> reading trajectory");

            loop {
                let next = match panic::catch_unwind(AssertUnwindSafe(|| reader.read_frame())) {
                    Ok(next) => next,
                    Err(payload) => {
                        self.fail(&mut ctx, panic_message(&*payload, "reader"));
                        break 'files;
                    }
                };
                match next {
                    Ok(Some(frame)) => {
                        if let ControlFlow::Break(reason) = self.step(&mut ctx, frame, channel) {
                            ctx.report.stop_reason = reason;
                            break 'files;
                        }
                    }
                    Ok(None) => {
                        debug!(path = %path.display(), "reading done");
                        break;
                    }
                    Err(e) => {
                        self.fail(&mut ctx, e.to_string());
                        break 'files;
                    }
                }
            }
        }

        info!(
            frames_read = ctx.report.frames_read,
            frames_accepted = ctx.report.frames_accepted,
            stop_reason = ?ctx.report.stop_reason,
            "frame source finished"
        );
        ctx.report
    }

    /// Run the reader on a dedicated named thread
    pub fn spawn(
        self,
        channel: Channel<SharedEnvelope>,
    ) -> std::io::Result<JoinHandle<SourceReport>> {
        thread::Builder::new()
            .name(READER_THREAD_NAME.to_string())
            .spawn(move || self.run(&channel))
    }

    /// Process one decoded frame
    fn step(
        &self,
        ctx: &mut RunContext,
        mut frame: Frame,
        channel: &Channel<SharedEnvelope>,
    ) -> ControlFlow<StopReason> {
        let index = ctx.next_index;
        ctx.next_index += 1;
        ctx.report.frames_read += 1;
        self.metrics.record_read();

        if let Some(ov) = &self.time_override {
            frame.time = ov.time_of(index);
        }
        let time = frame.time;

        if self.log_interval.is_some_and(|n| index % n == 0) {
            info!(frame = index, time, "Loaded frame {index}");
        }

        if self.filter.is_end_of_interval(index, time) {
            debug!(frame = index, time, "end of selection interval");
            return ControlFlow::Break(StopReason::EndOfInterval);
        }

        if !self.filter.is_frame_valid(index, time) {
            trace!(frame = index, time, "frame skipped");
            self.metrics.record_skipped();
            return ControlFlow::Continue(());
        }

        let valid_frame = ctx.accepted;
        ctx.accepted += 1;
        let (first_frame, first_time) = *ctx.first.get_or_insert((index, time));

        let meta = FrameMetadata {
            absolute_frame: index,
            absolute_time: time,
            valid_frame,
            window_size_frames: self.range.window_size_frames,
            window_size_time: self.range.window_size_time,
            first_frame,
            first_time,
            last_frame: index,
            last_time: time,
        };
        self.metrics.record_accepted(&meta);
        observability::record_channel_depth("source", channel.len());

        if !channel.send(FrameEnvelope::shared(frame, meta)) {
            debug!(frame = index, "channel stopped by receiver");
            return ControlFlow::Break(StopReason::ChannelClosed);
        }

        ctx.report.frames_accepted += 1;
        ctx.report.last_meta = Some(meta);
        ControlFlow::Continue(())
    }

    fn fail(&self, ctx: &mut RunContext, message: String) {
        error!(error = %message, "trajectory read failed, stopping stream");
        self.metrics.record_read_error();
        ctx.report.stop_reason = StopReason::ReadError;
        ctx.report.read_error = Some(message);
    }
}

fn panic_message(payload: &(dyn Any + Send), what: &str) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload");
    format!("trajectory {what} panicked: {detail}")
}
