//! Reader-side counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Frame Source metrics
///
/// Shared with the caller through `Arc` so progress can be observed while
/// the reader thread runs.
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Frames decoded from trajectory files
    pub frames_read: AtomicU64,

    /// Frames that passed the filter and were published
    pub frames_accepted: AtomicU64,

    /// Frames rejected by the filter
    pub frames_skipped: AtomicU64,

    /// Trajectory files opened
    pub files_opened: AtomicU64,

    /// Open or decode failures
    pub read_errors: AtomicU64,
}

impl SourceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&self) {
        self.frames_read.fetch_add(1, Ordering::Relaxed);
        observability::record_frame_read();
    }

    pub fn record_accepted(&self, meta: &contracts::FrameMetadata) {
        self.frames_accepted.fetch_add(1, Ordering::Relaxed);
        observability::record_frame_accepted(meta);
    }

    pub fn record_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
        observability::record_frame_skipped();
    }

    pub fn record_file_opened(&self) {
        self.files_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
        observability::record_read_error();
    }

    /// Get snapshot
    pub fn snapshot(&self) -> SourceMetricsSnapshot {
        SourceMetricsSnapshot {
            frames_read: self.frames_read.load(Ordering::Relaxed),
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            files_opened: self.files_opened.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceMetricsSnapshot {
    pub frames_read: u64,
    pub frames_accepted: u64,
    pub frames_skipped: u64,
    pub files_opened: u64,
    pub read_errors: u64,
}
