//! Mock trajectory source
//!
//! In-memory trajectories for tests and dry runs without files on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use contracts::{ContractError, Frame, PeriodicBox, TrajectoryOpener, TrajectoryReader};
use nalgebra::Vector3;
use tracing::{debug, trace};

use crate::error::IngestionError;

/// Contents of one mock trajectory file
#[derive(Debug, Clone)]
pub struct MockFileConfig {
    /// Embedded time of each frame; its length is the frame count
    pub times: Vec<f64>,

    /// Atoms per frame
    pub num_atoms: usize,

    /// Fail with a read error after delivering this many frames
    pub fail_after: Option<usize>,

    /// Panic inside `read_frame` after delivering this many frames
    pub panic_after: Option<usize>,
}

impl MockFileConfig {
    /// `frames` frames with embedded times 0, 1, 2, ...
    pub fn frames(frames: usize) -> Self {
        Self::with_times((0..frames).map(|i| i as f64).collect())
    }

    /// One frame per given time
    pub fn with_times(times: Vec<f64>) -> Self {
        Self {
            times,
            num_atoms: 3,
            fail_after: None,
            panic_after: None,
        }
    }

    pub fn atoms(mut self, num_atoms: usize) -> Self {
        self.num_atoms = num_atoms;
        self
    }

    /// Deliver `frames` frames, then fail
    pub fn fail_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Deliver `frames` frames, then panic in the reader
    pub fn panic_after(mut self, frames: usize) -> Self {
        self.panic_after = Some(frames);
        self
    }
}

/// Mock trajectory opener
///
/// Paths are matched exactly against the registered files. Opening an
/// unregistered path fails like a missing file would.
#[derive(Debug, Clone, Default)]
pub struct MockTrajectory {
    files: HashMap<PathBuf, MockFileConfig>,
    opened: Arc<AtomicUsize>,
}

impl MockTrajectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mock file
    pub fn file(mut self, path: impl Into<PathBuf>, config: MockFileConfig) -> Self {
        self.files.insert(path.into(), config);
        self
    }

    /// Number of `open` calls so far
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.files.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl TrajectoryOpener for MockTrajectory {
    fn supports(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn TrajectoryReader>, ContractError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let config = self
            .files
            .get(path)
            .ok_or_else(|| ContractError::trajectory_open(path, "no such mock file"))?;

        debug!(
            path = %path.display(),
            frames = config.times.len(),
            fail_after = ?config.fail_after,
            "opening mock trajectory"
        );

        Ok(Box::new(MockReader {
            path: path.to_path_buf(),
            config: config.clone(),
            cursor: 0,
        }))
    }
}

/// Reader over one mock file
struct MockReader {
    path: PathBuf,
    config: MockFileConfig,
    cursor: usize,
}

impl TrajectoryReader for MockReader {
    fn read_frame(&mut self) -> Result<Option<Frame>, ContractError> {
        if self.config.panic_after.is_some_and(|n| self.cursor >= n) {
            panic!(
                "{}: simulated reader panic after {} frames",
                self.path.display(),
                self.cursor
            );
        }
        if self.config.fail_after.is_some_and(|n| self.cursor >= n) {
            return Err(IngestionError::Simulated {
                path: self.path.clone(),
                frames: self.cursor,
            }
            .into());
        }

        let Some(&time) = self.config.times.get(self.cursor) else {
            return Ok(None);
        };

        let offset = self.cursor as f32;
        let coords = (0..self.config.num_atoms)
            .map(|a| Vector3::new(offset, a as f32, 0.0))
            .collect();
        self.cursor += 1;

        trace!(path = %self.path.display(), cursor = self.cursor, time, "mock frame");
        Ok(Some(Frame::new(
            coords,
            time,
            PeriodicBox::rectangular(10.0, 10.0, 10.0),
        )))
    }
}
