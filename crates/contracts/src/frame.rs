//! Frame and FrameEnvelope - Frame Source output
//!
//! A `Frame` is produced once by the reader and is immutable afterwards.
//! Fan-out hands the same `Arc<FrameEnvelope>` to every consumer channel.

use std::sync::Arc;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Periodic simulation box
///
/// Box vectors are stored as matrix columns, in nm. An all-zero matrix
/// means the frame carries no periodicity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicBox {
    vectors: Matrix3<f32>,
}

impl PeriodicBox {
    /// Box from column vectors
    pub fn from_matrix(vectors: Matrix3<f32>) -> Self {
        Self { vectors }
    }

    /// Rectangular box with the given edge lengths
    pub fn rectangular(a: f32, b: f32, c: f32) -> Self {
        Self {
            vectors: Matrix3::from_diagonal(&Vector3::new(a, b, c)),
        }
    }

    /// Non-periodic box
    pub fn none() -> Self {
        Self {
            vectors: Matrix3::zeros(),
        }
    }

    /// Box vectors as columns
    pub fn vectors(&self) -> &Matrix3<f32> {
        &self.vectors
    }

    /// Edge lengths of the three box vectors
    pub fn extents(&self) -> Vector3<f32> {
        Vector3::new(
            self.vectors.column(0).norm(),
            self.vectors.column(1).norm(),
            self.vectors.column(2).norm(),
        )
    }

    pub fn is_periodic(&self) -> bool {
        self.vectors.iter().any(|v| *v != 0.0)
    }

    /// True if any off-diagonal element is non-zero
    pub fn is_triclinic(&self) -> bool {
        (0..3).any(|i| (0..3).any(|j| i != j && self.vectors[(i, j)] != 0.0))
    }

    /// Box volume (nm^3)
    pub fn volume(&self) -> f32 {
        self.vectors.determinant().abs()
    }
}

impl Default for PeriodicBox {
    fn default() -> Self {
        Self::none()
    }
}

/// One simulation snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Atom coordinates (nm)
    pub coords: Vec<Vector3<f32>>,

    /// Simulation time (ps), possibly overridden by the reader
    pub time: f64,

    /// Box / periodicity
    pub periodic_box: PeriodicBox,
}

impl Frame {
    /// Create a new frame
    pub fn new(coords: Vec<Vector3<f32>>, time: f64, periodic_box: PeriodicBox) -> Self {
        Self {
            coords,
            time,
            periodic_box,
        }
    }

    /// Number of atoms in this frame
    pub fn num_atoms(&self) -> usize {
        self.coords.len()
    }
}

/// Per-frame metadata computed once by the Frame Source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Absolute frame index (0-based, global across all files)
    pub absolute_frame: u64,

    /// Absolute time (ps), after time override
    pub absolute_time: f64,

    /// Valid-frame ordinal (0-based, accepted frames only)
    pub valid_frame: u64,

    /// Configured window size in frames
    pub window_size_frames: Option<u64>,

    /// Configured window size in time (ps)
    pub window_size_time: Option<f64>,

    /// Absolute index of the first accepted frame of the run
    pub first_frame: u64,

    /// Time of the first accepted frame of the run
    pub first_time: f64,

    /// Absolute index of the most recent accepted frame
    pub last_frame: u64,

    /// Time of the most recent accepted frame
    pub last_time: f64,
}

impl FrameMetadata {
    /// Number of frames accepted so far (including this one)
    pub fn accepted_count(&self) -> u64 {
        self.valid_frame + 1
    }

    /// Simulation time elapsed since the first accepted frame
    pub fn elapsed_time(&self) -> f64 {
        self.last_time - self.first_time
    }

    /// Whether this frame opens a new frame-count window
    pub fn starts_frame_window(&self) -> bool {
        match self.window_size_frames {
            Some(size) if size > 0 => self.valid_frame % size == 0,
            _ => false,
        }
    }
}

/// Frame bundled with its metadata
///
/// Never mutated after publication.
#[derive(Debug)]
pub struct FrameEnvelope {
    pub frame: Frame,
    pub meta: FrameMetadata,
}

/// Reference-counted immutable envelope shared across consumer channels
pub type SharedEnvelope = Arc<FrameEnvelope>;

impl FrameEnvelope {
    /// Wrap a frame and its metadata for shared ownership
    pub fn shared(frame: Frame, meta: FrameMetadata) -> SharedEnvelope {
        Arc::new(Self { frame, meta })
    }
}
