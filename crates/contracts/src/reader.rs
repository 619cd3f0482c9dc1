//! Trajectory reader and system loader traits
//!
//! Format parsers live outside the streaming core; the Frame Source only
//! sees these interfaces.

use std::path::Path;

use crate::{ContractError, Frame, MolecularSystem};

/// Sequential reader over one trajectory file
pub trait TrajectoryReader: Send {
    /// Read the next frame
    ///
    /// Returns `Ok(None)` at end of file.
    ///
    /// # Errors
    /// I/O or format failure while decoding the frame.
    fn read_frame(&mut self) -> Result<Option<Frame>, ContractError>;
}

/// Opens trajectory files by path
///
/// Shared with the reader thread, hence `Send + Sync`.
pub trait TrajectoryOpener: Send + Sync {
    /// Whether a reader exists for this path
    fn supports(&self, path: &Path) -> bool;

    /// Open a trajectory file for sequential reading
    ///
    /// # Errors
    /// `UnsupportedFormat` or `TrajectoryOpen`.
    fn open(&self, path: &Path) -> Result<Box<dyn TrajectoryReader>, ContractError>;
}

/// Loads structure/topology files into a `MolecularSystem`
pub trait SystemLoader: Send + Sync {
    /// Load the file into the system, appending to what is already there
    ///
    /// # Errors
    /// `UnsupportedFormat` or `StructureLoad`.
    fn load(&self, path: &Path, system: &mut MolecularSystem) -> Result<(), ContractError>;
}
