//! File format dispatch
//!
//! Maps a path's extension to a concrete reader. Formats that are
//! recognized but have no reader in this build fail with
//! `UnsupportedFormat` instead of being silently skipped.

mod gro;

use std::path::Path;

use contracts::{
    ContractError, FileFormat, FileRole, MolecularSystem, SystemLoader, TrajectoryOpener,
    TrajectoryReader,
};
use tracing::debug;

pub use gro::{load_structure as load_gro_structure, GroReader};

#[cfg(test)]
pub(crate) use gro::tests::write_gro;

/// Formats with a trajectory reader
const TRAJECTORY_FORMATS: &[FileFormat] = &[FileFormat::Gro];

/// Formats with a structure loader
const STRUCTURE_FORMATS: &[FileFormat] = &[FileFormat::Gro];

/// Extension-based format registry
///
/// Implements both `TrajectoryOpener` (for the Frame Source) and
/// `SystemLoader` (for seeding consumer #0's system).
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatRegistry;

impl FormatRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Whether `load` has a reader for this file
    pub fn can_load(&self, path: &Path) -> bool {
        FileFormat::from_path(path).is_some_and(|f| STRUCTURE_FORMATS.contains(&f))
    }

    fn resolve(path: &Path, role: FileRole) -> Result<FileFormat, ContractError> {
        let format = FileFormat::from_path(path)
            .ok_or_else(|| ContractError::unsupported_format(path, "unknown file extension"))?;
        if !format.can_be(role) {
            return Err(ContractError::unsupported_format(
                path,
                format!("{format:?} cannot be used as {role:?}"),
            ));
        }
        Ok(format)
    }
}

impl TrajectoryOpener for FormatRegistry {
    fn supports(&self, path: &Path) -> bool {
        FileFormat::from_path(path).is_some_and(|f| TRAJECTORY_FORMATS.contains(&f))
    }

    fn open(&self, path: &Path) -> Result<Box<dyn TrajectoryReader>, ContractError> {
        match Self::resolve(path, FileRole::Trajectory)? {
            FileFormat::Gro => {
                debug!(path = %path.display(), "opening GRO trajectory");
                Ok(Box::new(GroReader::open(path)?))
            }
            other => Err(ContractError::unsupported_format(
                path,
                format!("no trajectory reader for {other:?}"),
            )),
        }
    }
}

impl SystemLoader for FormatRegistry {
    fn load(&self, path: &Path, system: &mut MolecularSystem) -> Result<(), ContractError> {
        let role = match FileFormat::from_path(path) {
            Some(f) if f.can_be(FileRole::Structure) => FileRole::Structure,
            _ => FileRole::Topology,
        };
        match Self::resolve(path, role)? {
            f if STRUCTURE_FORMATS.contains(&f) => load_gro_structure(path, system),
            other => Err(ContractError::unsupported_format(
                path,
                format!("no loader for {other:?}"),
            )),
        }
    }
}
