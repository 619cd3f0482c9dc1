//! RunConfig - Config Loader output
//!
//! Describes a complete run: input files, selection range, channel
//! settings and the ordered list of consumers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::SelectionRange;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Input files
    pub input: InputConfig,

    /// Frame selection policy
    #[serde(default)]
    pub range: SelectionRange,

    /// Channel and logging settings
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Consumers, in registration order
    #[serde(default)]
    pub consumers: Vec<ConsumerConfig>,
}

/// Input files of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Structure file seeding the first consumer's system
    #[serde(default)]
    pub structure: Option<PathBuf>,

    /// Topology file, loaded after the structure
    #[serde(default)]
    pub topology: Option<PathBuf>,

    /// Trajectory files, read strictly in this order
    #[serde(default)]
    pub trajectories: Vec<PathBuf>,
}

impl InputConfig {
    /// Structure then topology, in load order
    pub fn system_files(&self) -> Vec<&Path> {
        self.structure
            .iter()
            .chain(self.topology.iter())
            .map(PathBuf::as_path)
            .collect()
    }
}

/// Channel capacity and progress reporting
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineSettings {
    /// Capacity of every frame channel
    #[validate(range(min = 1, message = "buffer_size must be >= 1"))]
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Log every N absolute frames (0 = off)
    #[serde(default)]
    pub log_interval: u64,

    /// Write the resolved configuration as JSON to this path before running
    #[serde(default)]
    pub dump_input: Option<PathBuf>,
}

fn default_buffer_size() -> usize {
    10
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            log_interval: 0,
            dump_input: None,
        }
    }
}

impl PipelineSettings {
    /// Progress interval, `None` when disabled
    pub fn log_interval(&self) -> Option<u64> {
        (self.log_interval > 0).then_some(self.log_interval)
    }
}

/// Consumer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Consumer name
    pub name: String,

    /// Consumer kind
    pub kind: ConsumerKind,

    /// Kind-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Built-in consumer kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerKind {
    /// Structured log output
    Log,
    /// Per-frame metadata records on disk
    File,
}

/// Molecular file formats recognised by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Gro,
    Pdb,
    Tpr,
    Pttop,
    Top,
    Xtc,
    Trr,
    Dcd,
}

/// Role a file plays in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Structure,
    Topology,
    Trajectory,
}

impl FileFormat {
    /// Infer format from file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "gro" => Some(Self::Gro),
            "pdb" => Some(Self::Pdb),
            "tpr" => Some(Self::Tpr),
            "pttop" => Some(Self::Pttop),
            "top" => Some(Self::Top),
            "xtc" => Some(Self::Xtc),
            "trr" => Some(Self::Trr),
            "dcd" => Some(Self::Dcd),
            _ => None,
        }
    }

    /// Whether files of this format can play the given role
    pub fn can_be(&self, role: FileRole) -> bool {
        match role {
            FileRole::Structure => matches!(self, Self::Gro | Self::Pdb),
            FileRole::Topology => matches!(self, Self::Tpr | Self::Pttop | Self::Top),
            FileRole::Trajectory => {
                matches!(self, Self::Gro | Self::Xtc | Self::Trr | Self::Dcd)
            }
        }
    }
}
