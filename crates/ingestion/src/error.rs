//! Ingestion error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Malformed record in a trajectory or structure file
    #[error("{}:{line}: {message}", path.display())]
    ParseFailed {
        /// File being parsed
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Error message
        message: String,
    },

    /// File ended in the middle of a frame
    #[error("{}: unexpected end of file inside frame", path.display())]
    Truncated {
        /// File being parsed
        path: PathBuf,
    },

    /// Underlying I/O failure
    #[error("{}: {source}", path.display())]
    Io {
        /// File being read
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Injected failure of a mock trajectory
    #[error("{}: simulated read failure after {frames} frames", path.display())]
    Simulated {
        /// Mock file name
        path: PathBuf,
        /// Frames delivered before failing
        frames: usize,
    },
}

impl IngestionError {
    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::ParseFailed {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    fn path(&self) -> &PathBuf {
        match self {
            Self::ParseFailed { path, .. }
            | Self::Truncated { path }
            | Self::Io { path, .. }
            | Self::Simulated { path, .. } => path,
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        ContractError::trajectory_read(err.path(), err.to_string())
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
