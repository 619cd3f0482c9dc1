//! Layered error definitions
//!
//! Categorized by source: config / range / format / read / consumer

use std::path::Path;

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Selection range with an upper bound below its lower bound
    #[error("invalid range: last {kind} {last} is smaller than first {kind} {first}")]
    InvalidRange {
        kind: &'static str,
        first: String,
        last: String,
    },

    // ===== Format Errors =====
    /// No reader or loader is registered for the file extension
    #[error("unsupported format for '{path}': {message}")]
    UnsupportedFormat { path: String, message: String },

    // ===== Read Errors =====
    /// Trajectory file could not be opened
    #[error("cannot open trajectory '{path}': {message}")]
    TrajectoryOpen { path: String, message: String },

    /// Trajectory frame could not be decoded
    #[error("trajectory read error in '{path}': {message}")]
    TrajectoryRead { path: String, message: String },

    /// Structure or topology file could not be loaded
    #[error("cannot load structure '{path}': {message}")]
    StructureLoad { path: String, message: String },

    // ===== Consumer Errors =====
    /// Failure raised from inside a consumer hook
    #[error("consumer '{consumer}' failed: {message}")]
    Consumer { consumer: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create unsupported format error
    pub fn unsupported_format(path: &Path, message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create trajectory open error
    pub fn trajectory_open(path: &Path, message: impl Into<String>) -> Self {
        Self::TrajectoryOpen {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create trajectory read error
    pub fn trajectory_read(path: &Path, message: impl Into<String>) -> Self {
        Self::TrajectoryRead {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create structure load error
    pub fn structure_load(path: &Path, message: impl Into<String>) -> Self {
        Self::StructureLoad {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create consumer error
    pub fn consumer(consumer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Consumer {
            consumer: consumer.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a configuration error (fatal before the run starts)
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
                | Self::InvalidRange { .. }
                | Self::UnsupportedFormat { .. }
        )
    }
}
