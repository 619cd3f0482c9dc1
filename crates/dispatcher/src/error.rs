//! Dispatcher error types

use contracts::ContractError;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Run started without any registered consumer
    #[error("no consumers registered")]
    NoConsumers,

    /// Run started without any trajectory file
    #[error("no trajectory files resolved")]
    NoTrajectories,

    /// Invalid run configuration (e.g. inverted range)
    #[error("configuration error: {0}")]
    Configuration(#[source] ContractError),

    /// Structure or topology could not be loaded into the first consumer
    #[error("failed to seed molecular system: {0}")]
    SystemLoad(#[source] ContractError),

    /// Consumer creation error
    #[error("failed to create consumer '{name}': {message}")]
    ConsumerCreation { name: String, message: String },

    /// A consumer hook returned an error
    #[error("consumer #{ordinal} '{name}' failed: {source}")]
    Consumer {
        ordinal: usize,
        name: String,
        #[source]
        source: ContractError,
    },

    /// A consumer worker thread panicked
    #[error("worker thread of consumer '{name}' panicked")]
    WorkerPanicked { name: String },

    /// The reader thread panicked
    #[error("frame reader thread panicked")]
    ReaderPanicked,

    /// Thread spawn or other IO failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a consumer creation error
    pub fn consumer_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConsumerCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Wrap a consumer hook failure
    pub fn consumer(ordinal: usize, name: impl Into<String>, source: ContractError) -> Self {
        Self::Consumer {
            ordinal,
            name: name.into(),
            source,
        }
    }

    /// Whether the run was rejected before any thread started
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoConsumers | Self::NoTrajectories | Self::Configuration(_)
        )
    }
}
