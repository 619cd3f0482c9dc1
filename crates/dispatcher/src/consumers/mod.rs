//! Built-in consumers
//!
//! Contains LogConsumer and FileConsumer, plus the config-driven factory.

mod file;
mod log;

use contracts::{Consumer, ConsumerConfig, ConsumerKind};
use tracing::instrument;

use crate::error::DispatcherError;

pub use self::file::{
    read_bincode_records, read_json_records, FileConsumer, FileConsumerConfig, FileSummary,
    FrameRecord, RecordFormat,
};
pub use self::log::LogConsumer;

/// Create a consumer from its configuration
#[instrument(
    name = "dispatcher_create_consumer",
    skip(config),
    fields(consumer = %config.name, kind = ?config.kind)
)]
pub fn create_consumer(config: &ConsumerConfig) -> Result<Box<dyn Consumer>, DispatcherError> {
    match config.kind {
        ConsumerKind::Log => Ok(Box::new(LogConsumer::new(&config.name))),
        ConsumerKind::File => {
            let consumer = FileConsumer::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::consumer_creation(&config.name, e))?;
            Ok(Box::new(consumer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(kind: ConsumerKind, params: &[(&str, &str)]) -> ConsumerConfig {
        ConsumerConfig {
            name: "c".to_string(),
            kind,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_create_log() {
        let consumer = create_consumer(&config(ConsumerKind::Log, &[])).unwrap();
        assert_eq!(consumer.name(), "c");
    }

    #[test]
    fn test_create_file_bad_format() {
        let err = create_consumer(&config(ConsumerKind::File, &[("format", "csv")]))
            .err()
            .unwrap();
        assert!(matches!(err, DispatcherError::ConsumerCreation { .. }));
    }
}
