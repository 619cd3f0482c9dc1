//! # Dispatcher
//!
//! Frame distribution module.
//!
//! Responsibilities:
//! - Check run preconditions before any thread starts
//! - Seed every consumer's molecular system from the first one
//! - Drive a single consumer on the calling thread, or fan out to one
//!   worker thread and channel per consumer
//! - Join the reader and every worker before returning

pub mod consumers;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;

#[cfg(test)]
mod testing;

pub use consumers::{create_consumer, FileConsumer, LogConsumer};
pub use contracts::{Consumer, FrameMetadata, SharedEnvelope};
pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherConfig, RunReport};
pub use error::DispatcherError;
pub use handle::{ConsumerHandle, ConsumerSummary};
pub use metrics::{ConsumerMetrics, MetricsSnapshot};
