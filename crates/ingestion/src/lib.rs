//! # Ingestion
//!
//! Trajectory frame ingestion.
//!
//! Responsibilities:
//! - Bounded channel with an explicit end-of-stream signal
//! - Frame selection (range, stride, end of interval)
//! - Single reader thread over an ordered list of trajectory files
//! - File format readers (GRO) and a mock trajectory for tests
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ingestion::{Channel, FormatRegistry, FrameSource};
//!
//! let source = FrameSource::new(files, Arc::new(FormatRegistry::new()), range);
//! let channel = Channel::bounded(10);
//! let reader = source.spawn(channel.clone())?;
//!
//! while let Some(envelope) = channel.receive() {
//!     // Process frame
//! }
//! let report = reader.join();
//! ```

mod channel;
mod error;
mod filter;
mod formats;
mod metrics;
mod mock;
mod source;

// Re-exports
pub use channel::{Channel, StopGuard};
pub use error::{IngestionError, Result};
pub use filter::FrameFilter;
pub use formats::{load_gro_structure, FormatRegistry, GroReader};
pub use metrics::{SourceMetrics, SourceMetricsSnapshot};
pub use mock::{MockFileConfig, MockTrajectory};
pub use source::{FrameSource, SourceReport, StopReason, READER_THREAD_NAME};
