//! Consumer trait - Dispatcher output interface
//!
//! Three-hook lifecycle driven by the Dispatcher, either on the calling
//! thread (single consumer) or on a dedicated worker thread (fan-out).

use crate::{ContractError, FrameMetadata, MolecularSystem, SharedEnvelope};

/// Frame consumer
///
/// Each worker thread owns exactly one consumer instance.
pub trait Consumer: Send {
    /// Consumer name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Molecular system owned by this consumer
    ///
    /// The first registered consumer's system is loaded from the input
    /// files; the others receive a deep copy of it.
    fn system_mut(&mut self) -> &mut MolecularSystem;

    /// Called once before the first frame
    ///
    /// # Errors
    /// Any failure aborts this consumer.
    fn pre_process(&mut self) -> Result<(), ContractError>;

    /// Called for every delivered frame, in production order
    ///
    /// The envelope is shared with other consumers and must not be mutated.
    ///
    /// # Errors
    /// Any failure aborts this consumer.
    fn consume_frame(&mut self, envelope: &SharedEnvelope) -> Result<(), ContractError>;

    /// Called once after the stream ends
    ///
    /// `last` is the metadata of the last delivered frame, `None` if no
    /// frame was delivered at all.
    ///
    /// # Errors
    /// Any failure is reported to the caller.
    fn post_process(&mut self, last: Option<&FrameMetadata>) -> Result<(), ContractError>;
}
