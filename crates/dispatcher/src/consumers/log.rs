//! LogConsumer - logs frame summaries via tracing

use contracts::{Consumer, ContractError, FrameMetadata, MolecularSystem, SharedEnvelope};
use observability::FrameStatsAggregator;
use tracing::{info, instrument};

/// Consumer that logs frame summaries for debugging
pub struct LogConsumer {
    name: String,
    system: MolecularSystem,
    stats: FrameStatsAggregator,
}

impl LogConsumer {
    /// Create a new LogConsumer with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system: MolecularSystem::new(),
            stats: FrameStatsAggregator::new(),
        }
    }

    /// Statistics over the frames seen so far
    pub fn stats(&self) -> &FrameStatsAggregator {
        &self.stats
    }

    fn log_frame_summary(&self, envelope: &SharedEnvelope) {
        let meta = &envelope.meta;
        if meta.starts_frame_window() {
            info!(
                consumer = %self.name,
                frame = meta.absolute_frame,
                window_size = ?meta.window_size_frames,
                "frame window started"
            );
        }
        info!(
            consumer = %self.name,
            frame = meta.absolute_frame,
            valid_frame = meta.valid_frame,
            time = meta.absolute_time,
            atoms = envelope.frame.num_atoms(),
            box_volume = envelope.frame.periodic_box.volume(),
            "frame received"
        );
    }
}

impl Consumer for LogConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn system_mut(&mut self) -> &mut MolecularSystem {
        &mut self.system
    }

    #[instrument(name = "log_consumer_pre_process", skip(self), fields(consumer = %self.name))]
    fn pre_process(&mut self) -> Result<(), ContractError> {
        self.stats.reset();
        info!(
            consumer = %self.name,
            atoms = self.system.num_atoms(),
            sources = ?self.system.sources(),
            "LogConsumer ready"
        );
        Ok(())
    }

    fn consume_frame(&mut self, envelope: &SharedEnvelope) -> Result<(), ContractError> {
        if !self.system.is_empty() && !self.system.set_frame(&envelope.frame) {
            return Err(ContractError::consumer(
                &self.name,
                format!(
                    "frame {} has {} atoms, system has {}",
                    envelope.meta.absolute_frame,
                    envelope.frame.num_atoms(),
                    self.system.num_atoms()
                ),
            ));
        }
        self.stats.update(&envelope.meta);
        self.log_frame_summary(envelope);
        Ok(())
    }

    #[instrument(name = "log_consumer_post_process", skip(self, last), fields(consumer = %self.name))]
    fn post_process(&mut self, last: Option<&FrameMetadata>) -> Result<(), ContractError> {
        match last {
            Some(meta) => info!(
                consumer = %self.name,
                frames = meta.accepted_count(),
                last_frame = meta.last_frame,
                elapsed_time = meta.elapsed_time(),
                "LogConsumer finished"
            ),
            None => info!(consumer = %self.name, "LogConsumer finished, no frames delivered"),
        }
        info!("{}", self.stats.summary());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::envelope;
    use contracts::Atom;
    use nalgebra::Vector3;

    #[test]
    fn test_log_consumer_lifecycle() {
        let mut consumer = LogConsumer::new("test_log");
        consumer.pre_process().unwrap();
        for i in 0..3 {
            consumer.consume_frame(&envelope(i)).unwrap();
        }
        let last = envelope(2).meta;
        consumer.post_process(Some(&last)).unwrap();
        assert_eq!(consumer.stats().total_frames, 3);
    }

    #[test]
    fn test_log_consumer_name() {
        let consumer = LogConsumer::new("my_logger");
        assert_eq!(consumer.name(), "my_logger");
    }

    #[test]
    fn test_post_process_without_frames() {
        let mut consumer = LogConsumer::new("empty");
        consumer.pre_process().unwrap();
        assert!(consumer.post_process(None).is_ok());
    }

    #[test]
    fn test_atom_count_mismatch() {
        let mut consumer = LogConsumer::new("strict");
        consumer.system_mut().push_atom(
            Atom {
                name: "OW".into(),
                resname: "SOL".into(),
                resid: 1,
                mass: 15.999,
            },
            Vector3::zeros(),
        );
        let err = consumer.consume_frame(&envelope(0)).unwrap_err();
        assert!(err.to_string().contains("3 atoms"));
    }
}
