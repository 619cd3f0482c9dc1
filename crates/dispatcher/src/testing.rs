//! Test doubles shared by the unit tests of this crate

use std::sync::{Arc, Mutex};

use contracts::{
    Consumer, ContractError, Frame, FrameEnvelope, FrameMetadata, MolecularSystem, PeriodicBox,
    SharedEnvelope,
};
use nalgebra::Vector3;

/// Envelope whose absolute and valid indices are both `index`
pub(crate) fn envelope(index: u64) -> SharedEnvelope {
    let frame = Frame::new(vec![Vector3::zeros(); 3], index as f64, PeriodicBox::none());
    FrameEnvelope::shared(
        frame,
        FrameMetadata {
            absolute_frame: index,
            absolute_time: index as f64,
            valid_frame: index,
            window_size_frames: None,
            window_size_time: None,
            first_frame: 0,
            first_time: 0.0,
            last_frame: index,
            last_time: index as f64,
        },
    )
}

#[derive(Debug, Default)]
struct Record {
    pre_processed: bool,
    frames: Vec<u64>,
    metas: Vec<FrameMetadata>,
    post_process_arg: Option<Option<u64>>,
    system_atoms: Option<usize>,
}

/// Read side of a `RecordingConsumer`
#[derive(Debug, Clone, Default)]
pub(crate) struct Probe(Arc<Mutex<Record>>);

impl Probe {
    pub(crate) fn frames(&self) -> Vec<u64> {
        self.0.lock().unwrap().frames.clone()
    }

    pub(crate) fn metas(&self) -> Vec<FrameMetadata> {
        self.0.lock().unwrap().metas.clone()
    }

    pub(crate) fn pre_processed(&self) -> bool {
        self.0.lock().unwrap().pre_processed
    }

    /// `None` if `post_process` never ran
    pub(crate) fn post_process_arg(&self) -> Option<Option<u64>> {
        self.0.lock().unwrap().post_process_arg
    }

    /// Atom count of the system seen in `pre_process`
    pub(crate) fn system_atoms(&self) -> Option<usize> {
        self.0.lock().unwrap().system_atoms
    }
}

/// Consumer recording every hook call, with optional failure injection
pub(crate) struct RecordingConsumer {
    name: String,
    system: MolecularSystem,
    record: Probe,
    fail_at: Option<u64>,
    panic_at: Option<u64>,
}

impl RecordingConsumer {
    pub(crate) fn new(name: &str) -> (Self, Probe) {
        let probe = Probe::default();
        let consumer = Self {
            name: name.to_string(),
            system: MolecularSystem::new(),
            record: probe.clone(),
            fail_at: None,
            panic_at: None,
        };
        (consumer, probe)
    }

    /// Fail `consume_frame` on this absolute frame
    pub(crate) fn fail_at(mut self, frame: u64) -> Self {
        self.fail_at = Some(frame);
        self
    }

    /// Panic in `consume_frame` on this absolute frame
    pub(crate) fn panic_at(mut self, frame: u64) -> Self {
        self.panic_at = Some(frame);
        self
    }
}

impl Consumer for RecordingConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn system_mut(&mut self) -> &mut MolecularSystem {
        &mut self.system
    }

    fn pre_process(&mut self) -> Result<(), ContractError> {
        let mut record = self.record.0.lock().unwrap();
        record.pre_processed = true;
        record.system_atoms = Some(self.system.num_atoms());
        Ok(())
    }

    fn consume_frame(&mut self, envelope: &SharedEnvelope) -> Result<(), ContractError> {
        let index = envelope.meta.absolute_frame;
        if self.panic_at == Some(index) {
            panic!("injected panic at frame {index}");
        }
        if self.fail_at == Some(index) {
            return Err(ContractError::consumer(&self.name, format!("injected failure at {index}")));
        }
        let mut record = self.record.0.lock().unwrap();
        record.frames.push(index);
        record.metas.push(envelope.meta);
        Ok(())
    }

    fn post_process(&mut self, last: Option<&FrameMetadata>) -> Result<(), ContractError> {
        self.record.0.lock().unwrap().post_process_arg = Some(last.map(|m| m.absolute_frame));
        Ok(())
    }
}
