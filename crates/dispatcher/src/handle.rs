//! ConsumerHandle - one consumer with its own channel and worker thread

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use contracts::{Consumer, ContractError, FrameMetadata, SharedEnvelope};
use ingestion::Channel;
use tracing::{debug, error, instrument};

use crate::error::DispatcherError;
use crate::metrics::ConsumerMetrics;

/// Final state of one consumer after its run
#[derive(Debug, Clone)]
pub struct ConsumerSummary {
    pub ordinal: usize,
    pub name: String,
    pub frames_consumed: u64,
    /// Metadata passed to `post_process`
    pub last_meta: Option<FrameMetadata>,
}

/// Drive the full consumer lifecycle over one channel
///
/// Runs `pre_process`, then `consume_frame` for every envelope until the
/// channel is stopped and drained, then `post_process` with the last
/// delivered metadata. The first hook failure ends the lifecycle.
pub(crate) fn drive_consumer(
    consumer: &mut dyn Consumer,
    channel: &Channel<SharedEnvelope>,
    metrics: &ConsumerMetrics,
) -> Result<Option<FrameMetadata>, ContractError> {
    let name = consumer.name().to_string();
    consumer.pre_process()?;

    let mut last = None;
    while let Some(envelope) = channel.receive() {
        metrics.set_queue_len(channel.len());
        let started = Instant::now();

        if let Err(e) = consumer.consume_frame(&envelope) {
            metrics.inc_failure_count();
            observability::record_frame_consumed(&name, false);
            error!(
                consumer = %name,
                frame = envelope.meta.absolute_frame,
                error = %e,
                "consume_frame failed"
            );
            return Err(e);
        }

        metrics.inc_consumed_count();
        observability::record_frame_consumed(&name, true);
        observability::record_consume_latency_ms(&name, started.elapsed().as_secs_f64() * 1e3);
        last = Some(envelope.meta);
    }

    consumer.post_process(last.as_ref())?;
    Ok(last)
}

/// Handle to a running consumer worker
pub struct ConsumerHandle {
    ordinal: usize,
    name: String,
    /// Channel feeding the worker
    channel: Channel<SharedEnvelope>,
    metrics: Arc<ConsumerMetrics>,
    worker: JoinHandle<WorkerOutcome>,
}

/// What a worker hands back when it finishes
struct WorkerOutcome {
    consumer: Box<dyn Consumer>,
    result: Result<Option<FrameMetadata>, ContractError>,
}

impl ConsumerHandle {
    /// Spawn the worker thread (named `consumer-<ordinal>`)
    pub fn spawn(
        ordinal: usize,
        mut consumer: Box<dyn Consumer>,
        capacity: usize,
    ) -> std::io::Result<Self> {
        let name = consumer.name().to_string();
        let channel = Channel::bounded(capacity);
        let metrics = Arc::new(ConsumerMetrics::new());

        let worker_channel = channel.clone();
        let worker_metrics = Arc::clone(&metrics);
        let worker = thread::Builder::new()
            .name(format!("consumer-{ordinal}"))
            .spawn(move || {
                let result = consumer_worker(consumer.as_mut(), &worker_channel, &worker_metrics);
                WorkerOutcome { consumer, result }
            })?;

        Ok(Self {
            ordinal,
            name,
            channel,
            metrics,
            worker,
        })
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<ConsumerMetrics> {
        &self.metrics
    }

    /// Forward an envelope, blocking while the consumer's buffer is full
    ///
    /// Returns false if the worker has already stopped.
    pub fn send(&self, envelope: SharedEnvelope) -> bool {
        if self.channel.send(envelope) {
            self.metrics.set_queue_len(self.channel.len());
            observability::record_channel_depth(&self.name, self.channel.len());
            true
        } else {
            self.metrics.inc_undelivered_count();
            false
        }
    }

    /// Whether the worker's channel no longer accepts envelopes
    pub fn is_stopped(&self) -> bool {
        self.channel.is_stopped()
    }

    /// Signal end-of-stream to the worker
    pub fn finish(&self) {
        self.channel.send_stop();
    }

    /// Stop and join the worker
    ///
    /// Returns the consumer (unless its thread panicked) and its outcome.
    #[instrument(name = "consumer_handle_join", skip(self), fields(consumer = %self.name))]
    pub fn join(
        self,
    ) -> (
        Option<Box<dyn Consumer>>,
        Result<ConsumerSummary, DispatcherError>,
    ) {
        self.finish();
        let frames_consumed = self.metrics.consumed_count();

        match self.worker.join() {
            Ok(WorkerOutcome { consumer, result }) => {
                let result = result
                    .map(|last_meta| ConsumerSummary {
                        ordinal: self.ordinal,
                        name: self.name.clone(),
                        frames_consumed,
                        last_meta,
                    })
                    .map_err(|e| DispatcherError::consumer(self.ordinal, &self.name, e));
                debug!(consumer = %self.name, ok = result.is_ok(), "consumer worker joined");
                (Some(consumer), result)
            }
            Err(_) => {
                error!(consumer = %self.name, "consumer worker panicked");
                (
                    None,
                    Err(DispatcherError::WorkerPanicked {
                        name: self.name.clone(),
                    }),
                )
            }
        }
    }
}

/// Worker loop; stops its own channel on exit so the forwarder never blocks on it
#[instrument(
    name = "consumer_worker_loop",
    skip(consumer, channel, metrics),
    fields(consumer = %consumer.name())
)]
fn consumer_worker(
    consumer: &mut dyn Consumer,
    channel: &Channel<SharedEnvelope>,
    metrics: &ConsumerMetrics,
) -> Result<Option<FrameMetadata>, ContractError> {
    let _stop = channel.stop_guard();
    debug!("consumer worker started");
    let result = drive_consumer(consumer, channel, metrics);
    debug!(
        frames = metrics.consumed_count(),
        ok = result.is_ok(),
        "consumer worker stopped"
    );
    result
}
