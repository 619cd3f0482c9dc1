//! Dispatcher - drives the reader thread and the consumers

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use contracts::{
    Consumer, FrameMetadata, RunConfig, SelectionRange, SharedEnvelope, SystemLoader,
    TrajectoryOpener,
};
use ingestion::{
    Channel, FormatRegistry, FrameSource, SourceMetrics, SourceMetricsSnapshot, SourceReport,
    StopReason,
};
use tracing::{debug, error, info, instrument, warn};

use crate::consumers::create_consumer;
use crate::error::DispatcherError;
use crate::handle::{drive_consumer, ConsumerHandle, ConsumerSummary};
use crate::metrics::ConsumerMetrics;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Trajectory files, read in this order
    pub trajectories: Vec<PathBuf>,
    /// Structure then topology, loaded into consumer #0
    pub system_files: Vec<PathBuf>,
    pub range: SelectionRange,
    /// Capacity of the source channel and of every consumer channel
    pub buffer_size: usize,
    pub log_interval: Option<u64>,
}

impl DispatcherConfig {
    pub fn new(trajectories: Vec<PathBuf>) -> Self {
        Self {
            trajectories,
            system_files: Vec::new(),
            range: SelectionRange::default(),
            buffer_size: 10,
            log_interval: None,
        }
    }

    pub fn from_run_config(config: &RunConfig) -> Self {
        Self {
            trajectories: config.input.trajectories.clone(),
            system_files: config
                .input
                .system_files()
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            range: config.range,
            buffer_size: config.pipeline.buffer_size,
            log_interval: config.pipeline.log_interval(),
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub frames_read: u64,
    pub frames_accepted: u64,
    pub stop_reason: StopReason,
    /// Read failure that ended the stream early, if any
    pub read_error: Option<String>,
    /// Metadata of the last frame published by the reader
    pub last_meta: Option<FrameMetadata>,
    /// Per-consumer outcome, in ordinal order
    pub consumers: Vec<ConsumerSummary>,
    pub fan_out: bool,
    pub source_metrics: SourceMetricsSnapshot,
    pub elapsed: Duration,
}

impl RunReport {
    fn new(source: SourceReport, metrics: &SourceMetrics, consumers: Vec<ConsumerSummary>) -> Self {
        Self {
            frames_read: source.frames_read,
            frames_accepted: source.frames_accepted,
            stop_reason: source.stop_reason,
            read_error: source.read_error,
            last_meta: source.last_meta,
            fan_out: consumers.len() > 1,
            consumers,
            source_metrics: metrics.snapshot(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Builder for creating a Dispatcher from a run configuration
pub struct DispatcherBuilder<'a> {
    config: &'a RunConfig,
    opener: Option<Arc<dyn TrajectoryOpener>>,
}

impl<'a> DispatcherBuilder<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self {
            config,
            opener: None,
        }
    }

    /// Override the trajectory opener (defaults to the file format registry)
    pub fn opener(mut self, opener: Arc<dyn TrajectoryOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Create every configured consumer, in configuration order
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(consumers = self.config.consumers.len())
    )]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut dispatcher = Dispatcher::new(DispatcherConfig::from_run_config(self.config));
        if let Some(opener) = self.opener {
            dispatcher = dispatcher.with_opener(opener);
        }
        for consumer_config in &self.config.consumers {
            dispatcher.add_consumer(create_consumer(consumer_config)?);
        }
        Ok(dispatcher)
    }
}

/// Orchestrates one reader thread and the registered consumers
///
/// One consumer is driven synchronously on the calling thread; two or more
/// each get a worker thread and a private channel fed by this thread.
pub struct Dispatcher {
    config: DispatcherConfig,
    consumers: Vec<Box<dyn Consumer>>,
    opener: Arc<dyn TrajectoryOpener>,
    loader: Arc<dyn SystemLoader>,
}

impl Dispatcher {
    /// Create a dispatcher reading files through the format registry
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            consumers: Vec::new(),
            opener: Arc::new(FormatRegistry::new()),
            loader: Arc::new(FormatRegistry::new()),
        }
    }

    pub fn with_opener(mut self, opener: Arc<dyn TrajectoryOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn SystemLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Register a consumer; returns its ordinal
    ///
    /// Ordinal 0 owns the system that seeds every other consumer.
    pub fn add_consumer(&mut self, consumer: Box<dyn Consumer>) -> usize {
        debug!(consumer = consumer.name(), ordinal = self.consumers.len(), "consumer registered");
        self.consumers.push(consumer);
        self.consumers.len() - 1
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Registered consumers, by ordinal
    ///
    /// After a fan-out run, a consumer whose worker panicked is no longer
    /// present. The survivors keep their relative order and are renumbered
    /// from 0, so on the next `run` the new consumer #0 seeds the others.
    pub fn consumers(&self) -> &[Box<dyn Consumer>] {
        &self.consumers
    }

    pub fn into_consumers(self) -> Vec<Box<dyn Consumer>> {
        self.consumers
    }

    /// Run the whole pipeline to completion
    ///
    /// Returns once the reader and every worker thread have joined. Read
    /// failures end the stream and are reported in `RunReport::read_error`;
    /// consumer failures are returned as errors.
    #[instrument(
        name = "dispatcher_run",
        skip(self),
        fields(
            consumers = self.consumers.len(),
            files = self.config.trajectories.len()
        )
    )]
    pub fn run(&mut self) -> Result<RunReport, DispatcherError> {
        let started = Instant::now();
        self.check_preconditions()?;
        self.seed_systems()?;

        let channel = Channel::bounded(self.config.buffer_size);
        let source = FrameSource::new(
            self.config.trajectories.clone(),
            Arc::clone(&self.opener),
            self.config.range,
        )
        .with_log_interval(self.config.log_interval);
        let source_metrics = source.metrics();
        let reader = source.spawn(channel.clone())?;

        info!(
            consumers = self.consumers.len(),
            fan_out = self.consumers.len() > 1,
            buffer_size = channel.capacity(),
            "dispatcher started"
        );

        let mut report = if self.consumers.len() == 1 {
            self.run_single(&channel, reader, &source_metrics)?
        } else {
            self.run_fan_out(&channel, reader, &source_metrics)?
        };
        report.elapsed = started.elapsed();

        info!(
            frames_read = report.frames_read,
            frames_accepted = report.frames_accepted,
            stop_reason = ?report.stop_reason,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "dispatcher finished"
        );
        Ok(report)
    }

    fn check_preconditions(&self) -> Result<(), DispatcherError> {
        if self.consumers.is_empty() {
            return Err(DispatcherError::NoConsumers);
        }
        if self.config.trajectories.is_empty() {
            return Err(DispatcherError::NoTrajectories);
        }
        self.config
            .range
            .validate()
            .map_err(DispatcherError::Configuration)
    }

    /// Load structure/topology into consumer #0 and copy it to the rest
    #[instrument(name = "dispatcher_seed_systems", skip(self))]
    fn seed_systems(&mut self) -> Result<(), DispatcherError> {
        if self.config.system_files.is_empty() {
            return Ok(());
        }
        let Some((first, rest)) = self.consumers.split_first_mut() else {
            return Err(DispatcherError::NoConsumers);
        };

        let system = first.system_mut();
        system.clear();
        for path in &self.config.system_files {
            self.loader
                .load(path, system)
                .map_err(DispatcherError::SystemLoad)?;
        }

        let copies = rest.len();
        for consumer in rest {
            *consumer.system_mut() = system.clone();
        }
        info!(atoms = system.num_atoms(), copies, "molecular system seeded");
        Ok(())
    }

    /// Drain the source channel directly into the only consumer
    fn run_single(
        &mut self,
        channel: &Channel<SharedEnvelope>,
        reader: JoinHandle<SourceReport>,
        source_metrics: &SourceMetrics,
    ) -> Result<RunReport, DispatcherError> {
        let consumer = &mut self.consumers[0];
        let name = consumer.name().to_string();
        let metrics = ConsumerMetrics::new();

        let result = {
            let _stop = channel.stop_guard();
            drive_consumer(consumer.as_mut(), channel, &metrics)
        };

        let source = join_reader(reader)?;
        let last_meta = result.map_err(|e| DispatcherError::consumer(0, &name, e))?;

        let summary = ConsumerSummary {
            ordinal: 0,
            name,
            frames_consumed: metrics.consumed_count(),
            last_meta,
        };
        Ok(RunReport::new(source, source_metrics, vec![summary]))
    }

    /// Forward every envelope to one worker per consumer
    fn run_fan_out(
        &mut self,
        channel: &Channel<SharedEnvelope>,
        reader: JoinHandle<SourceReport>,
        source_metrics: &SourceMetrics,
    ) -> Result<RunReport, DispatcherError> {
        let handles = match self.spawn_workers() {
            Ok(handles) => handles,
            Err(e) => {
                channel.send_stop();
                join_reader(reader)?;
                return Err(e);
            }
        };

        let mut forwarded: u64 = 0;
        while let Some(envelope) = channel.receive() {
            for handle in &handles {
                handle.send(Arc::clone(&envelope));
            }
            forwarded += 1;

            if !channel.is_stopped() && handles.iter().all(ConsumerHandle::is_stopped) {
                warn!("every consumer stopped, closing source");
                channel.send_stop();
            }
        }
        debug!(frames = forwarded, "source drained, stopping consumers");

        for handle in &handles {
            handle.finish();
        }

        let reader_result = join_reader(reader);
        let mut summaries = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for handle in handles {
            let (consumer, result) = handle.join();
            if let Some(consumer) = consumer {
                self.consumers.push(consumer);
            }
            match result {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!(error = %e, "consumer failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        let source = reader_result?;
        if let Some(e) = first_error {
            return Err(e);
        }
        Ok(RunReport::new(source, source_metrics, summaries))
    }

    /// Move every consumer onto its own worker thread
    fn spawn_workers(&mut self) -> Result<Vec<ConsumerHandle>, DispatcherError> {
        let mut handles = Vec::with_capacity(self.consumers.len());
        for (ordinal, consumer) in std::mem::take(&mut self.consumers).into_iter().enumerate() {
            match ConsumerHandle::spawn(ordinal, consumer, self.config.buffer_size) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    for handle in handles {
                        if let (Some(consumer), _) = handle.join() {
                            self.consumers.push(consumer);
                        }
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(handles)
    }
}

fn join_reader(reader: JoinHandle<SourceReport>) -> Result<SourceReport, DispatcherError> {
    reader.join().map_err(|_| {
        error!("frame reader thread panicked");
        DispatcherError::ReaderPanicked
    })
}
