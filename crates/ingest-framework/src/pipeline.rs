//! The ingestion pipeline.
//!
//! ```text
//!  generator ──► bounded queue ──► worker 0 ──► adapter connection 0
//!  (caller)      (TickBatch)   ├─► worker 1 ──► adapter connection 1
//!                              └─► ...
//!        workers ──► InsertSample ──► statistics loop
//!        workers ──► inserted relay ──► aggregation loop
//! ```
//!
//! The generator runs on the calling thread. A run goes through
//! generating, draining and stopped: once the tick count is reached the
//! generator posts stop and the workers empty the queue. A worker that cannot
//! connect or prepare posts abort, which ends every loop without draining.

use crate::adapter::AdapterFactory;
use crate::clock::TickClock;
use crate::config::{IngestConfig, IngestMode};
use crate::error::IngestError;
use crate::metrics::{describe_metrics, publish_insert_percentage, IngestCounters};
use crate::report::IngestReport;
use crate::shutdown::Shutdown;
use crate::stats::{run_stats_loop, InsertTimings};
use crate::worker::{run_fast_worker, run_paced_worker, WorkerContext, WorkerSummary};
use chrono::Utc;
use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender};
use sensor_core::Record;
use sensor_generator::Channel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{Builder, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How long a blocked enqueue waits before checking for abort again.
const ENQUEUE_POLL: Duration = Duration::from_millis(50);

/// Interval of the aggregation loop.
const AGGREGATION_INTERVAL: Duration = Duration::from_millis(100);

/// Records generated in one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickBatch {
    /// Tick timestamp in epoch milliseconds; `None` lets the worker stamp it
    pub timestamp: Option<i64>,
    pub records: Vec<Record>,
}

impl TickBatch {
    pub fn new(timestamp: Option<i64>, records: Vec<Record>) -> Self {
        Self { timestamp, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Producer/consumer pipeline feeding a storage backend.
///
/// A pipeline is meant for one run; after [`IngestPipeline::run`] or
/// [`IngestPipeline::drain`] returns, its stop flag stays posted.
pub struct IngestPipeline {
    config: IngestConfig,
    factory: Arc<dyn AdapterFactory>,
    sender: Sender<TickBatch>,
    receiver: Receiver<TickBatch>,
    shutdown: Arc<Shutdown>,
    counters: Arc<IngestCounters>,
}

impl IngestPipeline {
    /// Create a pipeline. Fails on an invalid configuration.
    pub fn new(config: IngestConfig, factory: Arc<dyn AdapterFactory>) -> Result<Self, IngestError> {
        config.validate()?;
        describe_metrics();

        let (sender, receiver) = bounded(config.queue_capacity);
        Ok(Self {
            config,
            factory,
            sender,
            receiver,
            shutdown: Arc::new(Shutdown::new()),
            counters: Arc::new(IngestCounters::new()),
        })
    }

    /// Stop and abort flags, e.g. for a signal handler.
    pub fn shutdown(&self) -> Arc<Shutdown> {
        Arc::clone(&self.shutdown)
    }

    /// Live counters.
    pub fn counters(&self) -> Arc<IngestCounters> {
        Arc::clone(&self.counters)
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Number of ticks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }

    /// Put a tick on the queue, blocking while it is full.
    ///
    /// Returns `false` if the run was aborted before the tick was accepted.
    pub fn enqueue(&self, batch: TickBatch) -> bool {
        let records = batch.len() as u64;
        let mut pending = batch;
        loop {
            if self.shutdown.is_aborted() {
                return false;
            }
            match self.sender.send_timeout(pending, ENQUEUE_POLL) {
                Ok(()) => {
                    self.counters.record_generated(records);
                    return true;
                }
                Err(SendTimeoutError::Timeout(batch)) => pending = batch,
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }

    /// Generate ticks from `channels` and ingest them.
    ///
    /// Blocks until the configured number of ticks is generated and
    /// inserted, [`Shutdown::request_stop`] is called, or a worker fails to
    /// start. The first startup failure is returned.
    ///
    /// `channels` must match the configured id range: batch sizes are
    /// multiples of the records generated per tick.
    pub fn run(&self, channels: Vec<Channel>) -> Result<IngestReport, IngestError> {
        if channels.len() != self.config.data_batch_size() {
            return Err(IngestError::Config(format!(
                "{} channels given for the {} ids {}..={}",
                channels.len(),
                self.config.data_batch_size(),
                self.config.id_start,
                self.config.id_end
            )));
        }
        info!(
            "Starting {} ingest of {} channels into {} ({} ticks, interval {:?})",
            self.config.mode,
            channels.len(),
            self.factory.name(),
            self.config.ingest_size,
            self.config.ingest_delta
        );
        let target = self
            .config
            .ingest_size
            .saturating_mul(self.config.data_batch_size() as u64);
        self.execute(Some(channels), target)
    }

    /// Ingest whatever is already queued, without generating.
    pub fn drain(&self) -> Result<IngestReport, IngestError> {
        info!(
            "Draining {} queued ticks into {}",
            self.queued(),
            self.factory.name()
        );
        self.shutdown.request_stop();
        let target = self.counters.snapshot().generated;
        self.execute(None, target)
    }

    fn execute(
        &self,
        channels: Option<Vec<Channel>>,
        target: u64,
    ) -> Result<IngestReport, IngestError> {
        let started_at = Utc::now();
        let started = Instant::now();
        let finished = AtomicBool::new(false);

        let (ticks, workers, timings) = std::thread::scope(|scope| -> Result<_, IngestError> {
            let (sample_tx, sample_rx) = unbounded();
            let stat_delta = self.config.stat_delta;
            let finished = &finished;

            // Unblock everything already spawned before bailing out.
            let spawn_failed = |e: std::io::Error| {
                self.shutdown.abort();
                finished.store(true, Ordering::Release);
                IngestError::Thread(format!("failed to spawn pipeline thread: {e}"))
            };

            let stats = Builder::new()
                .name("ingest-stats".to_string())
                .spawn_scoped(scope, move || run_stats_loop(sample_rx, stat_delta))
                .map_err(spawn_failed)?;

            let aggregator = Builder::new()
                .name("ingest-aggregator".to_string())
                .spawn_scoped(scope, move || self.run_aggregator(finished, target))
                .map_err(spawn_failed)?;

            let ctx = WorkerContext {
                queue: self.receiver.clone(),
                shutdown: Arc::clone(&self.shutdown),
                counters: Arc::clone(&self.counters),
                samples: sample_tx,
            };

            let mut handles: Vec<ScopedJoinHandle<'_, Result<WorkerSummary, IngestError>>> =
                Vec::new();
            match self.config.mode {
                IngestMode::Fast => {
                    for worker in 0..self.config.concurrency {
                        let factory = Arc::clone(&self.factory);
                        let controller_config = self.config.controller_config();
                        let ctx = ctx.clone();
                        let handle = Builder::new()
                            .name(format!("ingest-worker-{worker}"))
                            .spawn_scoped(scope, move || {
                                run_fast_worker(worker, factory, controller_config, ctx)
                            })
                            .map_err(spawn_failed)?;
                        handles.push(handle);
                    }
                }
                IngestMode::Consecutive => {
                    let factory = Arc::clone(&self.factory);
                    let interval = self.config.ingest_delta;
                    let ctx = ctx.clone();
                    let handle = Builder::new()
                        .name("ingest-paced-worker".to_string())
                        .spawn_scoped(scope, move || run_paced_worker(factory, interval, ctx))
                        .map_err(spawn_failed)?;
                    handles.push(handle);
                }
            }
            // Workers hold the only sample senders now.
            drop(ctx);

            let ticks = match channels {
                Some(channels) => self.generate(channels),
                None => 0,
            };
            self.shutdown.request_stop();

            let mut summaries = Vec::with_capacity(handles.len());
            let mut first_error = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(summary)) => summaries.push(summary),
                    Ok(Err(e)) => {
                        warn!("Worker failed: {}", e);
                        first_error.get_or_insert(e);
                    }
                    Err(_) => {
                        self.shutdown.abort();
                        first_error.get_or_insert(IngestError::Thread("worker panicked".to_string()));
                    }
                }
            }

            finished.store(true, Ordering::Release);
            let aggregated = aggregator
                .join()
                .map_err(|_| IngestError::Thread("aggregator panicked".to_string()))?;
            let timings: InsertTimings = stats
                .join()
                .map_err(|_| IngestError::Thread("statistics loop panicked".to_string()))?;
            info!("Aggregated {} inserted records", aggregated);

            match first_error {
                Some(e) => Err(e),
                None => Ok((ticks, summaries, timings)),
            }
        })?;

        let report = IngestReport {
            backend: self.factory.name().to_string(),
            mode: self.config.mode,
            ticks,
            data_batch_size: self.config.data_batch_size(),
            counters: self.counters.snapshot(),
            timings,
            workers,
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!("Ingest finished: {}", report.summary());
        Ok(report)
    }

    /// Advance every channel once per tick until the tick count is reached
    /// or stop is posted. Returns the ticks enqueued.
    fn generate(&self, mut channels: Vec<Channel>) -> u64 {
        let limit = self.config.ingest_size;
        let mut clock = TickClock::start(self.config.ingest_delta);
        let mut ticks = 0;

        while !self.shutdown.is_stopped() && (limit == 0 || ticks < limit) {
            let records: Vec<Record> = channels.iter_mut().map(Channel::next_record).collect();
            let timestamp = match self.config.mode {
                IngestMode::Fast => Some(clock.tick()),
                IngestMode::Consecutive => None,
            };
            if !self.enqueue(TickBatch::new(timestamp, records)) {
                break;
            }
            ticks += 1;
        }

        info!("Generated {} ticks", ticks);
        ticks
    }

    /// Fold the inserted relay into a cumulative count until the run is over.
    fn run_aggregator(&self, finished: &AtomicBool, target: u64) -> u64 {
        let mut inserted = 0;
        loop {
            let done = finished.load(Ordering::Acquire)
                && (self.receiver.is_empty() || self.shutdown.is_aborted());
            inserted += self.counters.take_relay();
            publish_insert_percentage(inserted, target);
            if done {
                return inserted;
            }
            std::thread::sleep(AGGREGATION_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StorageAdapter;
    use crate::error::AdapterError;
    use sensor_core::{Row, Value};

    struct NullFactory;

    struct NullAdapter;

    impl StorageAdapter for NullAdapter {
        fn prepare(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }

        fn insert(&mut self, _: &[i64], _: &[Record]) -> Result<(), AdapterError> {
            Ok(())
        }

        fn query(&mut self, _: &str) -> Result<Vec<Row>, AdapterError> {
            Ok(Vec::new())
        }

        fn close(&mut self) {}
    }

    impl AdapterFactory for NullFactory {
        fn name(&self) -> &str {
            "null"
        }

        fn connect(&self) -> Result<Box<dyn StorageAdapter>, AdapterError> {
            Ok(Box::new(NullAdapter))
        }
    }

    fn record(id: u64) -> Record {
        Record::new(id, Vec::new(), vec![("v".to_string(), Value::Float(1.0))])
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = IngestPipeline::new(
            IngestConfig::default().with_concurrency(0),
            Arc::new(NullFactory),
        );
        assert!(matches!(result, Err(IngestError::Config(_))));
    }

    #[test]
    fn test_enqueue_counts_generated() {
        let pipeline = IngestPipeline::new(IngestConfig::default(), Arc::new(NullFactory)).unwrap();

        assert!(pipeline.enqueue(TickBatch::new(Some(0), vec![record(1), record(2)])));
        assert_eq!(pipeline.queued(), 1);
        assert_eq!(pipeline.counters().snapshot().generated, 2);
    }

    #[test]
    fn test_enqueue_gives_up_on_abort() {
        let pipeline = IngestPipeline::new(
            IngestConfig::default().with_queue_capacity(1),
            Arc::new(NullFactory),
        )
        .unwrap();

        assert!(pipeline.enqueue(TickBatch::new(None, vec![record(1)])));
        pipeline.shutdown().abort();
        assert!(!pipeline.enqueue(TickBatch::new(None, vec![record(1)])));
        assert_eq!(pipeline.counters().snapshot().generated, 1);
    }

    #[test]
    fn test_drain_empties_queue() {
        let pipeline = IngestPipeline::new(
            IngestConfig::default().with_concurrency(2).with_batch_size(3),
            Arc::new(NullFactory),
        )
        .unwrap();
        for tick in 0..10 {
            pipeline.enqueue(TickBatch::new(Some(tick), vec![record(1)]));
        }

        let report = pipeline.drain().unwrap();

        assert_eq!(pipeline.queued(), 0);
        assert_eq!(report.ticks, 0);
        assert_eq!(report.counters.inserted, 10);
        assert_eq!(report.workers.len(), 2);
    }
}
