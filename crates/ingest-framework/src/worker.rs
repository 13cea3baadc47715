//! Storage workers.
//!
//! A worker owns one adapter connection and, in fast mode, one batch-size
//! controller. Neither is shared with another thread.

use crate::adapter::{AdapterFactory, StorageAdapter};
use crate::clock::{now_millis, round_down};
use crate::controller::{BatchSizeController, ControllerConfig, WindowStats};
use crate::error::{AdapterError, IngestError};
use crate::metrics::{publish_worker_best, publish_worker_insert, IngestCounters};
use crate::pipeline::TickBatch;
use crate::shutdown::Shutdown;
use crate::stats::InsertSample;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use sensor_core::Record;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Back-off after draining nothing.
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Longest sleep of the paced loop between shutdown checks.
const PACING_POLL: Duration = Duration::from_millis(50);

/// Final state of one worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSummary {
    /// Worker index
    pub worker: usize,
    /// Records inserted by this worker
    pub inserted: u64,
    /// Failed insert calls
    pub failed: u64,
    /// Batch size the controller would use next
    pub batch_size: usize,
    /// Best window of the controller, if the search ran
    pub best: Option<WindowStats>,
}

/// Shared handles every worker needs.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub queue: Receiver<TickBatch>,
    pub shutdown: Arc<Shutdown>,
    pub counters: Arc<IngestCounters>,
    pub samples: Sender<InsertSample>,
}

/// Closes the connection when dropped, so it is closed exactly once on every
/// exit path including unwinding.
pub(crate) struct Connection(Box<dyn StorageAdapter>);

impl Deref for Connection {
    type Target = dyn StorageAdapter;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl DerefMut for Connection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Posts abort if the worker thread unwinds, so the generator does not block
/// on a queue nobody drains.
struct AbortOnPanic<'a>(&'a Shutdown);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.abort();
        }
    }
}

/// Connect and prepare; any failure aborts the whole run.
pub(crate) fn open_connection(
    worker: usize,
    factory: &dyn AdapterFactory,
    shutdown: &Shutdown,
) -> Result<Connection, IngestError> {
    let startup_failed = |source: AdapterError| {
        shutdown.abort();
        IngestError::WorkerStartup { worker, source }
    };

    let mut connection = Connection(factory.connect().map_err(startup_failed)?);
    connection.prepare().map_err(startup_failed)?;
    Ok(connection)
}

fn should_exit(ctx: &WorkerContext) -> bool {
    ctx.shutdown.is_aborted() || (ctx.shutdown.is_stopped() && ctx.queue.is_empty())
}

/// Fast-mode worker: drain as many records as the controller asks for,
/// insert, feed the duration back.
pub(crate) fn run_fast_worker(
    worker: usize,
    factory: Arc<dyn AdapterFactory>,
    controller_config: ControllerConfig,
    ctx: WorkerContext,
) -> Result<WorkerSummary, IngestError> {
    let _guard = AbortOnPanic(&ctx.shutdown);
    let mut connection = open_connection(worker, factory.as_ref(), &ctx.shutdown)?;
    let mut controller = BatchSizeController::new(&controller_config);
    let mut summary = WorkerSummary {
        worker,
        inserted: 0,
        failed: 0,
        batch_size: controller.next_batch_size(),
        best: None,
    };
    info!(
        "Worker {} started on {} (batch size {}, auto: {})",
        worker,
        factory.name(),
        controller.next_batch_size(),
        controller.auto_mode()
    );

    while !should_exit(&ctx) {
        let requested = controller.next_batch_size();
        let (timestamps, records) = drain(&ctx, requested);
        if records.is_empty() {
            std::thread::sleep(IDLE_BACKOFF);
            continue;
        }

        let start = Instant::now();
        match connection.insert(&timestamps, &records) {
            Ok(()) => {
                let duration = start.elapsed();
                summary.inserted += records.len() as u64;
                ctx.counters.record_insert_success(records.len() as u64);
                let _ = ctx.samples.send(InsertSample {
                    worker,
                    records: records.len(),
                    duration,
                });

                // Partial batches would skew the window.
                if records.len() == requested {
                    publish_worker_insert(worker, requested, duration);
                    if let Some(decision) = controller.record(duration) {
                        debug!(
                            "Worker {} {:?}: next batch size {}, alpha {:.3}",
                            worker,
                            decision,
                            controller.next_batch_size(),
                            controller.alpha()
                        );
                        if let Some(best) = controller.best() {
                            publish_worker_best(worker, best.size, best.throughput);
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Worker {} failed to insert {} records: {}", worker, records.len(), e);
                summary.failed += 1;
                ctx.counters.record_insert_failure();
            }
        }
    }

    summary.batch_size = controller.next_batch_size();
    summary.best = controller.best().copied();
    info!(
        "Worker {} finished: {} records inserted, {} failed inserts",
        worker, summary.inserted, summary.failed
    );
    Ok(summary)
}

/// Take whole ticks off the queue until `requested` records are collected
/// or the queue is empty. Never blocks.
fn drain(ctx: &WorkerContext, requested: usize) -> (Vec<i64>, Vec<Record>) {
    let mut timestamps = Vec::with_capacity(requested);
    let mut records = Vec::with_capacity(requested);

    while records.len() < requested {
        match ctx.queue.try_recv() {
            Ok(batch) => {
                let timestamp = batch.timestamp.unwrap_or_else(now_millis);
                timestamps.extend(std::iter::repeat(timestamp).take(batch.records.len()));
                records.extend(batch.records);
            }
            Err(TryRecvError::Empty) => {
                ctx.counters.record_queue_empty();
                break;
            }
            Err(TryRecvError::Disconnected) => break,
        }
    }

    (timestamps, records)
}

/// Consecutive-mode worker: one tick per interval, stamped with wall time.
pub(crate) fn run_paced_worker(
    factory: Arc<dyn AdapterFactory>,
    interval: Duration,
    ctx: WorkerContext,
) -> Result<WorkerSummary, IngestError> {
    let worker = 0;
    let _guard = AbortOnPanic(&ctx.shutdown);
    let mut connection = open_connection(worker, factory.as_ref(), &ctx.shutdown)?;
    let mut summary = WorkerSummary {
        worker,
        inserted: 0,
        failed: 0,
        batch_size: 0,
        best: None,
    };
    let mut last_insert: Option<Instant> = None;
    info!(
        "Paced worker started on {} (one tick every {:?})",
        factory.name(),
        interval
    );

    while !should_exit(&ctx) {
        if let Some(last) = last_insert {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep((interval - elapsed).min(PACING_POLL));
                continue;
            }
        }

        let batch = match ctx.queue.try_recv() {
            Ok(batch) => batch,
            Err(TryRecvError::Empty) => {
                ctx.counters.record_queue_empty();
                std::thread::sleep(IDLE_BACKOFF);
                continue;
            }
            Err(TryRecvError::Disconnected) => break,
        };

        let timestamp = round_down(now_millis(), interval);
        let timestamps = vec![timestamp; batch.records.len()];
        let start = Instant::now();
        last_insert = Some(start);
        summary.batch_size = batch.records.len();

        match connection.insert(&timestamps, &batch.records) {
            Ok(()) => {
                let duration = start.elapsed();
                summary.inserted += batch.records.len() as u64;
                ctx.counters.record_insert_success(batch.records.len() as u64);
                publish_worker_insert(worker, batch.records.len(), duration);
                let _ = ctx.samples.send(InsertSample {
                    worker,
                    records: batch.records.len(),
                    duration,
                });
            }
            Err(e) => {
                warn!("Failed to insert tick {}: {}", timestamp, e);
                summary.failed += 1;
                ctx.counters.record_insert_failure();
            }
        }
    }

    info!(
        "Paced worker finished: {} records inserted, {} failed inserts",
        summary.inserted, summary.failed
    );
    Ok(summary)
}
