//! Pipeline counters and metric names.
//!
//! Counters are kept in atomics so reports can read them without a
//! recorder, and mirrored to the `metrics` facade. Emitting is a no-op until
//! the binary installs an exporter.

use ::metrics::{describe_counter, describe_gauge, Unit};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const GENERATED_TOTAL: &str = "generated_total";
pub const INSERTED_TOTAL: &str = "inserted_total";
pub const INSERT_SUCCESS_TOTAL: &str = "insert_success_total";
pub const INSERT_FAILED_TOTAL: &str = "insert_failed_total";
pub const QUEUE_EMPTY_TOTAL: &str = "queue_empty_total";

pub const INSERT_PERCENTAGE: &str = "insert_percentage";

// Per-worker gauges, labelled with `worker`.
pub const BATCH_SIZE: &str = "batch_size";
pub const INSERT_SECONDS: &str = "insert_seconds";
pub const ROWS_PER_SECOND: &str = "rows_per_second";
pub const BEST_BATCH_SIZE: &str = "best_batch_size";
pub const BEST_BATCH_ROWS_PER_SECOND: &str = "best_batch_rows_per_second";

/// Register descriptions for every metric the pipeline emits.
pub fn describe_metrics() {
    describe_counter!(GENERATED_TOTAL, Unit::Count, "Records generated.");
    describe_counter!(INSERTED_TOTAL, Unit::Count, "Records inserted successfully.");
    describe_counter!(INSERT_SUCCESS_TOTAL, Unit::Count, "Successful insert calls.");
    describe_counter!(INSERT_FAILED_TOTAL, Unit::Count, "Failed insert calls.");
    describe_counter!(
        QUEUE_EMPTY_TOTAL,
        Unit::Count,
        "Times a worker found the queue empty before filling its batch."
    );

    describe_gauge!(
        INSERT_PERCENTAGE,
        Unit::Percent,
        "Inserted records relative to the records the run will generate."
    );
    describe_gauge!(BATCH_SIZE, Unit::Count, "Batch size of the last insert.");
    describe_gauge!(INSERT_SECONDS, Unit::Seconds, "Duration of the last insert.");
    describe_gauge!(ROWS_PER_SECOND, Unit::CountPerSecond, "Throughput of the last insert.");
    describe_gauge!(BEST_BATCH_SIZE, Unit::Count, "Batch size of the best window.");
    describe_gauge!(
        BEST_BATCH_ROWS_PER_SECOND,
        Unit::CountPerSecond,
        "Throughput of the best window."
    );
}

/// Append-only counters shared by every pipeline thread.
#[derive(Debug, Default)]
pub struct IngestCounters {
    generated: AtomicU64,
    inserted: AtomicU64,
    insert_success: AtomicU64,
    insert_failed: AtomicU64,
    queue_empty: AtomicU64,
    // Inserted records not yet picked up by the aggregation loop.
    relay: AtomicU64,
}

impl IngestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_generated(&self, records: u64) {
        self.generated.fetch_add(records, Ordering::Relaxed);
        ::metrics::counter!(GENERATED_TOTAL).increment(records);
    }

    /// Count a successful insert of `records` records.
    pub fn record_insert_success(&self, records: u64) {
        self.insert_success.fetch_add(1, Ordering::Relaxed);
        self.inserted.fetch_add(records, Ordering::Relaxed);
        self.relay.fetch_add(records, Ordering::Relaxed);
        ::metrics::counter!(INSERT_SUCCESS_TOTAL).increment(1);
        ::metrics::counter!(INSERTED_TOTAL).increment(records);
    }

    pub fn record_insert_failure(&self) {
        self.insert_failed.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(INSERT_FAILED_TOTAL).increment(1);
    }

    pub fn record_queue_empty(&self) {
        self.queue_empty.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(QUEUE_EMPTY_TOTAL).increment(1);
    }

    /// Take the records inserted since the last call.
    pub fn take_relay(&self) -> u64 {
        self.relay.swap(0, Ordering::AcqRel)
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            generated: self.generated.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            insert_success: self.insert_success.load(Ordering::Relaxed),
            insert_failed: self.insert_failed.load(Ordering::Relaxed),
            queue_empty: self.queue_empty.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Records generated
    pub generated: u64,
    /// Records inserted
    pub inserted: u64,
    /// Successful insert calls
    pub insert_success: u64,
    /// Failed insert calls
    pub insert_failed: u64,
    /// Queue starvation events
    pub queue_empty: u64,
}

/// Publish the per-worker gauges after a measured insert.
pub fn publish_worker_insert(worker: usize, batch_size: usize, duration: Duration) {
    let label = worker.to_string();
    let secs = duration.as_secs_f64();
    ::metrics::gauge!(BATCH_SIZE, "worker" => label.clone()).set(batch_size as f64);
    ::metrics::gauge!(INSERT_SECONDS, "worker" => label.clone()).set(secs);
    if secs > 0.0 {
        ::metrics::gauge!(ROWS_PER_SECOND, "worker" => label).set(batch_size as f64 / secs);
    }
}

/// Publish the best window of a worker's controller.
pub fn publish_worker_best(worker: usize, size: usize, throughput: f64) {
    let label = worker.to_string();
    ::metrics::gauge!(BEST_BATCH_SIZE, "worker" => label.clone()).set(size as f64);
    if throughput.is_finite() {
        ::metrics::gauge!(BEST_BATCH_ROWS_PER_SECOND, "worker" => label).set(throughput);
    }
}

/// Publish the share of the run's records inserted so far.
pub fn publish_insert_percentage(inserted: u64, target: u64) {
    if target > 0 {
        ::metrics::gauge!(INSERT_PERCENTAGE).set(inserted as f64 * 100.0 / target as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let counters = IngestCounters::new();
        counters.record_generated(10);
        counters.record_insert_success(4);
        counters.record_insert_success(3);
        counters.record_insert_failure();
        counters.record_queue_empty();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.generated, 10);
        assert_eq!(snapshot.inserted, 7);
        assert_eq!(snapshot.insert_success, 2);
        assert_eq!(snapshot.insert_failed, 1);
        assert_eq!(snapshot.queue_empty, 1);
    }

    #[test]
    fn test_relay_is_drained_once() {
        let counters = IngestCounters::new();
        counters.record_insert_success(5);
        counters.record_insert_success(2);

        assert_eq!(counters.take_relay(), 7);
        assert_eq!(counters.take_relay(), 0);
        assert_eq!(counters.snapshot().inserted, 7);
    }
}
