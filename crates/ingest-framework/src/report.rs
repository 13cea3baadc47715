//! Run reports.

use crate::config::IngestMode;
use crate::metrics::CounterSnapshot;
use crate::stats::InsertTimings;
use crate::worker::WorkerSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Adapter name
    pub backend: String,
    /// Ingest mode
    pub mode: IngestMode,
    /// Ticks generated
    pub ticks: u64,
    /// Records per tick
    pub data_batch_size: usize,
    /// Counter values at the end of the run
    pub counters: CounterSnapshot,
    /// Insert timings over the whole run
    pub timings: InsertTimings,
    /// Final state of every worker
    pub workers: Vec<WorkerSummary>,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Wall time of the run in milliseconds
    pub duration_ms: u64,
}

impl IngestReport {
    /// Inserted records per second of wall time.
    pub fn rows_per_second(&self) -> f64 {
        if self.duration_ms > 0 {
            self.counters.inserted as f64 * 1000.0 / self.duration_ms as f64
        } else {
            0.0
        }
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {} ticks, {} generated, {} inserted, {} failed inserts, {} starvations in {} ms ({:.0} rows/s)",
            self.backend,
            self.mode,
            self.ticks,
            self.counters.generated,
            self.counters.inserted,
            self.counters.insert_failed,
            self.counters.queue_empty,
            self.duration_ms,
            self.rows_per_second()
        )
    }
}

/// Latency distribution in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
}

/// Summary of a query benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryReport {
    /// Adapter name
    pub backend: String,
    /// Query text
    pub query: String,
    /// Threads used
    pub concurrency: usize,
    /// Failed queries
    pub errors: u64,
    /// Rows returned by successful queries
    pub rows: u64,
    /// Latencies of successful queries
    pub latency: LatencyStats,
    /// Wall time of the benchmark in milliseconds
    pub duration_ms: u64,
}

impl QueryReport {
    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        let l = &self.latency;
        format!(
            "{}: {} queries ({} errors) on {} threads, mean {:.1} us, p50 {} us, p95 {} us, p99 {} us, max {} us",
            self.backend,
            l.count,
            self.errors,
            self.concurrency,
            l.mean_us,
            l.p50_us,
            l.p95_us,
            l.p99_us,
            l.max_us
        )
    }
}
