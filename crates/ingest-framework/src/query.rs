//! Query latency benchmark.
//!
//! Runs one query repeatedly on several threads, each with its own
//! connection, and reports the latency distribution of the successful calls.

use crate::adapter::AdapterFactory;
use crate::error::IngestError;
use crate::report::{LatencyStats, QueryReport};
use crate::shutdown::Shutdown;
use crate::worker::open_connection;
use hdrhistogram::Histogram;
use std::sync::Arc;
use std::thread::Builder;
use std::time::Instant;
use tracing::{info, warn};

/// Highest latency the histogram tracks: one minute in microseconds.
const MAX_LATENCY_US: u64 = 60_000_000;

/// Repeated query benchmark.
#[derive(Debug, Clone)]
pub struct QueryBenchmark {
    /// Query text passed to the adapter
    pub query: String,
    /// Queries per thread
    pub iterations: u64,
    /// Number of threads
    pub concurrency: usize,
}

/// Outcome of one benchmark thread.
struct ThreadResult {
    histogram: Histogram<u64>,
    errors: u64,
    rows: u64,
}

impl QueryBenchmark {
    pub fn new(query: impl Into<String>, iterations: u64, concurrency: usize) -> Self {
        Self {
            query: query.into(),
            iterations,
            concurrency: concurrency.max(1),
        }
    }

    /// Run the benchmark against `factory`.
    ///
    /// A thread that cannot connect aborts the others and its error is
    /// returned; failed queries are only counted.
    pub fn run(&self, factory: Arc<dyn AdapterFactory>) -> Result<QueryReport, IngestError> {
        info!(
            "Running '{}' {} times on {} threads against {}",
            self.query,
            self.iterations,
            self.concurrency,
            factory.name()
        );
        let shutdown = Shutdown::new();
        let started = Instant::now();

        let results = std::thread::scope(|scope| -> Result<Vec<ThreadResult>, IngestError> {
            let mut handles = Vec::with_capacity(self.concurrency);
            for thread in 0..self.concurrency {
                let factory = factory.as_ref();
                let shutdown = &shutdown;
                let handle = Builder::new()
                    .name(format!("query-{thread}"))
                    .spawn_scoped(scope, move || self.run_thread(thread, factory, shutdown))
                    .map_err(|e| {
                        shutdown.abort();
                        IngestError::Thread(format!("failed to spawn query thread: {e}"))
                    })?;
                handles.push(handle);
            }

            let mut results = Vec::with_capacity(handles.len());
            let mut first_error = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(result)) => results.push(result),
                    Ok(Err(e)) => {
                        first_error.get_or_insert(e);
                    }
                    Err(_) => {
                        shutdown.abort();
                        first_error.get_or_insert(IngestError::Thread("query thread panicked".to_string()));
                    }
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(results),
            }
        })?;

        let mut histogram = new_histogram()?;
        let mut errors = 0;
        let mut rows = 0;
        for result in results {
            histogram
                .add(&result.histogram)
                .map_err(|e| IngestError::Histogram(e.to_string()))?;
            errors += result.errors;
            rows += result.rows;
        }

        let report = QueryReport {
            backend: factory.name().to_string(),
            query: self.query.clone(),
            concurrency: self.concurrency,
            errors,
            rows,
            latency: latency_stats(&histogram),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!("Query benchmark finished: {}", report.summary());
        Ok(report)
    }

    fn run_thread(
        &self,
        thread: usize,
        factory: &dyn AdapterFactory,
        shutdown: &Shutdown,
    ) -> Result<ThreadResult, IngestError> {
        let mut connection = open_connection(thread, factory, shutdown)?;
        let mut result = ThreadResult {
            histogram: new_histogram()?,
            errors: 0,
            rows: 0,
        };

        for _ in 0..self.iterations {
            if shutdown.is_aborted() {
                break;
            }
            let start = Instant::now();
            match connection.query(&self.query) {
                Ok(rows) => {
                    let micros = (start.elapsed().as_micros() as u64).clamp(1, MAX_LATENCY_US);
                    let _ = result.histogram.record(micros);
                    result.rows += rows.len() as u64;
                }
                Err(e) => {
                    warn!("Query thread {} failed: {}", thread, e);
                    result.errors += 1;
                }
            }
        }

        Ok(result)
    }
}

fn new_histogram() -> Result<Histogram<u64>, IngestError> {
    Histogram::<u64>::new_with_bounds(1, MAX_LATENCY_US, 3)
        .map_err(|e| IngestError::Histogram(e.to_string()))
}

/// Summarize a latency histogram.
pub fn latency_stats(histogram: &Histogram<u64>) -> LatencyStats {
    if histogram.is_empty() {
        return LatencyStats::default();
    }

    LatencyStats {
        count: histogram.len(),
        min_us: histogram.min(),
        max_us: histogram.max(),
        mean_us: histogram.mean(),
        p50_us: histogram.value_at_quantile(0.50),
        p95_us: histogram.value_at_quantile(0.95),
        p99_us: histogram.value_at_quantile(0.99),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_stats_empty() {
        let histogram = new_histogram().unwrap();
        assert_eq!(latency_stats(&histogram), LatencyStats::default());
    }

    #[test]
    fn test_latency_stats_quantiles() {
        let mut histogram = new_histogram().unwrap();
        for micros in 1..=100 {
            histogram.record(micros).unwrap();
        }

        let stats = latency_stats(&histogram);
        assert_eq!(stats.count, 100);
        assert_eq!(stats.min_us, 1);
        assert_eq!(stats.max_us, 100);
        assert_eq!(stats.p50_us, 50);
        assert_eq!(stats.p99_us, 99);
        assert!((stats.mean_us - 50.5).abs() < 0.01);
    }

    #[test]
    fn test_concurrency_at_least_one() {
        assert_eq!(QueryBenchmark::new("SELECT 1", 10, 0).concurrency, 1);
    }
}
