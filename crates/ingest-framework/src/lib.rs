//! Adaptive ingestion pipeline for the tsdb-loadgen harness.
//!
//! This crate drives a storage backend with generated channel data:
//!
//! - [`BatchSizeController`]: per-worker online search for the batch size
//!   with the highest insert throughput
//! - [`IngestPipeline`]: bounded producer/consumer pipeline in fast
//!   (adaptive, as fast as possible) or consecutive (paced) mode
//! - [`StorageAdapter`] / [`AdapterFactory`]: the backend interface
//! - [`QueryBenchmark`]: query latency measurement
//!
//! # Example
//!
//! ```ignore
//! use ingest_framework::{IngestConfig, IngestPipeline};
//! use sensor_generator::build_channels;
//!
//! let config = IngestConfig::default().with_ids(1, 15).with_ingest_size(1_000);
//! let channels = build_channels(kind, config.ids(), config.seed)?;
//! let pipeline = IngestPipeline::new(config, factory)?;
//! let report = pipeline.run(channels)?;
//! println!("{}", report.summary());
//! ```

pub mod adapter;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod shutdown;
pub mod stats;
mod worker;

pub use adapter::{AdapterFactory, StorageAdapter};
pub use clock::TickClock;
pub use config::{IngestConfig, IngestMode};
pub use controller::{BatchSizeController, ControllerConfig, Decision, Direction, WindowStats};
pub use error::{AdapterError, IngestError};
pub use metrics::{CounterSnapshot, IngestCounters};
pub use pipeline::{IngestPipeline, TickBatch};
pub use query::QueryBenchmark;
pub use report::{IngestReport, LatencyStats, QueryReport};
pub use shutdown::Shutdown;
pub use stats::InsertTimings;
pub use worker::WorkerSummary;
