//! tsdb-loadgen library
//!
//! Load generation and latency benchmarking for time-series databases.
//!
//! # Features
//!
//! - Schema-driven channels: tagged sensor channels with realistic float and
//!   boolean value simulation
//! - Fast mode: concurrent workers that tune their batch size online for the
//!   best insert throughput
//! - Consecutive mode: one tick per interval, like a live sensor fleet
//! - Query benchmark: latency percentiles for repeated queries
//!
//! # Workspace crates
//!
//! - `sensor_core` - schema documents, values and records
//! - `sensor_generator` - channels and value simulators
//! - `ingest_framework` - batch size controller, pipeline, adapter traits
//! - `ingest_args` - shared command line arguments
//!
//! # CLI Usage
//!
//! ```bash
//! # Ingest 1000 ticks of 15 channels, discarding the data
//! tsdb-loadgen ingest --schema sensors.yaml --id-end 15 --ingest-size 1000
//!
//! # Write one tick per second to a JSONL file
//! tsdb-loadgen ingest --schema sensors.yaml --mode consecutive \
//!   --backend jsonl --output records.jsonl
//!
//! # Query latency
//! tsdb-loadgen query --query "SELECT 1" --iterations 1000 --concurrency 4
//! ```

use clap::{Args, ValueEnum};
use ingest_framework::AdapterFactory;
use std::path::PathBuf;
use std::sync::Arc;

pub mod adapters;
pub mod interrupt;
pub mod run;
pub mod telemetry;

/// Storage backend selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Discard every record
    #[value(name = "null")]
    Null,
    /// Append records to a JSONL file
    #[value(name = "jsonl")]
    Jsonl,
}

/// Backend options shared by every command.
#[derive(Args, Clone, Debug)]
pub struct BackendArgs {
    /// Storage backend
    #[arg(long, value_enum, default_value = "null", env = "TSDB_LOADGEN_BACKEND")]
    pub backend: Backend,

    /// Output file of the jsonl backend
    #[arg(long, default_value = "records.jsonl", env = "TSDB_LOADGEN_OUTPUT")]
    pub output: PathBuf,

    /// Append to the output file instead of truncating it
    #[arg(long)]
    pub append: bool,
}

impl BackendArgs {
    /// Create the adapter factory for the selected backend.
    pub fn factory(&self) -> anyhow::Result<Arc<dyn AdapterFactory>> {
        let factory: Arc<dyn AdapterFactory> = match self.backend {
            Backend::Null => Arc::new(adapters::NullFactory::new()),
            Backend::Jsonl => Arc::new(adapters::JsonlFactory::new(&self.output, self.append)?),
        };
        Ok(factory)
    }
}
