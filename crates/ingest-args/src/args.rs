//! Argument groups.

use clap::{Args, ValueEnum};
use ingest_framework::{IngestConfig, IngestMode};
use std::path::PathBuf;
use std::time::Duration;

/// Schema selection shared by every command.
#[derive(Args, Clone, Debug)]
pub struct SchemaArgs {
    /// Path to the channel schema (YAML or JSON)
    #[arg(long, short = 's', env = "TSDB_LOADGEN_SCHEMA")]
    pub schema: PathBuf,

    /// Channel kind to use (defaults to the first kind in the schema)
    #[arg(long, env = "TSDB_LOADGEN_KIND")]
    pub kind: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IngestModeArg {
    /// Insert as fast as the backend accepts, tuning batch sizes
    #[value(name = "fast")]
    Fast,
    /// Insert one tick per interval, stamped with wall time
    #[value(name = "consecutive")]
    Consecutive,
}

impl From<IngestModeArg> for IngestMode {
    fn from(mode: IngestModeArg) -> Self {
        match mode {
            IngestModeArg::Fast => IngestMode::Fast,
            IngestModeArg::Consecutive => IngestMode::Consecutive,
        }
    }
}

/// Pipeline arguments of the `ingest` command.
#[derive(Args, Clone, Debug)]
pub struct CommonIngestArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,

    /// First channel id (inclusive)
    #[arg(long, default_value = "1", env = "TSDB_LOADGEN_ID_START")]
    pub id_start: u64,

    /// Last channel id (inclusive)
    #[arg(long, default_value = "100", env = "TSDB_LOADGEN_ID_END")]
    pub id_end: u64,

    /// Ingest mode
    #[arg(long, value_enum, default_value = "fast", env = "TSDB_LOADGEN_MODE")]
    pub mode: IngestModeArg,

    /// Number of ticks to generate (0 = until interrupted)
    #[arg(long, default_value = "1000", env = "TSDB_LOADGEN_INGEST_SIZE")]
    pub ingest_size: u64,

    /// Tick interval in milliseconds
    #[arg(long, default_value = "1000", env = "TSDB_LOADGEN_INGEST_DELTA_MS")]
    pub ingest_delta_ms: u64,

    /// Fixed batch size in records (0 or negative = search for the best size)
    #[arg(long, default_value = "0", allow_negative_numbers = true, env = "TSDB_LOADGEN_BATCH_SIZE")]
    pub batch_size: i64,

    /// Initial step of the batch size search
    #[arg(long, default_value = "500", env = "TSDB_LOADGEN_STEP_SIZE")]
    pub step_size: usize,

    /// Inserts measured per batch size decision
    #[arg(long, default_value = "20", env = "TSDB_LOADGEN_TEST_SIZE")]
    pub test_size: usize,

    /// Number of insert workers in fast mode
    #[arg(long, default_value = "4", env = "TSDB_LOADGEN_CONCURRENCY")]
    pub concurrency: usize,

    /// Capacity of the tick queue
    #[arg(long, default_value = "1000", env = "TSDB_LOADGEN_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Interval between statistics log lines in seconds
    #[arg(long, default_value = "10", env = "TSDB_LOADGEN_STAT_DELTA_SECS")]
    pub stat_delta_secs: u64,

    /// Random seed for deterministic generation (same seed = same data)
    #[arg(long, default_value = "42", env = "TSDB_LOADGEN_SEED")]
    pub seed: u64,

    /// Dry-run mode: validate schema and configuration without connecting to the backend
    #[arg(long)]
    pub dry_run: bool,
}

impl CommonIngestArgs {
    /// Build the pipeline configuration.
    pub fn to_config(&self) -> IngestConfig {
        IngestConfig::default()
            .with_ids(self.id_start, self.id_end)
            .with_mode(self.mode.into())
            .with_ingest_size(self.ingest_size)
            .with_ingest_delta(Duration::from_millis(self.ingest_delta_ms))
            .with_batch_size(self.batch_size)
            .with_step_size(self.step_size)
            .with_test_size(self.test_size)
            .with_concurrency(self.concurrency)
            .with_queue_capacity(self.queue_capacity)
            .with_stat_delta(Duration::from_secs(self.stat_delta_secs))
            .with_seed(self.seed)
    }
}

/// Arguments of the `query` command.
#[derive(Args, Clone, Debug)]
pub struct QueryArgs {
    /// Query passed verbatim to the adapter
    #[arg(long, short = 'q')]
    pub query: String,

    /// Queries per thread
    #[arg(long, default_value = "100")]
    pub iterations: u64,

    /// Number of query threads
    #[arg(long, default_value = "1")]
    pub concurrency: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        ingest: CommonIngestArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::try_parse_from(["test", "--schema", "sensors.yaml"]).unwrap();
        let config = cli.ingest.to_config();

        assert_eq!(cli.ingest.schema.schema, PathBuf::from("sensors.yaml"));
        assert_eq!(config.data_batch_size(), 100);
        assert_eq!(config.mode, IngestMode::Fast);
        assert_eq!(config.ingest_delta, Duration::from_secs(1));
        assert_eq!(config.batch_size, 0);
        assert!(!cli.ingest.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let cli = TestCli::try_parse_from([
            "test",
            "-s",
            "sensors.yaml",
            "--kind",
            "sensor_values",
            "--id-start",
            "16",
            "--id-end",
            "30",
            "--mode",
            "consecutive",
            "--batch-size",
            "-1",
            "--ingest-delta-ms",
            "250",
        ])
        .unwrap();
        let config = cli.ingest.to_config();

        assert_eq!(cli.ingest.schema.kind.as_deref(), Some("sensor_values"));
        assert_eq!(config.ids(), 16..=30);
        assert_eq!(config.mode, IngestMode::Consecutive);
        assert_eq!(config.batch_size, -1);
        assert_eq!(config.ingest_delta, Duration::from_millis(250));
    }

    #[test]
    fn test_schema_is_required() {
        assert!(TestCli::try_parse_from(["test"]).is_err());
    }
}
