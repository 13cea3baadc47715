//! Command-line interface for tsdb-loadgen
//!
//! # Usage Examples
//!
//! ## Ingest
//! ```bash
//! # Search for the best batch size with 8 workers, 1000 ticks of 15 channels
//! tsdb-loadgen ingest --schema sensors.yaml --id-end 15 \
//!   --ingest-size 1000 --concurrency 8
//!
//! # Live-like ingestion: one tick per second into a JSONL file
//! tsdb-loadgen ingest --schema sensors.yaml --mode consecutive \
//!   --ingest-delta-ms 1000 --backend jsonl --output records.jsonl
//!
//! # Expose Prometheus metrics while ingesting
//! tsdb-loadgen --metrics-port 9000 ingest --schema sensors.yaml --ingest-size 0
//! ```
//!
//! ## Query
//! ```bash
//! tsdb-loadgen query --query "SELECT 1" --iterations 1000 --concurrency 4 \
//!   --report query.json
//! ```

use clap::{Parser, Subcommand};
use ingest_args::{CommonIngestArgs, QueryArgs};
use std::path::PathBuf;
use tsdb_loadgen::run::{run_ingest, run_query};
use tsdb_loadgen::telemetry::install_prometheus;
use tsdb_loadgen::BackendArgs;

#[derive(Parser)]
#[command(name = "tsdb-loadgen")]
#[command(about = "Load generator and latency benchmark for time-series databases")]
#[command(long_about = None)]
struct Cli {
    /// Serve Prometheus metrics on this port
    #[arg(long, global = true, env = "TSDB_LOADGEN_METRICS_PORT")]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate channel data and ingest it into a backend
    Ingest {
        #[command(flatten)]
        args: CommonIngestArgs,

        #[command(flatten)]
        backend: BackendArgs,

        /// Write the run report as JSON to this file
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Measure the latency of a repeated query
    Query {
        #[command(flatten)]
        args: QueryArgs,

        #[command(flatten)]
        backend: BackendArgs,

        /// Write the benchmark report as JSON to this file
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Some(port) = cli.metrics_port {
        install_prometheus(port)?;
    }

    match cli.command {
        Commands::Ingest {
            args,
            backend,
            report,
        } => {
            if let Some(report) = run_ingest(&args, &backend, report.as_deref())? {
                println!("{}", report.summary());
            }
        }
        Commands::Query {
            args,
            backend,
            report,
        } => {
            let report = run_query(&args, &backend, report.as_deref())?;
            println!("{}", report.summary());
        }
    }

    Ok(())
}
