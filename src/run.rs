//! Command runners.

use crate::interrupt::stop_on_interrupt;
use crate::BackendArgs;
use anyhow::Context;
use ingest_args::{CommonIngestArgs, QueryArgs};
use ingest_framework::{IngestPipeline, IngestReport, QueryBenchmark, QueryReport};
use sensor_core::{SensorSchema, TagSpec};
use sensor_generator::build_channels;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Generate channel data and ingest it into the selected backend.
///
/// Returns `None` in dry-run mode.
pub fn run_ingest(
    args: &CommonIngestArgs,
    backend: &BackendArgs,
    report_path: Option<&Path>,
) -> anyhow::Result<Option<IngestReport>> {
    let schema_path = &args.schema.schema;
    let schema = SensorSchema::from_file(schema_path)
        .with_context(|| format!("Failed to load schema from {schema_path:?}"))?;
    let kind = schema.resolve_kind(args.schema.kind.as_deref())?;
    let config = args.to_config();
    config.validate()?;

    let has_id_tag = kind.tags.iter().any(|(_, spec)| matches!(spec, TagSpec::Id));
    let combinations = kind.combinations().unwrap_or(u64::MAX);
    if !has_id_tag && config.id_end > combinations {
        warn!(
            "Channel ids above {} repeat tag combinations of kind '{}'",
            combinations, kind.name
        );
    }

    let channels = build_channels(kind, config.ids(), config.seed)
        .with_context(|| format!("Failed to build channels of kind '{}'", kind.name))?;

    if args.dry_run {
        info!(
            "[DRY-RUN] Kind '{}': tags {:?}, fields {:?}",
            kind.name,
            kind.tag_names(),
            kind.field_names()
        );
        info!(
            "[DRY-RUN] Would ingest {} ticks of {} channels in {} mode into {:?}",
            config.ingest_size,
            channels.len(),
            config.mode,
            backend.backend
        );
        info!("[DRY-RUN] Schema and configuration validated successfully");
        return Ok(None);
    }

    let factory = backend.factory()?;
    let pipeline = IngestPipeline::new(config, factory)?;
    stop_on_interrupt(pipeline.shutdown())?;
    let report = pipeline.run(channels)?;

    if let Some(path) = report_path {
        write_report(path, &report)?;
    }
    Ok(Some(report))
}

/// Run the query latency benchmark against the selected backend.
pub fn run_query(
    args: &QueryArgs,
    backend: &BackendArgs,
    report_path: Option<&Path>,
) -> anyhow::Result<QueryReport> {
    let factory = backend.factory()?;
    let benchmark = QueryBenchmark::new(args.query.clone(), args.iterations, args.concurrency);
    let report = benchmark.run(factory)?;

    if let Some(path) = report_path {
        write_report(path, &report)?;
    }
    Ok(report)
}

/// Write a report as pretty-printed JSON.
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!("Report written to {}", path.display());
    Ok(())
}
