//! Shared CLI argument definitions for tsdb-loadgen commands.
//!
//! The binary flattens these groups into its subcommands so every command
//! reads the schema, the channel range and the pipeline knobs the same way.

pub mod args;

pub use args::{CommonIngestArgs, IngestModeArg, QueryArgs, SchemaArgs};
