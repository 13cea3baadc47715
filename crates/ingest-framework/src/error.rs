//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Error reported by a storage adapter.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Could not open a connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema setup failed.
    #[error("Prepare error: {0}")]
    Prepare(String),

    /// A batch insert failed.
    #[error("Insert error: {0}")]
    Insert(String),

    /// A query failed.
    #[error("Query error: {0}")]
    Query(String),

    /// The adapter does not implement this operation.
    #[error("Operation not supported by the {0} adapter")]
    Unsupported(&'static str),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end an ingestion or query run.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker could not connect to or prepare the backend.
    #[error("Worker {worker} failed to start: {source}")]
    WorkerStartup {
        /// Index of the failing worker
        worker: usize,
        /// Adapter error that caused the failure
        #[source]
        source: AdapterError,
    },

    /// A pipeline thread could not be spawned or panicked.
    #[error("Thread error: {0}")]
    Thread(String),

    /// Histogram setup failed.
    #[error("Histogram error: {0}")]
    Histogram(String),

    /// Channel construction error.
    #[error("Generator error: {0}")]
    Generator(#[from] sensor_generator::GeneratorError),
}
