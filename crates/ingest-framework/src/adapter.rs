//! The storage adapter interface the pipeline drives.
//!
//! One adapter value is one connection. The pipeline asks an
//! [`AdapterFactory`] for a fresh connection per worker and never shares a
//! connection between threads.

use crate::error::AdapterError;
use sensor_core::{Record, Row};

/// One connection to a storage backend.
pub trait StorageAdapter: Send {
    /// Idempotent schema setup (create tables, indexes, ...).
    fn prepare(&mut self) -> Result<(), AdapterError>;

    /// Insert a batch. `timestamps[i]` belongs to `records[i]`, in epoch
    /// milliseconds.
    fn insert(&mut self, timestamps: &[i64], records: &[Record]) -> Result<(), AdapterError>;

    /// Run a backend-specific query.
    fn query(&mut self, query: &str) -> Result<Vec<Row>, AdapterError>;

    /// Release the connection. Called exactly once per connection.
    fn close(&mut self);
}

/// Opens connections for workers.
pub trait AdapterFactory: Send + Sync {
    /// Backend name for logs and reports.
    fn name(&self) -> &str;

    /// Open a new connection.
    fn connect(&self) -> Result<Box<dyn StorageAdapter>, AdapterError>;
}
