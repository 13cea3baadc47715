//! Adapter that discards every record.
//!
//! Useful to measure the generator and pipeline overhead without a backend.

use ingest_framework::{AdapterError, AdapterFactory, StorageAdapter};
use sensor_core::{Record, Row};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Factory for [`NullAdapter`] connections sharing one record counter.
#[derive(Debug, Default)]
pub struct NullFactory {
    records: Arc<AtomicU64>,
}

impl NullFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records accepted by every connection so far.
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }
}

impl AdapterFactory for NullFactory {
    fn name(&self) -> &str {
        "null"
    }

    fn connect(&self) -> Result<Box<dyn StorageAdapter>, AdapterError> {
        Ok(Box::new(NullAdapter {
            records: Arc::clone(&self.records),
            inserted: 0,
        }))
    }
}

/// One discarding connection.
#[derive(Debug)]
pub struct NullAdapter {
    records: Arc<AtomicU64>,
    inserted: u64,
}

impl StorageAdapter for NullAdapter {
    fn prepare(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    fn insert(&mut self, _timestamps: &[i64], records: &[Record]) -> Result<(), AdapterError> {
        self.inserted += records.len() as u64;
        self.records.fetch_add(records.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn query(&mut self, _query: &str) -> Result<Vec<Row>, AdapterError> {
        Ok(Vec::new())
    }

    fn close(&mut self) {
        debug!("Null connection closed after {} records", self.inserted);
    }
}
