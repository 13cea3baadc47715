//! Adapter that appends one JSON object per record to a file.
//!
//! Every line is a flat object with the tick timestamp under `ts` plus the
//! tags and fields of the record:
//!
//! ```text
//! {"button_pressed":false,"line":"L1","plant":"A","sensor_id":1,"temperature":6.41,"ts":1700000000000}
//! ```
//!
//! All connections of one factory share the same writer, so lines of
//! different workers never interleave.

use ingest_framework::{AdapterError, AdapterFactory, StorageAdapter};
use sensor_core::{Record, Row};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Default buffer size for JSONL writing.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

type SharedWriter = Arc<Mutex<BufWriter<File>>>;

/// Factory for [`JsonlAdapter`] connections writing to one file.
#[derive(Debug)]
pub struct JsonlFactory {
    path: PathBuf,
    writer: SharedWriter,
}

impl JsonlFactory {
    /// Open `path` for writing, truncating it unless `append` is set.
    pub fn new<P: AsRef<Path>>(path: P, append: bool) -> Result<Self, AdapterError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .map_err(|e| AdapterError::Connection(format!("{}: {e}", path.display())))?;
        info!("Writing JSONL records to '{}'", path.display());

        Ok(Self {
            path,
            writer: Arc::new(Mutex::new(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AdapterFactory for JsonlFactory {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn connect(&self) -> Result<Box<dyn StorageAdapter>, AdapterError> {
        Ok(Box::new(JsonlAdapter {
            writer: Arc::clone(&self.writer),
            line: Vec::with_capacity(256),
            written: 0,
        }))
    }
}

/// One connection to the shared JSONL writer.
#[derive(Debug)]
pub struct JsonlAdapter {
    writer: SharedWriter,
    // Reused serialization buffer for one batch.
    line: Vec<u8>,
    written: u64,
}

impl JsonlAdapter {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BufWriter<File>>, AdapterError> {
        self.writer
            .lock()
            .map_err(|_| AdapterError::Insert("JSONL writer lock poisoned".to_string()))
    }
}

impl StorageAdapter for JsonlAdapter {
    fn prepare(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    fn insert(&mut self, timestamps: &[i64], records: &[Record]) -> Result<(), AdapterError> {
        self.line.clear();
        for (record, timestamp) in records.iter().zip(timestamps) {
            let json = serde_json::Value::Object(record.to_json_object(Some(*timestamp)));
            serde_json::to_writer(&mut self.line, &json)
                .map_err(|e| AdapterError::Insert(e.to_string()))?;
            self.line.push(b'\n');
        }

        let mut writer = self.lock()?;
        writer.write_all(&self.line)?;
        drop(writer);

        self.written += records.len() as u64;
        Ok(())
    }

    fn query(&mut self, _query: &str) -> Result<Vec<Row>, AdapterError> {
        Err(AdapterError::Unsupported("jsonl"))
    }

    fn close(&mut self) {
        match self.lock() {
            Ok(mut writer) => {
                if let Err(e) = writer.flush() {
                    warn!("Failed to flush JSONL writer: {}", e);
                }
            }
            Err(e) => warn!("{}", e),
        }
        debug!("JSONL connection closed after {} records", self.written);
    }
}
