//! Core types for the tsdb-loadgen harness.
//!
//! This crate provides the foundational types shared by the generator and
//! the ingestion pipeline:
//!
//! - [`SensorSchema`] - Channel kinds loaded from a YAML (or JSON) document
//! - [`TagSpec`] - How one tag dimension is derived from a channel id
//! - [`FieldDefinition`] - Raw field declaration (kind + parameters)
//! - [`Value`] / [`Record`] - One generated, tagged measurement
//!
//! # Architecture
//!
//! ```text
//! sensor-core (this crate)
//!    │
//!    ├─── sensor-generator   (channels and value simulators)
//!    │
//!    └─── ingest-framework   (adaptive ingestion pipeline, adapters)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sensor_core::{SensorSchema, TagSpec};
//!
//! let schema = SensorSchema::from_yaml(r#"
//! sensor_values:
//!   tags:
//!     plant: [A, B]
//!     sensor_id: id
//!   fields:
//!     temperature:
//!       type: FLOAT
//!       mean: 20.0
//!       min: 10.0
//!       max: 30.0
//!       stdev: 1.0
//!       variance: 0.1
//! "#).unwrap();
//!
//! let kind = schema.resolve_kind(None).unwrap();
//! assert_eq!(kind.name, "sensor_values");
//! assert_eq!(kind.tags[1].1, TagSpec::Id);
//! ```

pub mod schema;
pub mod values;

// Re-exports for convenience
pub use schema::{ChannelKind, FieldDefinition, SchemaError, SensorSchema, TagSpec};
pub use values::{Record, Row, Value};
