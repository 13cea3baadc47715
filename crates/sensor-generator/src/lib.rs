//! Sensor channel simulation for the tsdb-loadgen harness.
//!
//! This crate turns a [`ChannelKind`](sensor_core::ChannelKind) from the
//! schema into live [`Channel`]s. Every channel owns a seeded RNG and one
//! stateful simulator per field, so the same seed and id always produce the
//! same stream of records.
//!
//! # Architecture
//!
//! ```text
//! ChannelKind (YAML)
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │  Channel            │
//! │                     │
//! │  - id               │──► tags: mixed-radix decomposition of id-1
//! │  - rng (StdRng)     │
//! │  - simulators       │──► FloatSimulator / BoolSensor
//! └──────────┬──────────┘
//!            │ next_record()
//!            ▼
//!    Record { channel_id, tags, fields }
//! ```
//!
//! # Example
//!
//! ```rust
//! use sensor_core::SensorSchema;
//! use sensor_generator::Channel;
//!
//! let schema = SensorSchema::from_yaml(r#"
//! readings:
//!   tags:
//!     plant: [A, B, C, D, E]
//!     line: [L1, L2, L3]
//!   fields:
//!     button_pressed:
//!       type: BOOL
//!       true_ratio: 0.5
//! "#).unwrap();
//!
//! let kind = schema.resolve_kind(None).unwrap();
//! let mut channel = Channel::new(4, kind, 42).unwrap();
//! let record = channel.next_record();
//! assert_eq!(record.get_tag("plant").and_then(|v| v.as_str()), Some("B"));
//! assert_eq!(record.get_tag("line").and_then(|v| v.as_str()), Some("L1"));
//! ```
//!
//! # Simulators
//!
//! - `FLOAT` - bounded mean-reverting walk with error excursions
//! - `BOOL` - rare-event boolean with a configurable true ratio

pub mod channel;
pub mod simulators;

// Re-exports for convenience
pub use channel::{assign_tags, build_channels, Channel, GeneratorError};
pub use simulators::{BoolSensor, FieldSimulator, FloatParams, FloatSimulator};
