//! Reference storage adapters.

pub mod jsonl;
pub mod null;

pub use jsonl::{JsonlAdapter, JsonlFactory};
pub use null::{NullAdapter, NullFactory};
