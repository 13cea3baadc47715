//! Value representations for generated telemetry.
//!
//! A [`Record`] is what a channel produces on every tick and what storage
//! adapters receive: the channel id, its tag values and its field values,
//! all kept in schema declaration order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar value of a tag or field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// String value
    Text(String),
}

impl Value {
    /// Convert a YAML scalar into a value.
    ///
    /// Returns `None` for sequences, mappings, tagged values and null.
    pub fn from_yaml(value: &serde_yaml::Value) -> Option<Self> {
        match value {
            serde_yaml::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            serde_yaml::Value::String(s) => Some(Value::Text(s.clone())),
            _ => None,
        }
    }

    /// Try to get this value as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// One row returned by a storage query.
pub type Row = Vec<Value>;

/// One tagged measurement produced by a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Id of the channel that produced this record
    pub channel_id: u64,

    /// Tag values in declaration order
    pub tags: Vec<(String, Value)>,

    /// Field values in declaration order
    pub fields: Vec<(String, Value)>,
}

impl Record {
    /// Create a new record.
    pub fn new(
        channel_id: u64,
        tags: Vec<(String, Value)>,
        fields: Vec<(String, Value)>,
    ) -> Self {
        Self {
            channel_id,
            tags,
            fields,
        }
    }

    /// Get a tag value by name.
    pub fn get_tag(&self, name: &str) -> Option<&Value> {
        self.tags.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a field value by name.
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Render the record as a flat JSON object with an optional timestamp.
    ///
    /// Tags and fields share one namespace; a field overrides a tag with the
    /// same name.
    pub fn to_json_object(&self, timestamp: Option<i64>) -> serde_json::Map<String, serde_json::Value> {
        let mut object = serde_json::Map::new();
        if let Some(ts) = timestamp {
            object.insert("ts".to_string(), serde_json::Value::from(ts));
        }
        for (name, value) in self.tags.iter().chain(self.fields.iter()) {
            object.insert(name.clone(), value.to_json());
        }
        object
    }
}
