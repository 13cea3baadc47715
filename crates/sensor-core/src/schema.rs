//! Schema definitions for simulated sensor channels.
//!
//! A schema document is a map of channel kinds. Every kind declares an
//! ordered `tags` map, describing how tag values are derived from a channel
//! id, and an ordered `fields` map, describing the value simulators that
//! produce measurements:
//!
//! ```yaml
//! sensor_values:
//!   tags:
//!     plant: [A, B, C, D, E]   # explicit value list
//!     line: 3                  # cardinality
//!     sensor_id: id            # the channel id itself
//!   fields:
//!     temperature:
//!       type: FLOAT
//!       mean: 6.4
//!       min: 6.0
//!       max: 7.1
//!       stdev: 0.2
//!       variance: 0.03
//!     button_pressed:
//!       type: BOOL
//!       true_ratio: 0.001
//! ```
//!
//! JSON documents are accepted as well since JSON is a subset of YAML.
//!
//! Declaration order matters: the last declared tag is the fastest varying
//! one when ids are mapped onto tag combinations. Field kinds are kept as
//! raw strings here and resolved by the generator, so an unknown kind
//! surfaces when a channel is built.

use crate::values::Value;
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for schema operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Error reading schema file
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse schema: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Schema declares no channel kinds
    #[error("Schema does not declare any channel kind")]
    Empty,

    /// Channel kind not found in schema
    #[error("Channel kind not found: {0}")]
    KindNotFound(String),

    /// Map key is not a string
    #[error("Schema keys must be strings, got {0}")]
    InvalidKey(String),

    /// Tag declaration is not `id`, a cardinality or a value list
    #[error("Invalid tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: String },
}

// ============================================================================
// Tag Specification
// ============================================================================

/// How one tag dimension is derived from a channel id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_yaml::Value", into = "serde_yaml::Value")]
pub enum TagSpec {
    /// The channel id itself (`id`)
    Id,

    /// An integer index in `0..n` (a positive number)
    Cardinality(u64),

    /// One entry of an explicit, non-empty list
    Values(Vec<Value>),
}

impl TagSpec {
    /// Number of distinct values, `None` for [`TagSpec::Id`].
    pub fn cardinality(&self) -> Option<u64> {
        match self {
            TagSpec::Id => None,
            TagSpec::Cardinality(n) => Some(*n),
            TagSpec::Values(values) => Some(values.len() as u64),
        }
    }

    /// The value at `index` of this dimension.
    ///
    /// `index` must be below [`TagSpec::cardinality`]. For [`TagSpec::Id`]
    /// the index is returned as the value.
    pub fn value_at(&self, index: u64) -> Value {
        match self {
            TagSpec::Id | TagSpec::Cardinality(_) => Value::Int(index as i64),
            TagSpec::Values(values) => values[index as usize].clone(),
        }
    }
}

impl TryFrom<serde_yaml::Value> for TagSpec {
    type Error = String;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        match value {
            serde_yaml::Value::String(s) if s.eq_ignore_ascii_case("id") => Ok(TagSpec::Id),
            serde_yaml::Value::Number(n) => match n.as_u64() {
                Some(0) | None => Err(format!(
                    "tag cardinality must be a positive integer, got {n}"
                )),
                Some(count) => Ok(TagSpec::Cardinality(count)),
            },
            serde_yaml::Value::Sequence(items) => {
                if items.is_empty() {
                    return Err("tag value list must not be empty".to_string());
                }
                items
                    .iter()
                    .map(|item| {
                        Value::from_yaml(item)
                            .ok_or_else(|| format!("tag values must be scalars, got {item:?}"))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(TagSpec::Values)
            }
            other => Err(format!(
                "tag must be `id`, a cardinality or a value list, got {other:?}"
            )),
        }
    }
}

impl From<TagSpec> for serde_yaml::Value {
    fn from(spec: TagSpec) -> Self {
        match spec {
            TagSpec::Id => serde_yaml::Value::String("id".to_string()),
            TagSpec::Cardinality(n) => serde_yaml::Value::Number(n.into()),
            TagSpec::Values(values) => serde_yaml::Value::Sequence(
                values
                    .into_iter()
                    .map(|v| serde_yaml::to_value(v).unwrap_or(serde_yaml::Value::Null))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// Field Definition
// ============================================================================

/// Raw field declaration: the simulator kind plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Simulator kind (`FLOAT`, `BOOL`, ...)
    #[serde(rename = "type")]
    pub kind: String,

    /// Remaining keys, interpreted by the simulator for `kind`
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_yaml::Value>,
}

impl FieldDefinition {
    /// The parameters as a YAML mapping, ready to deserialize into a typed
    /// parameter struct.
    pub fn params_value(&self) -> serde_yaml::Value {
        serde_yaml::Value::Mapping(
            self.params
                .iter()
                .map(|(k, v)| (serde_yaml::Value::String(k.clone()), v.clone()))
                .collect(),
        )
    }
}

// ============================================================================
// Channel Kinds and Schema
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct ChannelKindBody {
    #[serde(default)]
    tags: Mapping,
    #[serde(default)]
    fields: Mapping,
}

impl ChannelKindBody {
    fn into_kind(self, name: String) -> Result<ChannelKind, SchemaError> {
        let tags = ordered_entries(self.tags, |tag, value| {
            TagSpec::try_from(value).map_err(|reason| SchemaError::InvalidTag {
                tag: tag.to_string(),
                reason,
            })
        })?;
        let fields = ordered_entries(self.fields, |_, value| {
            Ok(serde_yaml::from_value::<FieldDefinition>(value)?)
        })?;
        Ok(ChannelKind { name, tags, fields })
    }
}

/// Entries of `mapping` in document order, values converted with `convert`.
fn ordered_entries<V>(
    mapping: Mapping,
    convert: impl Fn(&str, serde_yaml::Value) -> Result<V, SchemaError>,
) -> Result<Vec<(String, V)>, SchemaError> {
    mapping
        .into_iter()
        .map(|(key, value)| match key {
            serde_yaml::Value::String(name) => {
                let value = convert(&name, value)?;
                Ok((name, value))
            }
            other => Err(SchemaError::InvalidKey(format!("{other:?}"))),
        })
        .collect()
}

/// One kind of channel: its tag dimensions and measured fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelKind {
    /// Kind name (the table or measurement name)
    pub name: String,

    /// Tag dimensions in declaration order
    pub tags: Vec<(String, TagSpec)>,

    /// Fields in declaration order
    pub fields: Vec<(String, FieldDefinition)>,
}

impl ChannelKind {
    /// Number of distinct tag combinations, the product of all
    /// cardinalities.
    ///
    /// Returns `None` on overflow.
    pub fn combinations(&self) -> Option<u64> {
        self.tags
            .iter()
            .filter_map(|(_, spec)| spec.cardinality())
            .try_fold(1u64, |acc, n| acc.checked_mul(n))
    }

    /// Get all tag names.
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Get all field names.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// A full schema document.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSchema {
    /// Channel kinds in declaration order
    pub kinds: Vec<ChannelKind>,
}

impl SensorSchema {
    /// Load a schema from a YAML or JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a schema from a YAML or JSON string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let raw: Mapping = serde_yaml::from_str(yaml)?;
        if raw.is_empty() {
            return Err(SchemaError::Empty);
        }

        let kinds = ordered_entries(raw, |_, body| {
            Ok(serde_yaml::from_value::<ChannelKindBody>(body)?)
        })?
        .into_iter()
        .map(|(name, body)| body.into_kind(name))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { kinds })
    }

    /// Get a channel kind by name.
    pub fn get_kind(&self, name: &str) -> Option<&ChannelKind> {
        self.kinds.iter().find(|k| k.name == name)
    }

    /// Get the named kind, or the first declared kind when no name is given.
    pub fn resolve_kind(&self, name: Option<&str>) -> Result<&ChannelKind, SchemaError> {
        match name {
            Some(name) => self
                .get_kind(name)
                .ok_or_else(|| SchemaError::KindNotFound(name.to_string())),
            None => self.kinds.first().ok_or(SchemaError::Empty),
        }
    }

    /// Get all kind names.
    pub fn kind_names(&self) -> Vec<&str> {
        self.kinds.iter().map(|k| k.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_schema_yaml() -> &'static str {
        r#"
sensor_values:
  tags:
    plant: [A, B, C, D, E]
    line: 3
    sensor_id: id
  fields:
    temperature:
      type: FLOAT
      mean: 6.4
      min: 6.0
      max: 7.1
      stdev: 0.2
      variance: 0.03
      error_rate: 0.005
      error_length: 1.08
    button_pressed:
      type: BOOL
      true_ratio: 0.001
"#
    }

    #[test]
    fn test_parse_schema_keeps_declaration_order() {
        let schema = SensorSchema::from_yaml(test_schema_yaml()).unwrap();
        let kind = schema.resolve_kind(None).unwrap();

        assert_eq!(kind.name, "sensor_values");
        assert_eq!(kind.tag_names(), vec!["plant", "line", "sensor_id"]);
        assert_eq!(kind.field_names(), vec!["temperature", "button_pressed"]);
    }

    #[test]
    fn test_tag_specs() {
        let schema = SensorSchema::from_yaml(test_schema_yaml()).unwrap();
        let kind = schema.get_kind("sensor_values").unwrap();

        assert_eq!(kind.tags[0].1.cardinality(), Some(5));
        assert_eq!(kind.tags[0].1.value_at(4), Value::from("E"));
        assert_eq!(kind.tags[1].1, TagSpec::Cardinality(3));
        assert_eq!(kind.tags[2].1, TagSpec::Id);
        assert_eq!(kind.combinations(), Some(15));
    }

    #[test]
    fn test_field_params_are_kept_raw() {
        let schema = SensorSchema::from_yaml(test_schema_yaml()).unwrap();
        let kind = schema.get_kind("sensor_values").unwrap();
        let (name, field) = &kind.fields[1];

        assert_eq!(name, "button_pressed");
        assert_eq!(field.kind, "BOOL");
        assert_eq!(
            field.params.get("true_ratio").and_then(|v| v.as_f64()),
            Some(0.001)
        );
    }

    #[test]
    fn test_unknown_field_kind_parses() {
        let yaml = r#"
readings:
  tags:
    sensor_id: id
  fields:
    label:
      type: STRING
"#;
        let schema = SensorSchema::from_yaml(yaml).unwrap();
        assert_eq!(schema.kinds[0].fields[0].1.kind, "STRING");
    }

    #[test]
    fn test_json_schema() {
        let json = r#"{"readings": {"tags": {"line": ["L1", "L2"]}, "fields": {"on": {"type": "BOOL", "true_ratio": 0.5}}}}"#;
        let schema = SensorSchema::from_yaml(json).unwrap();

        assert_eq!(schema.kind_names(), vec!["readings"]);
        assert_eq!(schema.kinds[0].combinations(), Some(2));
    }

    #[test]
    fn test_invalid_tags_rejected() {
        for tags in ["line: 0", "line: []", "line: -3", "line: other", "line: [[1]]"] {
            let yaml = format!("readings:\n  tags:\n    {tags}\n");
            assert!(
                matches!(
                    SensorSchema::from_yaml(&yaml),
                    Err(SchemaError::InvalidTag { ref tag, .. }) if tag == "line"
                ),
                "expected `{tags}` to be rejected"
            );
        }
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let json = r#"{"readings": {"tags": {"line": 2, "line": 3}}}"#;
        assert!(SensorSchema::from_yaml(json).is_err());
    }

    #[test]
    fn test_non_string_key_rejected() {
        let yaml = "readings:\n  tags:\n    1: 3\n";
        assert!(matches!(
            SensorSchema::from_yaml(yaml),
            Err(SchemaError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_empty_schema() {
        assert!(matches!(
            SensorSchema::from_yaml("{}"),
            Err(SchemaError::Empty)
        ));
    }

    #[test]
    fn test_kind_not_found() {
        let schema = SensorSchema::from_yaml(test_schema_yaml()).unwrap();
        assert!(matches!(
            schema.resolve_kind(Some("nope")),
            Err(SchemaError::KindNotFound(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(test_schema_yaml().as_bytes()).unwrap();

        let schema = SensorSchema::from_file(file.path()).unwrap();
        assert_eq!(schema.kind_names(), vec!["sensor_values"]);
    }
}
