//! Stateful value simulators for channel fields.
//!
//! The field kind declared in the schema is resolved once, when the channel
//! is built, into a [`FieldSimulator`]. Unknown kinds are rejected there.

pub mod bool_sensor;
pub mod float;

pub use bool_sensor::BoolSensor;
pub use float::{FloatParams, FloatSimulator};

use crate::channel::GeneratorError;
use rand::Rng;
use sensor_core::{FieldDefinition, Value};
use serde::de::DeserializeOwned;

/// A resolved field simulator.
#[derive(Debug, Clone)]
pub enum FieldSimulator {
    /// `FLOAT` field
    Float(FloatSimulator),

    /// `BOOL` field
    Bool(BoolSensor),
}

impl FieldSimulator {
    /// Resolve a field declaration into its simulator.
    ///
    /// Kind names are matched case-insensitively.
    pub fn from_definition(name: &str, definition: &FieldDefinition) -> Result<Self, GeneratorError> {
        match definition.kind.to_ascii_uppercase().as_str() {
            "FLOAT" => {
                let params: FloatParams = parse_params(name, definition)?;
                params
                    .validate()
                    .map_err(|reason| GeneratorError::InvalidFieldParameters {
                        field: name.to_string(),
                        reason,
                    })?;
                Ok(FieldSimulator::Float(FloatSimulator::new(params)))
            }
            "BOOL" => {
                let params: BoolParams = parse_params(name, definition)?;
                if !(0.0..=1.0).contains(&params.true_ratio) {
                    return Err(GeneratorError::InvalidFieldParameters {
                        field: name.to_string(),
                        reason: format!("true_ratio must be in [0, 1], got {}", params.true_ratio),
                    });
                }
                Ok(FieldSimulator::Bool(BoolSensor::new(params.true_ratio)))
            }
            _ => Err(GeneratorError::UnsupportedFieldType {
                field: name.to_string(),
                kind: definition.kind.clone(),
            }),
        }
    }

    /// Produce the next value.
    pub fn next_value<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Value {
        match self {
            FieldSimulator::Float(sim) => Value::Float(sim.next_value(rng)),
            FieldSimulator::Bool(sensor) => Value::Bool(sensor.next_value(rng)),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct BoolParams {
    true_ratio: f64,
}

fn parse_params<T: DeserializeOwned>(
    name: &str,
    definition: &FieldDefinition,
) -> Result<T, GeneratorError> {
    serde_yaml::from_value(definition.params_value()).map_err(|e| {
        GeneratorError::InvalidFieldParameters {
            field: name.to_string(),
            reason: e.to_string(),
        }
    })
}
