//! Channels: one simulated data source producing one record per tick.

use crate::simulators::FieldSimulator;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sensor_core::{ChannelKind, Record, SchemaError, TagSpec, Value};
use std::ops::RangeInclusive;

/// Error type for channel construction.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Field declares a kind no simulator exists for
    #[error("Unsupported type '{kind}' for field '{field}'")]
    UnsupportedFieldType { field: String, kind: String },

    /// Field parameters are missing or inconsistent
    #[error("Invalid parameters for field '{field}': {reason}")]
    InvalidFieldParameters { field: String, reason: String },

    /// Tag dimension has no values to choose from
    #[error("Tag '{0}' has no values")]
    EmptyTagDimension(String),

    /// Channel ids start at 1
    #[error("Invalid channel id {0}, ids start at 1")]
    InvalidChannelId(u64),

    /// Schema error
    #[error("Schema error: {0}")]
    SchemaError(#[from] SchemaError),
}

/// Assign tag values to a channel id.
///
/// Dimensions are processed from the last declared to the first with a
/// running radix, so the last declared dimension varies fastest. Ids in
/// `1..=product of cardinalities` enumerate every combination exactly once;
/// `id` dimensions receive the id itself and do not take part in the
/// decomposition.
pub fn assign_tags(id: u64, tags: &[(String, TagSpec)]) -> Vec<(String, Value)> {
    let offset = id.saturating_sub(1);
    let mut values = vec![Value::Int(0); tags.len()];
    let mut radix: u64 = 1;

    for (position, (_, spec)) in tags.iter().enumerate().rev() {
        values[position] = match spec.cardinality() {
            None => Value::Int(id as i64),
            Some(n) => {
                let index = (offset / radix) % n;
                radix = radix.saturating_mul(n);
                spec.value_at(index)
            }
        };
    }

    tags.iter()
        .map(|(name, _)| name.clone())
        .zip(values)
        .collect()
}

/// Derive the RNG seed of a channel from the run seed and its id.
fn channel_seed(seed: u64, id: u64) -> u64 {
    seed.wrapping_add(id.wrapping_mul(0x9E3779B97F4A7C15))
}

/// One simulated data source.
///
/// The tag part of the record is computed on first use and cached; every
/// call to [`Channel::next_record`] overwrites the field values and returns
/// a copy.
#[derive(Debug, Clone)]
pub struct Channel {
    id: u64,
    tags: Vec<(String, TagSpec)>,
    simulators: Vec<(String, FieldSimulator)>,
    rng: StdRng,
    cached: Option<Record>,
}

impl Channel {
    /// Build a channel of the given kind.
    pub fn new(id: u64, kind: &ChannelKind, seed: u64) -> Result<Self, GeneratorError> {
        if id == 0 {
            return Err(GeneratorError::InvalidChannelId(id));
        }
        if let Some((name, _)) = kind
            .tags
            .iter()
            .find(|(_, spec)| spec.cardinality() == Some(0))
        {
            return Err(GeneratorError::EmptyTagDimension(name.clone()));
        }

        let simulators = kind
            .fields
            .iter()
            .map(|(name, definition)| {
                FieldSimulator::from_definition(name, definition).map(|sim| (name.clone(), sim))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            tags: kind.tags.clone(),
            simulators,
            rng: StdRng::seed_from_u64(channel_seed(seed, id)),
            cached: None,
        })
    }

    /// The channel id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Tag values of this channel.
    pub fn tag_values(&self) -> Vec<(String, Value)> {
        assign_tags(self.id, &self.tags)
    }

    /// The field simulators, in declaration order.
    pub fn simulators(&self) -> &[(String, FieldSimulator)] {
        &self.simulators
    }

    /// Advance every simulator once and return the new record.
    pub fn next_record(&mut self) -> Record {
        let id = self.id;
        let tags = &self.tags;
        let simulators = &mut self.simulators;

        let record = self.cached.get_or_insert_with(|| {
            let fields = simulators
                .iter()
                .map(|(name, _)| (name.clone(), Value::Bool(false)))
                .collect();
            Record::new(id, assign_tags(id, tags), fields)
        });

        for ((_, slot), (_, simulator)) in record.fields.iter_mut().zip(simulators.iter_mut()) {
            *slot = simulator.next_value(&mut self.rng);
        }

        record.clone()
    }
}

/// Build one channel per id in `ids`.
pub fn build_channels(
    kind: &ChannelKind,
    ids: RangeInclusive<u64>,
    seed: u64,
) -> Result<Vec<Channel>, GeneratorError> {
    ids.map(|id| Channel::new(id, kind, seed)).collect()
}
