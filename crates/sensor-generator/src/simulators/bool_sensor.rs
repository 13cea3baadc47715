//! Boolean sensor for rare events such as button presses.

use rand::Rng;

/// Produces `true` roughly once every `1 / true_ratio` calls.
#[derive(Debug, Clone)]
pub struct BoolSensor {
    true_ratio: f64,
    modulus: u64,
}

impl BoolSensor {
    /// Create a sensor with the given ratio of `true` values.
    ///
    /// Ratios at or below zero never produce `true`; ratios at or above one
    /// always do.
    pub fn new(true_ratio: f64) -> Self {
        let modulus = if true_ratio > 0.0 {
            (1.0 / true_ratio).round().max(1.0) as u64
        } else {
            0
        };
        Self {
            true_ratio,
            modulus,
        }
    }

    /// The configured ratio.
    pub fn true_ratio(&self) -> f64 {
        self.true_ratio
    }

    /// Produce the next value.
    pub fn next_value<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        match self.modulus {
            0 => false,
            n => rng.gen_range(0..n) == 0,
        }
    }
}
