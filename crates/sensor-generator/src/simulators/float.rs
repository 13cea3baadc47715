//! Float simulator: a bounded, mean-reverting random walk with excursions.
//!
//! Normal values drift by a uniform step of at most `variance`. The farther
//! the walk is from `mean`, measured against `50 * stdev`, the more likely
//! the next step heads back toward it.
//!
//! With probability `error_rate` the simulator starts an error streak: it
//! jumps to the opposite side of the mean, beyond one `stdev`, and keeps
//! wandering there. A streak lasts about `error_length` values, after which
//! the walk resumes from the last normal value. For small rates the realized
//! error frequency is close to `error_rate * error_length`.

use rand::Rng;
use serde::Deserialize;

/// Probability floor for continuing an error streak once its length is used up.
pub const MIN_STREAK_ERROR_RATE: f64 = 0.01;

/// Distance from the mean, in multiples of `stdev`, at which a step is
/// certain to head back toward the mean.
const REVERSION_SPAN: f64 = 50.0;

/// Parameters of a `FLOAT` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FloatParams {
    /// Center of the walk
    pub mean: f64,
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
    /// Expected spread around the mean
    pub stdev: f64,
    /// Maximum change between two consecutive values
    pub variance: f64,
    /// Probability of starting an error streak
    #[serde(default)]
    pub error_rate: f64,
    /// Expected number of values in an error streak
    #[serde(default)]
    pub error_length: f64,
}

impl FloatParams {
    /// Check parameter consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.min > self.max {
            return Err(format!("min ({}) is greater than max ({})", self.min, self.max));
        }
        if !(self.min..=self.max).contains(&self.mean) {
            return Err(format!(
                "mean ({}) is outside [{}, {}]",
                self.mean, self.min, self.max
            ));
        }
        if self.stdev < 0.0 || self.variance < 0.0 {
            return Err("stdev and variance must not be negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(format!("error_rate must be in [0, 1], got {}", self.error_rate));
        }
        if self.error_length < 0.0 {
            return Err("error_length must not be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorSide {
    Below,
    Above,
}

/// Stateful float value generator.
#[derive(Debug, Clone)]
pub struct FloatSimulator {
    params: FloatParams,
    value: f64,
    value_count: u64,
    error_count: u64,
    in_error: bool,
    error_side: ErrorSide,
    last_normal_value: f64,
    error_rate: f64,
    error_length: f64,
}

impl FloatSimulator {
    /// Create a simulator starting at `params.mean`.
    pub fn new(params: FloatParams) -> Self {
        Self {
            value: params.mean,
            value_count: 0,
            error_count: 0,
            in_error: false,
            error_side: ErrorSide::Above,
            last_normal_value: params.mean,
            error_rate: params.error_rate,
            error_length: params.error_length,
            params,
        }
    }

    /// The parameters this simulator was built from.
    pub fn params(&self) -> &FloatParams {
        &self.params
    }

    /// The most recent value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Number of normal values produced.
    pub fn value_count(&self) -> u64 {
        self.value_count
    }

    /// Number of error values produced.
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Whether the last value belonged to an error streak.
    pub fn in_error(&self) -> bool {
        self.in_error
    }

    /// Produce the next value.
    pub fn next_value<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        if self.in_error {
            self.error_length = (self.error_length - 1.0).max(0.0);
            self.error_rate = self.error_length.clamp(MIN_STREAK_ERROR_RATE, 1.0);
        }

        let is_error = self.error_rate > 0.0 && rng.gen_bool(self.error_rate);
        if is_error {
            self.next_error_value(rng);
        } else {
            self.next_normal_value(rng);
        }
        self.value
    }

    fn next_normal_value<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.in_error {
            self.in_error = false;
            self.value = self.last_normal_value;
            self.error_rate = self.params.error_rate;
            self.error_length = self.params.error_length;
        }

        let change = uniform(rng, 0.0, self.params.variance);
        let distance = self.params.mean - self.value;
        let span = REVERSION_SPAN * self.params.stdev;
        let pull = if span > 0.0 {
            (distance.abs() / span).min(1.0)
        } else if distance != 0.0 {
            1.0
        } else {
            0.0
        };

        let toward_mean = rng.gen_bool(0.5 + 0.5 * pull);
        let sign = if distance >= 0.0 { 1.0 } else { -1.0 };
        let step = if toward_mean { sign * change } else { -sign * change };

        self.value = (self.value + step).clamp(self.params.min, self.params.max);
        self.value_count += 1;
    }

    fn next_error_value<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.in_error {
            self.in_error = true;
            self.last_normal_value = self.value;
            self.error_side = if self.value >= self.params.mean {
                ErrorSide::Below
            } else {
                ErrorSide::Above
            };
            let (low, high) = self.error_bounds();
            self.value = uniform(rng, low, high);
        } else {
            let (low, high) = self.error_bounds();
            let change = uniform(rng, 0.0, self.params.variance);
            let step = if rng.gen_bool(0.5) { change } else { -change };
            self.value = (self.value + step).clamp(low, high);
        }
        self.error_count += 1;
    }

    fn error_bounds(&self) -> (f64, f64) {
        let p = &self.params;
        match self.error_side {
            ErrorSide::Below => (p.min, (p.mean - p.stdev).max(p.min)),
            ErrorSide::Above => ((p.mean + p.stdev).min(p.max), p.max),
        }
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if high > low {
        rng.gen_range(low..=high)
    } else {
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(error_rate: f64, error_length: f64) -> FloatParams {
        FloatParams {
            mean: 5.0,
            min: 4.0,
            max: 6.0,
            stdev: 0.2,
            variance: 0.012,
            error_rate,
            error_length,
        }
    }

    fn mean_and_stdev(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    #[test]
    fn test_counts_match_calls() {
        let mut sim = FloatSimulator::new(params(0.05, 3.0));
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..5_000 {
            sim.next_value(&mut rng);
        }

        assert_eq!(sim.value_count() + sim.error_count(), 5_000);
        assert!(sim.error_count() > 0);
    }

    #[test]
    fn test_values_stay_within_bounds() {
        let mut sim = FloatSimulator::new(params(0.02, 2.0));
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..20_000 {
            let v = sim.next_value(&mut rng);
            assert!((4.0..=6.0).contains(&v), "value {v} out of bounds");
        }
    }

    #[test]
    fn test_statistics_match_configuration() {
        let config = params(0.005, 1.0);
        let mut sim = FloatSimulator::new(config.clone());
        let mut rng = StdRng::seed_from_u64(42);

        let values: Vec<f64> = (0..100_000).map(|_| sim.next_value(&mut rng)).collect();
        let error_frequency = sim.error_count() as f64 / values.len() as f64;
        let (mean, stdev) = mean_and_stdev(&values);

        assert!(
            (error_frequency - config.error_rate).abs() <= 0.001,
            "error frequency {error_frequency}"
        );
        assert!((mean - config.mean).abs() <= 0.3, "mean {mean}");
        assert!((stdev - config.stdev).abs() <= 0.15, "stdev {stdev}");
    }

    #[test]
    fn test_error_value_on_opposite_side() {
        let mut sim = FloatSimulator::new(FloatParams {
            variance: 0.0,
            ..params(1.0, 1.0)
        });
        let mut rng = StdRng::seed_from_u64(3);

        // Starts at the mean, so the first excursion goes below it.
        let first = sim.next_value(&mut rng);
        assert!(sim.in_error());
        assert!((4.0..=4.8).contains(&first), "first error value {first}");
    }

    #[test]
    fn test_recovery_resumes_last_normal_value() {
        let mut sim = FloatSimulator::new(FloatParams {
            variance: 0.0,
            ..params(0.0, 0.0)
        });
        let mut rng = StdRng::seed_from_u64(3);

        // Force a streak, then let it end.
        sim.error_rate = 1.0;
        sim.next_value(&mut rng);
        assert!(sim.in_error());

        let mut recovered = None;
        for _ in 0..10_000 {
            let v = sim.next_value(&mut rng);
            if !sim.in_error() {
                recovered = Some(v);
                break;
            }
        }

        assert_eq!(recovered, Some(5.0));
        assert_eq!(sim.error_rate, 0.0);
    }

    #[test]
    fn test_streak_length_follows_error_length() {
        let mut sim = FloatSimulator::new(params(0.0, 4.0));
        let mut rng = StdRng::seed_from_u64(11);

        sim.error_rate = 1.0;
        sim.next_value(&mut rng);
        for _ in 0..3 {
            sim.next_value(&mut rng);
            assert!(sim.in_error());
        }
        assert_eq!(sim.error_count(), 4);
    }

    #[test]
    fn test_validate() {
        assert!(params(0.0, 0.0).validate().is_ok());
        assert!(FloatParams { min: 7.0, ..params(0.0, 0.0) }.validate().is_err());
        assert!(FloatParams { mean: 9.0, ..params(0.0, 0.0) }.validate().is_err());
        assert!(params(1.5, 0.0).validate().is_err());
        assert!(params(0.1, -1.0).validate().is_err());
    }
}
