//! Online batch-size search.
//!
//! Every fast-mode worker owns one [`BatchSizeController`]. The worker asks
//! it for the next batch size, times the insert and feeds the duration back.
//! After `test_size` samples the controller compares the window's throughput
//! (rows per second) with the best window so far and moves its candidate:
//!
//! ```text
//!            better ──► adopt as best, keep walking in the same direction
//!   window ─┤
//!            worse  ──► decay α, turn around from the best size
//!                       └─ step·α < 100 ──► surveillance: hold the best size,
//!                                            sample 1000 inserts per window
//! ```
//!
//! A worse window seen in surveillance means the backend changed; the
//! controller takes that window as the new baseline and restarts the search
//! with α = 0.5.
//!
//! The candidate is always a positive multiple of `data_batch_size`, the
//! number of records generated per tick.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Candidate used when searching and no fixed size is configured.
pub const INITIAL_BATCH_SIZE: usize = 2500;

/// Default number of samples per decision.
pub const DEFAULT_TEST_SIZE: usize = 20;

/// Default distance between candidates at α = 1.
pub const DEFAULT_STEP_SIZE: usize = 500;

/// Samples per decision while in surveillance.
pub const SURVEILLANCE_TEST_SIZE: usize = 1000;

/// Effective step below which the search settles into surveillance.
pub const SURVEILLANCE_STEP_THRESHOLD: f64 = 100.0;

/// α after leaving surveillance.
pub const RESTART_ALPHA: f64 = 0.5;

/// Controller construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Fixed batch size; zero or negative enables the search.
    pub batch_size: i64,
    /// Records per generated tick; candidates are multiples of it.
    pub data_batch_size: usize,
    /// Whether the search may run at all.
    pub active: bool,
    /// Initial distance between candidates.
    pub step_size: usize,
    /// Samples per decision.
    pub test_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            batch_size: 0,
            data_batch_size: 1,
            active: true,
            step_size: DEFAULT_STEP_SIZE,
            test_size: DEFAULT_TEST_SIZE,
        }
    }
}

impl ControllerConfig {
    /// Set a fixed batch size (zero or negative searches).
    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the record granularity.
    pub fn with_data_batch_size(mut self, data_batch_size: usize) -> Self {
        self.data_batch_size = data_batch_size;
        self
    }

    /// Enable or disable the search.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set the initial step size.
    pub fn with_step_size(mut self, step_size: usize) -> Self {
        self.step_size = step_size;
        self
    }

    /// Set the samples per decision.
    pub fn with_test_size(mut self, test_size: usize) -> Self {
        self.test_size = test_size;
        self
    }
}

/// Search direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Increasing,
    Decreasing,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Increasing => 1.0,
            Direction::Decreasing => -1.0,
        }
    }

    fn reversed(self) -> Self {
        match self {
            Direction::Increasing => Direction::Decreasing,
            Direction::Decreasing => Direction::Increasing,
        }
    }
}

/// Statistics of one measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Batch size measured in this window
    pub size: usize,
    /// Number of samples recorded
    pub samples: usize,
    /// Mean insert duration in seconds
    pub avg_secs: f64,
    /// Rows per second, set when the window closes
    pub throughput: f64,
}

impl WindowStats {
    fn new(size: usize) -> Self {
        Self {
            size,
            samples: 0,
            avg_secs: 0.0,
            throughput: 0.0,
        }
    }

    fn push(&mut self, secs: f64) {
        self.samples += 1;
        self.avg_secs += (secs - self.avg_secs) / self.samples as f64;
    }

    fn close(&mut self) {
        self.throughput = if self.avg_secs > 0.0 {
            self.size as f64 / self.avg_secs
        } else {
            f64::INFINITY
        };
    }
}

/// Outcome of a closed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The window beat the best one and became the new best.
    Improved,
    /// The window was worse; the search turned around from the best size.
    Reversed,
    /// The window was worse and the step got too small; holding the best size.
    EnteredSurveillance,
    /// A worse window in surveillance; it became the baseline of a new search.
    LeftSurveillance,
}

/// Feedback-controlled batch size search owned by a single worker.
#[derive(Debug, Clone)]
pub struct BatchSizeController {
    auto_mode: bool,
    batch_size: usize,
    data_batch_size: usize,
    step_size: usize,
    alpha: f64,
    default_test_size: usize,
    test_size: usize,
    direction: Direction,
    surveillance: bool,
    current: WindowStats,
    best: Option<WindowStats>,
}

impl BatchSizeController {
    /// Create a controller.
    pub fn new(config: &ControllerConfig) -> Self {
        let data_batch_size = config.data_batch_size.max(1);
        let auto_mode = config.active && config.batch_size <= 0;
        let requested = if config.batch_size > 0 {
            config.batch_size as usize
        } else {
            INITIAL_BATCH_SIZE
        };
        let batch_size = round_to_multiple(requested as f64, data_batch_size);
        let test_size = config.test_size.max(1);

        Self {
            auto_mode,
            batch_size,
            data_batch_size,
            step_size: config.step_size.max(data_batch_size),
            alpha: 1.0,
            default_test_size: test_size,
            test_size,
            direction: Direction::Increasing,
            surveillance: false,
            current: WindowStats::new(batch_size),
            best: None,
        }
    }

    /// The batch size the worker should drain next.
    pub fn next_batch_size(&self) -> usize {
        self.batch_size
    }

    /// Record the duration of an insert of exactly [`next_batch_size`] rows.
    ///
    /// Returns the decision when this sample closed a window.
    ///
    /// [`next_batch_size`]: BatchSizeController::next_batch_size
    pub fn record(&mut self, duration: Duration) -> Option<Decision> {
        if !self.auto_mode {
            return None;
        }

        self.current.push(duration.as_secs_f64());
        if self.current.samples < self.test_size {
            return None;
        }

        let decision = self.decide();
        self.current = WindowStats::new(self.batch_size);
        Some(decision)
    }

    fn decide(&mut self) -> Decision {
        let mut current = self.current;
        current.close();

        let improved = self
            .best
            .map_or(true, |best| current.throughput > best.throughput);

        if improved {
            self.best = Some(current);
            self.advance_from(current.size);
            return Decision::Improved;
        }

        if self.surveillance {
            self.surveillance = false;
            self.test_size = self.default_test_size;
            self.alpha = RESTART_ALPHA;
            self.best = Some(current);
            self.advance_from(current.size);
            return Decision::LeftSurveillance;
        }

        let best_size = self.best.map_or(self.batch_size, |best| best.size);
        self.alpha -= self.alpha / 10.0;
        if self.step_size as f64 * self.alpha < SURVEILLANCE_STEP_THRESHOLD {
            self.surveillance = true;
            self.batch_size = best_size;
            self.test_size = SURVEILLANCE_TEST_SIZE;
            Decision::EnteredSurveillance
        } else {
            self.direction = self.direction.reversed();
            self.advance_from(best_size);
            Decision::Reversed
        }
    }

    /// Move the candidate one step away from `base` in the current direction.
    fn advance_from(&mut self, base: usize) {
        let granularity = self.data_batch_size as f64;
        let mut step = self.direction.sign() * self.alpha * self.step_size as f64;
        if step.abs() < granularity {
            step = granularity.copysign(step);
        }

        let target = ((base as f64 + step) / granularity).round() * granularity;
        self.batch_size = if target < granularity {
            self.direction = self.direction.reversed();
            self.data_batch_size
        } else {
            target as usize
        };
    }

    /// Whether the search is running.
    pub fn auto_mode(&self) -> bool {
        self.auto_mode
    }

    /// Current decay factor.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Samples needed to close the current window.
    pub fn test_size(&self) -> usize {
        self.test_size
    }

    /// Current search direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the controller is holding the best size.
    pub fn in_surveillance(&self) -> bool {
        self.surveillance
    }

    /// The window being filled.
    pub fn current(&self) -> &WindowStats {
        &self.current
    }

    /// The best closed window since the last reset.
    pub fn best(&self) -> Option<&WindowStats> {
        self.best.as_ref()
    }
}

/// Round to the nearest positive multiple of `granularity`.
fn round_to_multiple(value: f64, granularity: usize) -> usize {
    let g = granularity as f64;
    let rounded = (value / g).round() * g;
    if rounded < g {
        granularity
    } else {
        rounded as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auto(data_batch_size: usize, step_size: usize, test_size: usize) -> BatchSizeController {
        BatchSizeController::new(
            &ControllerConfig::default()
                .with_data_batch_size(data_batch_size)
                .with_step_size(step_size)
                .with_test_size(test_size),
        )
    }

    /// Single throughput peak of 10k rows/s at 6000 rows.
    fn throughput(size: usize) -> f64 {
        let offset = size as f64 - 6_000.0;
        (10_000.0 - offset * offset / 10_000.0).max(100.0)
    }

    fn latency(size: usize) -> Duration {
        Duration::from_secs_f64(size as f64 / throughput(size))
    }

    /// Feed a whole window at the current candidate.
    fn run_window(controller: &mut BatchSizeController, duration: Duration) -> Decision {
        loop {
            if let Some(decision) = controller.record(duration) {
                return decision;
            }
        }
    }

    #[test]
    fn test_fixed_size_is_static() {
        let mut controller =
            BatchSizeController::new(&ControllerConfig::default().with_batch_size(1_000));

        assert!(!controller.auto_mode());
        assert_eq!(controller.next_batch_size(), 1_000);
        for _ in 0..100 {
            assert_eq!(controller.record(Duration::from_millis(5)), None);
        }
        assert_eq!(controller.next_batch_size(), 1_000);
    }

    #[test]
    fn test_inactive_uses_initial_default() {
        let controller = BatchSizeController::new(&ControllerConfig::default().with_active(false));

        assert!(!controller.auto_mode());
        assert_eq!(controller.next_batch_size(), INITIAL_BATCH_SIZE);
    }

    #[test]
    fn test_auto_mode_defaults() {
        let controller = auto(1, 500, 20);

        assert!(controller.auto_mode());
        assert_eq!(controller.next_batch_size(), INITIAL_BATCH_SIZE);
        assert_eq!(controller.direction(), Direction::Increasing);
        assert_eq!(controller.alpha(), 1.0);
        assert!(!controller.in_surveillance());
    }

    #[test]
    fn test_candidate_is_positive_multiple() {
        for data_batch_size in [1usize, 7, 100, 1_000, 2_500] {
            for fixed in [-5i64, 0, 1, 49, 150, 2_501, 10_000] {
                let mut controller = BatchSizeController::new(
                    &ControllerConfig::default()
                        .with_batch_size(fixed)
                        .with_data_batch_size(data_batch_size)
                        .with_step_size(300)
                        .with_test_size(3),
                );

                for i in 0..600u64 {
                    let size = controller.next_batch_size();
                    assert!(size >= data_batch_size, "size {size} below {data_batch_size}");
                    assert_eq!(size % data_batch_size, 0, "size {size} not a multiple");

                    let millis = (i * 7_919) % 13 + 1;
                    controller.record(Duration::from_millis(millis));
                }
            }
        }
    }

    #[test]
    fn test_decision_fires_on_test_size_samples() {
        let mut controller = auto(1, 500, 20);

        for _ in 0..19 {
            assert_eq!(controller.record(Duration::from_millis(10)), None);
        }
        assert_eq!(controller.current().samples, 19);
        assert_eq!(
            controller.record(Duration::from_millis(10)),
            Some(Decision::Improved)
        );
        assert_eq!(controller.current().samples, 0);
        assert_eq!(controller.current().size, 3_000);
        assert_eq!(controller.best().map(|b| b.size), Some(2_500));
    }

    #[test]
    fn test_small_step_clamped_to_granularity() {
        let mut controller = auto(1_000, 500, 1);

        // 2500 rounds to the nearest multiple of 1000.
        assert_eq!(controller.next_batch_size(), 3_000);
        controller.record(Duration::from_secs(1));
        assert_eq!(controller.next_batch_size(), 4_000);
    }

    #[test]
    fn test_worse_window_reverses_from_best() {
        let mut controller = auto(100, 500, 1);

        assert_eq!(
            run_window(&mut controller, Duration::from_secs(1)),
            Decision::Improved
        );
        assert_eq!(controller.next_batch_size(), 3_000);

        // 3000 rows in 10s is far worse than 2500 rows in 1s.
        assert_eq!(
            run_window(&mut controller, Duration::from_secs(10)),
            Decision::Reversed
        );
        assert_eq!(controller.direction(), Direction::Decreasing);
        assert!((controller.alpha() - 0.9).abs() < 1e-12);
        // 2500 - 0.9 * 500 = 2050, rounded to 2100.
        assert_eq!(controller.next_batch_size(), 2_100);
        assert_eq!(controller.best().map(|b| b.size), Some(2_500));
    }

    #[test]
    fn test_floor_flips_direction() {
        let mut controller = auto(100, 500, 1);
        controller.direction = Direction::Decreasing;

        controller.advance_from(200);

        assert_eq!(controller.next_batch_size(), 100);
        assert_eq!(controller.direction(), Direction::Increasing);
    }

    #[test]
    fn test_surveillance_cycle() {
        let mut controller = auto(100, 100, 2);

        assert_eq!(
            run_window(&mut controller, Duration::from_secs(1)),
            Decision::Improved
        );
        assert_eq!(controller.next_batch_size(), 2_600);

        // step * α = 90 < 100 after the first miss.
        assert_eq!(
            run_window(&mut controller, Duration::from_secs(2)),
            Decision::EnteredSurveillance
        );
        assert!(controller.in_surveillance());
        assert_eq!(controller.test_size(), SURVEILLANCE_TEST_SIZE);
        assert_eq!(controller.next_batch_size(), 2_500);

        for _ in 0..SURVEILLANCE_TEST_SIZE - 1 {
            assert_eq!(controller.record(Duration::from_secs(2)), None);
        }
        assert_eq!(
            controller.record(Duration::from_secs(2)),
            Some(Decision::LeftSurveillance)
        );

        assert!(!controller.in_surveillance());
        assert_eq!(controller.test_size(), 2);
        assert_eq!(controller.alpha(), RESTART_ALPHA);
        // The worse window is the new baseline.
        let best = controller.best().unwrap();
        assert_eq!(best.size, 2_500);
        assert!((best.throughput - 1_250.0).abs() < 1e-9);
        // 0.5 * 100 is below the granularity, so the step is one multiple.
        assert_eq!(controller.next_batch_size(), 2_600);
    }

    #[test]
    fn test_converges_to_peak() {
        let mut controller = auto(100, 500, 5);
        let mut windows = 0;

        while !controller.in_surveillance() {
            let size = controller.next_batch_size();
            assert_eq!(size % 100, 0);
            run_window(&mut controller, latency(size));
            windows += 1;
            assert!(windows <= 60, "no convergence after {windows} windows");
        }

        assert_eq!(controller.next_batch_size(), 6_000);
        assert_eq!(controller.best().map(|b| b.size), Some(6_000));
    }
}
