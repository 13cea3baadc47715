//! Ingestion run configuration.

use crate::controller::{ControllerConfig, DEFAULT_STEP_SIZE, DEFAULT_TEST_SIZE};
use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

/// How generated ticks reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Workers insert as fast as the backend accepts, with adaptive batch sizes.
    Fast,
    /// One paced worker inserts one tick per interval, stamped with wall time.
    Consecutive,
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestMode::Fast => write!(f, "fast"),
            IngestMode::Consecutive => write!(f, "consecutive"),
        }
    }
}

impl FromStr for IngestMode {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(IngestMode::Fast),
            "consecutive" => Ok(IngestMode::Consecutive),
            other => Err(IngestError::Config(format!("unknown ingest mode '{other}'"))),
        }
    }
}

/// Configuration of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// First channel id (inclusive, at least 1)
    pub id_start: u64,
    /// Last channel id (inclusive)
    pub id_end: u64,
    /// Ingest mode
    pub mode: IngestMode,
    /// Number of ticks to generate; 0 runs until shutdown
    pub ingest_size: u64,
    /// Tick interval
    pub ingest_delta: Duration,
    /// Fixed batch size; zero or negative lets every worker search for one
    pub batch_size: i64,
    /// Initial step of the batch size search
    pub step_size: usize,
    /// Samples per batch size decision
    pub test_size: usize,
    /// Number of fast-mode workers
    pub concurrency: usize,
    /// Capacity of the tick queue, in ticks
    pub queue_capacity: usize,
    /// Interval between statistics flushes
    pub stat_delta: Duration,
    /// Seed for the channel simulators
    pub seed: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            id_start: 1,
            id_end: 1,
            mode: IngestMode::Fast,
            ingest_size: 0,
            ingest_delta: Duration::from_secs(1),
            batch_size: 0,
            step_size: DEFAULT_STEP_SIZE,
            test_size: DEFAULT_TEST_SIZE,
            concurrency: 4,
            queue_capacity: 1000,
            stat_delta: Duration::from_secs(10),
            seed: 42,
        }
    }
}

impl IngestConfig {
    /// Set the channel id range.
    pub fn with_ids(mut self, id_start: u64, id_end: u64) -> Self {
        self.id_start = id_start;
        self.id_end = id_end;
        self
    }

    /// Set the ingest mode.
    pub fn with_mode(mut self, mode: IngestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the number of ticks.
    pub fn with_ingest_size(mut self, ingest_size: u64) -> Self {
        self.ingest_size = ingest_size;
        self
    }

    /// Set the tick interval.
    pub fn with_ingest_delta(mut self, ingest_delta: Duration) -> Self {
        self.ingest_delta = ingest_delta;
        self
    }

    /// Set a fixed batch size.
    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the initial search step.
    pub fn with_step_size(mut self, step_size: usize) -> Self {
        self.step_size = step_size;
        self
    }

    /// Set the samples per decision.
    pub fn with_test_size(mut self, test_size: usize) -> Self {
        self.test_size = test_size;
        self
    }

    /// Set the number of workers.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the queue capacity.
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Set the statistics interval.
    pub fn with_stat_delta(mut self, stat_delta: Duration) -> Self {
        self.stat_delta = stat_delta;
        self
    }

    /// Set the simulator seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The channel ids of this run.
    pub fn ids(&self) -> RangeInclusive<u64> {
        self.id_start..=self.id_end
    }

    /// Records generated per tick.
    pub fn data_batch_size(&self) -> usize {
        self.id_end.saturating_sub(self.id_start).saturating_add(1) as usize
    }

    /// Controller parameters for one worker.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::default()
            .with_batch_size(self.batch_size)
            .with_data_batch_size(self.data_batch_size())
            .with_active(self.mode == IngestMode::Fast)
            .with_step_size(self.step_size)
            .with_test_size(self.test_size)
    }

    /// Check the configuration before any thread is started.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.id_start == 0 {
            return Err(IngestError::Config("channel ids start at 1".to_string()));
        }
        if self.id_end < self.id_start {
            return Err(IngestError::Config(format!(
                "id range {}..={} is empty",
                self.id_start, self.id_end
            )));
        }
        if self.concurrency == 0 {
            return Err(IngestError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(IngestError::Config(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        if self.test_size == 0 {
            return Err(IngestError::Config("test size must be at least 1".to_string()));
        }
        if self.mode == IngestMode::Consecutive && self.ingest_delta.is_zero() {
            return Err(IngestError::Config(
                "consecutive mode needs a non-zero tick interval".to_string(),
            ));
        }
        if self.stat_delta.is_zero() {
            return Err(IngestError::Config(
                "statistics interval must not be zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_batch_size_counts_ids() {
        let config = IngestConfig::default().with_ids(5, 19);
        assert_eq!(config.data_batch_size(), 15);
        assert_eq!(config.ids().count(), 15);
    }

    #[test]
    fn test_controller_config_follows_run() {
        let config = IngestConfig::default()
            .with_ids(1, 10)
            .with_batch_size(-1)
            .with_step_size(200)
            .with_test_size(5);

        let controller = config.controller_config();
        assert_eq!(controller.data_batch_size, 10);
        assert_eq!(controller.step_size, 200);
        assert_eq!(controller.test_size, 5);
        assert!(controller.active);

        let consecutive = config.with_mode(IngestMode::Consecutive).controller_config();
        assert!(!consecutive.active);
    }

    #[test]
    fn test_validate() {
        assert!(IngestConfig::default().validate().is_ok());
        assert!(IngestConfig::default().with_ids(0, 3).validate().is_err());
        assert!(IngestConfig::default().with_ids(4, 3).validate().is_err());
        assert!(IngestConfig::default().with_concurrency(0).validate().is_err());
        assert!(IngestConfig::default().with_queue_capacity(0).validate().is_err());
        assert!(IngestConfig::default()
            .with_mode(IngestMode::Consecutive)
            .with_ingest_delta(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("FAST".parse::<IngestMode>().unwrap(), IngestMode::Fast);
        assert_eq!(
            "consecutive".parse::<IngestMode>().unwrap(),
            IngestMode::Consecutive
        );
        assert!("burst".parse::<IngestMode>().is_err());
        assert_eq!(IngestMode::Consecutive.to_string(), "consecutive");
    }
}
