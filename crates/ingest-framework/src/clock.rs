//! Tick timestamps.

use chrono::Utc;
use std::time::Duration;

/// Current wall time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Round an epoch-millisecond timestamp down to a multiple of `interval`.
///
/// A zero interval leaves the timestamp unchanged.
pub fn round_down(timestamp_ms: i64, interval: Duration) -> i64 {
    let step = interval.as_millis() as i64;
    if step <= 0 {
        timestamp_ms
    } else {
        timestamp_ms - timestamp_ms.rem_euclid(step)
    }
}

/// Synthetic clock for fast mode.
///
/// Starts at wall time rounded down to the tick interval and advances one
/// interval per tick, independent of how fast ticks are generated.
#[derive(Debug, Clone)]
pub struct TickClock {
    next_ms: i64,
    step_ms: i64,
}

impl TickClock {
    /// Start a clock at the current wall time.
    pub fn start(interval: Duration) -> Self {
        Self::starting_at(now_millis(), interval)
    }

    /// Start a clock at an explicit epoch-millisecond timestamp.
    pub fn starting_at(timestamp_ms: i64, interval: Duration) -> Self {
        Self {
            next_ms: round_down(timestamp_ms, interval),
            step_ms: interval.as_millis() as i64,
        }
    }

    /// Timestamp of the next tick; advances the clock.
    pub fn tick(&mut self) -> i64 {
        let current = self.next_ms;
        self.next_ms += self.step_ms;
        current
    }

    /// Timestamp the next call to [`TickClock::tick`] returns.
    pub fn peek(&self) -> i64 {
        self.next_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_down() {
        let interval = Duration::from_millis(1000);
        assert_eq!(round_down(12_345, interval), 12_000);
        assert_eq!(round_down(12_000, interval), 12_000);
        assert_eq!(round_down(-1, interval), -1_000);
        assert_eq!(round_down(12_345, Duration::ZERO), 12_345);
    }

    #[test]
    fn test_tick_clock_advances_one_interval() {
        let mut clock = TickClock::starting_at(1_700_000_000_123, Duration::from_millis(100));

        assert_eq!(clock.tick(), 1_700_000_000_100);
        assert_eq!(clock.tick(), 1_700_000_000_200);
        assert_eq!(clock.peek(), 1_700_000_000_300);
    }

    #[test]
    fn test_clock_starts_near_now() {
        let before = now_millis();
        let mut clock = TickClock::start(Duration::from_secs(1));
        let first = clock.tick();

        assert_eq!(first % 1_000, 0);
        assert!(first <= before + 1_000 && first > before - 2_000);
    }
}
