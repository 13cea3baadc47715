//! Rolling insert timing statistics.
//!
//! Workers send one [`InsertSample`] per successful insert over an unbounded
//! channel. The statistics loop logs the window every `stat_delta`, clears
//! it, and exits once every sender is gone.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// Timing of one successful insert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertSample {
    pub worker: usize,
    pub records: usize,
    pub duration: Duration,
}

/// Aggregated insert timings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertTimings {
    /// Number of inserts
    pub inserts: u64,
    /// Records inserted
    pub records: u64,
    /// Sum of insert durations in seconds
    pub total_secs: f64,
    /// Shortest insert in seconds
    pub min_secs: f64,
    /// Longest insert in seconds
    pub max_secs: f64,
    /// Statistics windows flushed with at least one insert
    pub windows: u64,
}

impl InsertTimings {
    pub fn push(&mut self, sample: &InsertSample) {
        let secs = sample.duration.as_secs_f64();
        if self.inserts == 0 || secs < self.min_secs {
            self.min_secs = secs;
        }
        if secs > self.max_secs {
            self.max_secs = secs;
        }
        self.inserts += 1;
        self.records += sample.records as u64;
        self.total_secs += secs;
    }

    pub fn merge(&mut self, other: &InsertTimings) {
        if other.inserts == 0 {
            return;
        }
        if self.inserts == 0 || other.min_secs < self.min_secs {
            self.min_secs = other.min_secs;
        }
        self.max_secs = self.max_secs.max(other.max_secs);
        self.inserts += other.inserts;
        self.records += other.records;
        self.total_secs += other.total_secs;
        self.windows += other.windows;
    }

    /// Mean insert duration in seconds.
    pub fn mean_secs(&self) -> f64 {
        if self.inserts > 0 {
            self.total_secs / self.inserts as f64
        } else {
            0.0
        }
    }

    /// Mean records per insert.
    pub fn mean_batch(&self) -> f64 {
        if self.inserts > 0 {
            self.records as f64 / self.inserts as f64
        } else {
            0.0
        }
    }
}

/// Run the statistics loop until every sender is dropped.
///
/// The window is flushed once `stat_delta` has passed, whether the deadline
/// expired idle or a sample arrived after it. Returns the timings of the
/// whole run.
pub fn run_stats_loop(samples: Receiver<InsertSample>, stat_delta: Duration) -> InsertTimings {
    let mut total = InsertTimings::default();
    let mut window = InsertTimings::default();
    let mut window_start = Instant::now();

    loop {
        let deadline = window_start + stat_delta;
        match samples.recv_deadline(deadline) {
            Ok(sample) => {
                window.push(&sample);
                if Instant::now() < deadline {
                    continue;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                close_window(&mut total, &window, window_start.elapsed());
                return total;
            }
        }
        close_window(&mut total, &window, window_start.elapsed());
        window = InsertTimings::default();
        window_start = Instant::now();
    }
}

fn close_window(total: &mut InsertTimings, window: &InsertTimings, elapsed: Duration) {
    if window.inserts > 0 {
        flush(window, elapsed);
        total.windows += 1;
    }
    total.merge(window);
}

fn flush(window: &InsertTimings, elapsed: Duration) {
    if window.inserts == 0 {
        return;
    }
    let secs = elapsed.as_secs_f64();
    let rows_per_second = if secs > 0.0 {
        window.records as f64 / secs
    } else {
        0.0
    };
    info!(
        "Inserts: {} ({} records, {:.0} rows/s), avg batch {:.1}, avg {:.2} ms, min {:.2} ms, max {:.2} ms",
        window.inserts,
        window.records,
        rows_per_second,
        window.mean_batch(),
        window.mean_secs() * 1000.0,
        window.min_secs * 1000.0,
        window.max_secs * 1000.0,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn sample(records: usize, millis: u64) -> InsertSample {
        InsertSample {
            worker: 0,
            records,
            duration: Duration::from_millis(millis),
        }
    }

    #[test]
    fn test_timings_track_extremes() {
        let mut timings = InsertTimings::default();
        timings.push(&sample(10, 20));
        timings.push(&sample(30, 5));
        timings.push(&sample(20, 50));

        assert_eq!(timings.inserts, 3);
        assert_eq!(timings.records, 60);
        assert!((timings.min_secs - 0.005).abs() < 1e-9);
        assert!((timings.max_secs - 0.050).abs() < 1e-9);
        assert!((timings.mean_batch() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_empty_keeps_minimum() {
        let mut total = InsertTimings::default();
        total.merge(&InsertTimings::default());
        assert_eq!(total.inserts, 0);

        let mut window = InsertTimings::default();
        window.push(&sample(1, 7));
        total.merge(&window);
        assert!((total.min_secs - 0.007).abs() < 1e-9);
    }

    #[test]
    fn test_loop_flushes_while_flooded() {
        let (tx, rx) = unbounded();
        let handle = std::thread::spawn(move || run_stats_loop(rx, Duration::from_millis(20)));

        let run_for = Duration::from_millis(300);
        let senders: Vec<_> = (0..4)
            .map(|worker| {
                let tx = tx.clone();
                std::thread::spawn(move || {
                    let start = Instant::now();
                    let mut sent = 0u64;
                    while start.elapsed() < run_for {
                        tx.send(InsertSample {
                            worker,
                            records: 1,
                            duration: Duration::from_micros(10),
                        })
                        .unwrap();
                        sent += 1;
                    }
                    sent
                })
            })
            .collect();
        drop(tx);

        let sent: u64 = senders.into_iter().map(|s| s.join().unwrap()).sum();
        let totals = handle.join().unwrap();

        assert_eq!(totals.inserts, sent);
        assert!(totals.windows >= 5, "only {} windows flushed", totals.windows);
    }

    #[test]
    fn test_loop_returns_totals_on_disconnect() {
        let (tx, rx) = unbounded();
        let handle = std::thread::spawn(move || run_stats_loop(rx, Duration::from_millis(5)));

        for _ in 0..4 {
            tx.send(sample(25, 2)).unwrap();
            std::thread::sleep(Duration::from_millis(3));
        }
        drop(tx);

        let totals = handle.join().unwrap();
        assert_eq!(totals.inserts, 4);
        assert_eq!(totals.records, 100);
    }
}
