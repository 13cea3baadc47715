//! Cooperative stop and abort signals.

use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot flags shared by the generator and the workers.
///
/// `stop` means "no more ticks will be generated, drain the queue".
/// `abort` means "a fatal error happened, exit now without draining".
/// Both are checked at loop heads; an in-flight backend call is never
/// interrupted.
#[derive(Debug, Default)]
pub struct Shutdown {
    stop: AtomicBool,
    abort: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the generator to stop after the current tick.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Abort the run; also implies stop.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Release);
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_implies_stop() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_stopped());

        shutdown.abort();
        assert!(shutdown.is_stopped());
        assert!(shutdown.is_aborted());
    }

    #[test]
    fn test_stop_does_not_abort() {
        let shutdown = Shutdown::new();
        shutdown.request_stop();

        assert!(shutdown.is_stopped());
        assert!(!shutdown.is_aborted());
    }
}
