//! A clock tests can move by hand.

use std::sync::atomic::{AtomicI64, Ordering};

use acpe_core::{Clock, HOUR_MILLIS};

/// Manually driven [`Clock`]. Time only changes when a test says so.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `start` (Unix millis).
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Move forward by `millis`.
    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    /// Move forward by whole hours.
    pub fn advance_hours(&self, hours: i64) {
        self.advance(hours * HOUR_MILLIS);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);
        assert_eq!(clock.now_millis(), 1_000);

        clock.advance(500);
        assert_eq!(clock.now_millis(), 1_500);

        clock.advance_hours(1);
        assert_eq!(clock.now_millis(), 1_500 + HOUR_MILLIS);

        clock.set(0);
        assert_eq!(clock.now_millis(), 0);
    }
}
