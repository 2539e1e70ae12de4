//! Time sources for the ledger
//!
//! The ledger never keeps its own notion of time. Every operation reads
//! "now" from an injected [`Clock`], so tests and the simulator can
//! fast-forward deterministically.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One hour in seconds
pub const HOUR: u64 = 3600;

/// One day in seconds
pub const DAY: u64 = 24 * HOUR;

/// Read-only source of the current unix time in seconds.
pub trait Clock {
    fn now(&self) -> u64;
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Pre-epoch system time is clamped to zero.
        Utc::now().timestamp().max(0) as u64
    }
}

/// Manually driven clock.
///
/// Clones share the same underlying time, so a handle kept by a test can
/// advance the clock owned by a ledger.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Move the clock to `timestamp`. Time never goes backwards, so an
    /// earlier timestamp is ignored.
    pub fn set(&self, timestamp: u64) {
        self.now.fetch_max(timestamp, Ordering::SeqCst);
    }

    /// Move the clock forward, saturating at `u64::MAX`.
    pub fn advance(&self, seconds: u64) {
        // The closure always returns Some, so the update cannot fail.
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(seconds))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();

        handle.advance(DAY);
        assert_eq!(clock.now(), 1_000 + DAY);
    }

    #[test]
    fn test_manual_clock_is_monotonic() {
        let clock = ManualClock::new(5_000);
        clock.set(4_000);
        assert_eq!(clock.now(), 5_000);

        clock.set(6_000);
        assert_eq!(clock.now(), 6_000);
    }

    #[test]
    fn test_manual_clock_advance_saturates() {
        let clock = ManualClock::new(1_700_000_000);
        clock.advance(u64::MAX);
        assert_eq!(clock.now(), u64::MAX);

        clock.advance(DAY);
        assert_eq!(clock.now(), u64::MAX);
    }

    #[test]
    fn test_system_clock_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
