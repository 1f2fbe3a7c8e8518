//! Time handling for sensor events
//!
//! Every event carries the millisecond timestamp its collaborator stamped
//! it with; the engine never reads a clock itself. Producers pick a source:
//! - System clock (host tooling, phones)
//! - Manual clock (tests, trace replay)

#[cfg(target_has_atomic = "64")]
use core::sync::atomic::{AtomicU64, Ordering};

/// Timestamp in milliseconds since epoch (or device boot for monotonic)
pub type Timestamp = u64;

/// Source of event timestamps
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

/// Milliseconds from `earlier` to `later`, zero if the clock went backwards
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

/// System time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Manually advanced clock, shareable between producer threads
#[cfg(target_has_atomic = "64")]
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

#[cfg(target_has_atomic = "64")]
impl ManualClock {
    /// Clock starting at `start`
    pub const fn new(start: Timestamp) -> Self {
        Self { now_ms: AtomicU64::new(start) }
    }

    /// Jump to an absolute time
    pub fn set(&self, timestamp: Timestamp) {
        self.now_ms.store(timestamp, Ordering::Release);
    }

    /// Move forward and return the new time
    pub fn advance(&self, ms: u64) -> Timestamp {
        self.now_ms.fetch_add(ms, Ordering::AcqRel) + ms
    }
}

#[cfg(target_has_atomic = "64")]
impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        self.now_ms.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1000);
        assert_eq!(clock.now(), 1000);

        assert_eq!(clock.advance(500), 1500);
        assert_eq!(clock.now(), 1500);

        clock.set(200);
        assert_eq!(clock.now(), 200);
    }

    #[cfg(feature = "std")]
    #[test]
    fn system_clock_is_wall_time() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_577_836_800_000);
    }

    #[test]
    fn elapsed_saturates() {
        assert_eq!(elapsed_ms(1000, 1500), 500);
        assert_eq!(elapsed_ms(1500, 1000), 0);
    }
}
