//! Ledger clock abstraction
//!
//! Every timestamp the core reads comes through [`Clock`] so that rate-limit
//! windows and authorization expiry can be driven deterministically in tests.

use crate::types::Timestamp;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the ledger's monotonic timestamp
pub trait Clock: Send + Sync {
    /// Current time in seconds since epoch
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_secs())
    }
}

/// Manually advanced clock for tests
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<u64>,
}

impl ManualClock {
    /// Create a clock pinned at the given second
    pub fn starting_at(secs: u64) -> Self {
        Self {
            now: Mutex::new(secs),
        }
    }

    /// Advance the clock by `secs` seconds
    pub fn advance(&self, secs: u64) {
        let mut now = self.now.lock().unwrap();
        *now += secs;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::starting_at(1_700_000_000)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(*self.now.lock().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::starting_at(100);
        assert_eq!(clock.now(), Timestamp(100));

        clock.advance(3_600);
        assert_eq!(clock.now(), Timestamp(3_700));
    }

    #[test]
    fn test_system_clock_is_nonzero() {
        let clock = SystemClock;
        assert!(clock.now().as_secs() > 0);
    }
}
