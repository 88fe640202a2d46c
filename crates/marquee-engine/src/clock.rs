//! Injectable time source.

use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// Current time for every showtime and ledger decision.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock for deterministic tests. Stays put until moved explicitly.
///
/// ## Example
/// ```rust
/// use chrono::{Duration, Utc};
/// use marquee_engine::clock::{Clock, FixedClock};
///
/// let start = Utc::now();
/// let clock = FixedClock::new(start);
/// assert_eq!(clock.now(), clock.now());
///
/// clock.advance(Duration::hours(3));
/// assert_eq!(clock.now(), start + Duration::hours(3));
/// ```
#[derive(Debug)]
pub struct FixedClock {
    time: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        FixedClock {
            time: RwLock::new(time),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        let mut guard = self.time.write().unwrap_or_else(|e| e.into_inner());
        *guard = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.time.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.read().unwrap_or_else(|e| e.into_inner())
    }
}
