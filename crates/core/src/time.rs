// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time handling for progress de-duplication windows and persisted state
//! timestamps: a monotonic [`Clock`] the state machines drive against, and
//! the RFC3339 encoding `taskagent-storage` uses for the on-disk snapshot.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};

/// A monotonic clock the progress de-duplicator times its emit windows
/// against.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> Instant;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Fake clock for testing de-duplication windows without real sleeps.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<Instant>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { current: Arc::new(Mutex::new(Instant::now())) }
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
    }

    /// Sets the clock to a specific instant.
    pub fn set(&self, instant: Instant) {
        *self.current.lock() = instant;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}

/// Encodes a timestamp for the persisted state file.
pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Decodes a timestamp read back from the persisted state file.
pub fn from_rfc3339(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_returns_increasing_time() {
        let clock = SystemClock;
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(1));
        let t2 = clock.now();
        assert!(t2 > t1);
    }

    #[test]
    fn fake_clock_can_be_advanced() {
        let clock = FakeClock::new();
        let t1 = clock.now();
        clock.advance(Duration::from_secs(60));
        let t2 = clock.now();
        assert!(t2.duration_since(t1) >= Duration::from_secs(60));
    }

    #[test]
    fn fake_clock_is_cloneable_and_shared() {
        let clock1 = FakeClock::new();
        let clock2 = clock1.clone();
        let t1 = clock1.now();
        clock2.advance(Duration::from_secs(30));
        let t2 = clock1.now();
        assert!(t2.duration_since(t1) >= Duration::from_secs(30));
    }

    #[test]
    fn fake_clock_default() {
        let clock = FakeClock::default();
        let _ = clock.now();
    }

    #[test]
    fn fake_clock_set() {
        let clock = FakeClock::new();
        let future = Instant::now() + Duration::from_secs(3600);
        clock.set(future);
        assert!(clock.now() >= future);
    }

    #[test]
    fn round_trips_through_rfc3339() {
        let ts = Utc::now().date_naive().and_hms_opt(1, 2, 3).unwrap().and_utc();
        let s = to_rfc3339(ts);
        let back = from_rfc3339(&s).unwrap();
        assert_eq!(ts, back);
    }
}
