use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        now_ms()
    }
}

/// Clock that only moves when told to. Used to drive age-based eviction in tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub fn set_ms(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::Relaxed);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(duration_ms(by), Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn unix_secs() -> i64 {
    Utc::now().timestamp()
}

pub fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Milliseconds elapsed since `last_ms`, `None` if nothing has happened yet.
pub fn age_ms(now_ms: i64, last_ms: Option<i64>) -> Option<i64> {
    last_ms.map(|last| (now_ms - last).max(0))
}
