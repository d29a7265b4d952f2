//! Wall-clock abstraction
//!
//! Timestamps are milliseconds since the Unix epoch. Components take a
//! `Arc<dyn Clock>` so tests can pin and advance time.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Milliseconds in one day
pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds
    fn now_ms(&self) -> i64;
}

/// The system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A manually driven clock
#[derive(Debug)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
