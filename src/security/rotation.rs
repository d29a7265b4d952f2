//! Key rotation policy

use serde::Serialize;

use crate::clock::MILLIS_PER_DAY;

/// Default database key rotation interval
pub const DEFAULT_ROTATION_DAYS: i64 = 90;

/// How often a machine-managed key should be replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRotationPolicy {
    pub interval_days: i64,
}

impl Default for KeyRotationPolicy {
    fn default() -> Self {
        Self {
            interval_days: DEFAULT_ROTATION_DAYS,
        }
    }
}

impl KeyRotationPolicy {
    pub fn new(interval_days: i64) -> Self {
        Self { interval_days }
    }

    /// A key that was never rotated (`last_rotated_at == 0`) is never due
    pub fn is_rotation_due(&self, last_rotated_at: i64, now: i64) -> bool {
        last_rotated_at != 0 && now >= self.next_rotation_at(last_rotated_at)
    }

    pub fn next_rotation_at(&self, last_rotated_at: i64) -> i64 {
        last_rotated_at.saturating_add(self.interval_days.saturating_mul(MILLIS_PER_DAY))
    }
}

/// Derived rotation state; never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RotationStatus {
    pub last_rotated_at: i64,
    pub next_rotation_at: i64,
    pub is_due: bool,
}
