//! Wall-clock abstraction for TTL bookkeeping.

use chrono::Utc;
use rentlink_core::Timestamp;
use std::fmt;

/// Source of the current time.
///
/// Injected into the cache so expiry can be driven deterministically.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current wall-clock time.
    fn now(&self) -> Timestamp;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}
