//! Cache read results carrying freshness metadata.

use rentlink_core::Timestamp;
use std::time::Duration;

/// How a cache read was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOrigin {
    /// Served from a fresh cached entry, no I/O.
    Cache,
    /// Fetched from the source and stored.
    Source,
    /// The source fetch failed; the value is an empty substitute.
    Unavailable,
}

/// Result of a cache read, carrying staleness metadata.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    /// The cached value.
    value: T,
    /// When this value was cached (or fetched from the source).
    cached_at: Timestamp,
    origin: ReadOrigin,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, cached_at: Timestamp) -> Self {
        Self {
            value,
            cached_at,
            origin: ReadOrigin::Cache,
        }
    }

    /// Create a new cache read from a source fetch (cache miss).
    pub fn from_source(value: T, fetched_at: Timestamp) -> Self {
        Self {
            value,
            cached_at: fetched_at,
            origin: ReadOrigin::Source,
        }
    }

    /// Create a substitute read after a failed source fetch.
    pub fn unavailable(value: T, attempted_at: Timestamp) -> Self {
        Self {
            value,
            cached_at: attempted_at,
            origin: ReadOrigin::Unavailable,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Get when this value was cached.
    pub fn cached_at(&self) -> Timestamp {
        self.cached_at
    }

    pub fn origin(&self) -> ReadOrigin {
        self.origin
    }

    /// Check if this was a cache hit.
    pub fn was_cache_hit(&self) -> bool {
        self.origin == ReadOrigin::Cache
    }

    /// Check if the source fetch failed and the value is a substitute.
    pub fn was_fetch_failure(&self) -> bool {
        self.origin == ReadOrigin::Unavailable
    }

    /// How stale the data is as of `now`.
    pub fn staleness_at(&self, now: Timestamp) -> Duration {
        (now - self.cached_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            origin: self.origin,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_cache_read_from_cache() {
        let cached_at = Utc::now();
        let read = CacheRead::from_cache("value", cached_at);

        assert!(read.was_cache_hit());
        assert!(!read.was_fetch_failure());
        assert_eq!(read.origin(), ReadOrigin::Cache);
        assert_eq!(read.cached_at(), cached_at);
        assert_eq!(*read.value(), "value");
    }

    #[test]
    fn test_cache_read_from_source() {
        let read = CacheRead::from_source(42i32, Utc::now());
        assert!(!read.was_cache_hit());
        assert_eq!(read.origin(), ReadOrigin::Source);
        assert_eq!(read.into_value(), 42);
    }

    #[test]
    fn test_cache_read_unavailable() {
        let read = CacheRead::unavailable(Vec::<u8>::new(), Utc::now());
        assert!(read.was_fetch_failure());
        assert!(!read.was_cache_hit());
        assert!(read.value().is_empty());
    }

    #[test]
    fn test_cache_read_staleness() {
        let cached_at = Utc::now();
        let read = CacheRead::from_cache((), cached_at);

        let later = cached_at + chrono::Duration::seconds(5);
        assert_eq!(read.staleness_at(later), Duration::from_secs(5));

        let earlier = cached_at - chrono::Duration::seconds(5);
        assert_eq!(read.staleness_at(earlier), Duration::ZERO);
    }

    #[test]
    fn test_cache_read_map() {
        let read = CacheRead::from_source(42i32, Utc::now());
        let mapped = read.map(|v| v.to_string());

        assert_eq!(mapped.origin(), ReadOrigin::Source);
        assert_eq!(mapped.into_value(), "42");
    }
}
