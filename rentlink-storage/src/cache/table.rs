//! Per-family chaining-table cache with a shared TTL.
//!
//! Entries are fetched lazily on first demand. A single expiry timestamp is
//! shared by every family: once it passes, all entries are invalidated
//! together and each family is re-fetched on its next demand. A failed fetch
//! never propagates; callers receive an empty table instead.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rentlink_core::{ChainingFactorRecord, IndexFamily, Timestamp, DEFAULT_CACHE_TTL_SECS};

use super::freshness::CacheRead;
use super::stats::{CacheCounters, CacheStats};
use crate::clock::{Clock, SystemClock};
use crate::source::ChainingTableSource;

/// Shared, immutable chaining table for one family.
pub type ChainingTable = Arc<[ChainingFactorRecord]>;

/// Configuration for the chaining-table cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long fetched tables stay fresh.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS), // 24 hours
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[derive(Debug)]
struct CachedTable {
    records: ChainingTable,
    cached_at: Timestamp,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<IndexFamily, CachedTable>,
    /// Shared by all families. `None` until the first successful fetch.
    expires_at: Option<Timestamp>,
}

impl CacheState {
    fn is_live(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now < expires_at)
    }
}

/// Lazily populated chaining-table cache.
///
/// The only stateful component of the engine. Construct once and share by
/// reference (or `Arc`) with every resolver.
pub struct ChainingTableCache<S: ChainingTableSource> {
    source: Arc<S>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    state: RwLock<CacheState>,
    counters: CacheCounters,
}

impl<S: ChainingTableSource> ChainingTableCache<S> {
    /// Create a cache over `source` using the system clock.
    pub fn new(source: Arc<S>, config: CacheConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    /// Create a cache with default configuration.
    pub fn with_defaults(source: Arc<S>) -> Self {
        Self::new(source, CacheConfig::default())
    }

    /// Create a cache driven by an injected clock.
    pub fn with_clock(source: Arc<S>, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            config,
            state: RwLock::new(CacheState::default()),
            counters: CacheCounters::default(),
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a reference to the chaining-table source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// All chaining records for `family`.
    ///
    /// Served from cache while the shared expiry is in the future; otherwise
    /// fetched from the source. Never fails: a fetch error yields an empty
    /// table.
    pub async fn get_factors(&self, family: IndexFamily) -> ChainingTable {
        self.get_factors_read(family).await.into_value()
    }

    /// Like [`get_factors`](Self::get_factors), with freshness metadata.
    pub async fn get_factors_read(&self, family: IndexFamily) -> CacheRead<ChainingTable> {
        let now = self.clock.now();

        if let Some(read) = self.lookup(family, now) {
            self.counters.hit();
            tracing::trace!(family = %family, records = read.value().len(), "Chaining table cache hit");
            return read;
        }
        self.counters.miss();

        match self.source.fetch(family).await {
            Ok(records) => {
                let records = self.sanitize(family, records);
                self.counters.fetched();
                tracing::debug!(family = %family, records = records.len(), "Fetched chaining table");
                // The fetch may have outlived the window it started in.
                let fetched_at = self.clock.now();
                self.store(family, Arc::clone(&records), fetched_at);
                CacheRead::from_source(records, fetched_at)
            }
            Err(error) => {
                self.counters.fetch_failed();
                tracing::error!(family = %family, error = %error, "Error fetching chaining factors");
                CacheRead::unavailable(Arc::from(Vec::new()), self.clock.now())
            }
        }
    }

    /// Drop every cached table and reset the shared expiry.
    pub fn clear(&self) {
        let mut state = self.write_state();
        state.entries.clear();
        state.expires_at = None;
    }

    /// When the cached tables expire, if anything is cached.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.read_state().expires_at
    }

    /// Is a fresh table for `family` cached right now?
    pub fn is_cached(&self, family: IndexFamily) -> bool {
        let state = self.read_state();
        state.is_live(self.clock.now()) && state.entries.contains_key(&family)
    }

    /// Get cache statistics. `entry_count` covers live entries only.
    pub fn stats(&self) -> CacheStats {
        let entry_count = {
            let state = self.read_state();
            if state.is_live(self.clock.now()) {
                state.entries.len() as u64
            } else {
                0
            }
        };
        self.counters.snapshot(entry_count)
    }

    fn lookup(&self, family: IndexFamily, now: Timestamp) -> Option<CacheRead<ChainingTable>> {
        let state = self.read_state();
        if !state.is_live(now) {
            return None;
        }
        state
            .entries
            .get(&family)
            .map(|table| CacheRead::from_cache(Arc::clone(&table.records), table.cached_at))
    }

    /// Full replacement of one family's entry. An expired cache is emptied
    /// first so no family outlives the TTL window it was fetched in.
    fn store(&self, family: IndexFamily, records: ChainingTable, now: Timestamp) {
        let mut state = self.write_state();
        if !state.is_live(now) && !state.entries.is_empty() {
            tracing::debug!(
                families = state.entries.len(),
                "Chaining table cache expired, invalidating all families"
            );
            state.entries.clear();
        }
        state.entries.insert(
            family,
            CachedTable {
                records,
                cached_at: now,
            },
        );
        let expires_at = expiry_after(now, self.config.ttl);
        state.expires_at = Some(state.expires_at.map_or(expires_at, |prev| prev.max(expires_at)));
    }

    /// Drop records that belong to another family or violate record
    /// invariants.
    fn sanitize(&self, family: IndexFamily, records: Vec<ChainingFactorRecord>) -> ChainingTable {
        let total = records.len();
        let kept: Vec<ChainingFactorRecord> = records
            .into_iter()
            .filter(|record| {
                let violation = if record.index_family != family {
                    Some("index family mismatch")
                } else {
                    record.invariant_violation()
                };
                if let Some(reason) = violation {
                    tracing::warn!(
                        family = %family,
                        from_base = %record.from_base,
                        to_base = %record.to_base,
                        factor = record.factor,
                        reason,
                        "Dropping invalid chaining record"
                    );
                }
                violation.is_none()
            })
            .collect();

        let dropped = (total - kept.len()) as u64;
        if dropped > 0 {
            self.counters.dropped(dropped);
        }
        Arc::from(kept)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<S: ChainingTableSource> std::fmt::Debug for ChainingTableCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainingTableCache")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("stats", &self.stats())
            .finish()
    }
}

fn expiry_after(now: Timestamp, ttl: Duration) -> Timestamp {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rentlink_core::SourceError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct TestClock(Mutex<Timestamp>);

    impl TestClock {
        fn new() -> Self {
            Self(Mutex::new(Utc::now()))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += TimeDelta::from_std(by).unwrap();
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Timestamp {
            *self.0.lock().unwrap()
        }
    }

    // Mock source counting fetches per family
    #[derive(Default)]
    struct MockSource {
        records: Mutex<Vec<ChainingFactorRecord>>,
        fetches: Mutex<HashMap<IndexFamily, usize>>,
        total: AtomicUsize,
        failing: AtomicBool,
    }

    impl MockSource {
        fn with(records: Vec<ChainingFactorRecord>) -> Self {
            Self {
                records: Mutex::new(records),
                ..Default::default()
            }
        }

        fn fetches_for(&self, family: IndexFamily) -> usize {
            self.fetches.lock().unwrap().get(&family).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl ChainingTableSource for MockSource {
        async fn fetch(
            &self,
            family: IndexFamily,
        ) -> Result<Vec<ChainingFactorRecord>, SourceError> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self.fetches.lock().unwrap().entry(family).or_default() += 1;
            if self.failing.load(Ordering::SeqCst) {
                return Err(SourceError::Unavailable {
                    family: family.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.index_family == family)
                .cloned()
                .collect())
        }
    }

    /// Source whose fetches take `latency` on the shared test clock.
    #[derive(Debug)]
    struct SlowSource {
        clock: Arc<TestClock>,
        latency: Duration,
    }

    #[async_trait]
    impl ChainingTableSource for SlowSource {
        async fn fetch(
            &self,
            _family: IndexFamily,
        ) -> Result<Vec<ChainingFactorRecord>, SourceError> {
            self.clock.advance(self.latency);
            Ok(Vec::new())
        }
    }

    fn record(family: IndexFamily, from: &str, to: &str, factor: f64) -> ChainingFactorRecord {
        ChainingFactorRecord::new(
            family,
            from,
            to,
            factor,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        )
    }

    fn cache_with(
        source: MockSource,
    ) -> (ChainingTableCache<MockSource>, Arc<MockSource>, Arc<TestClock>) {
        let source = Arc::new(source);
        let clock = Arc::new(TestClock::new());
        let cache = ChainingTableCache::with_clock(
            Arc::clone(&source),
            CacheConfig::default(),
            clock.clone(),
        );
        (cache, source, clock)
    }

    #[tokio::test]
    async fn test_first_read_fetches_then_hits() {
        let (cache, source, _clock) = cache_with(MockSource::with(vec![record(
            IndexFamily::Cpi,
            "2018",
            "2020",
            1.0534,
        )]));

        let first = cache.get_factors_read(IndexFamily::Cpi).await;
        assert!(!first.was_cache_hit());
        assert_eq!(first.value().len(), 1);

        let second = cache.get_factors_read(IndexFamily::Cpi).await;
        assert!(second.was_cache_hit());
        assert_eq!(second.value().len(), 1);

        assert_eq!(source.fetches_for(IndexFamily::Cpi), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.fetches), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_empty_table_is_cached() {
        let (cache, source, _clock) = cache_with(MockSource::default());

        assert!(cache.get_factors(IndexFamily::Housing).await.is_empty());
        assert!(cache.get_factors(IndexFamily::Housing).await.is_empty());
        assert_eq!(source.fetches_for(IndexFamily::Housing), 1);
        assert!(cache.is_cached(IndexFamily::Housing));
    }

    #[tokio::test]
    async fn test_families_are_cached_independently() {
        let (cache, source, _clock) = cache_with(MockSource::with(vec![
            record(IndexFamily::Cpi, "2018", "2020", 1.05),
            record(IndexFamily::Construction, "2018", "2020", 1.07),
        ]));

        let cpi = cache.get_factors(IndexFamily::Cpi).await;
        let construction = cache.get_factors(IndexFamily::Construction).await;
        assert_eq!(cpi[0].factor, 1.05);
        assert_eq!(construction[0].factor, 1.07);
        assert_eq!(source.total.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().entry_count, 2);
    }

    #[tokio::test]
    async fn test_expiry_triggers_one_refetch() {
        let (cache, source, clock) = cache_with(MockSource::default());

        cache.get_factors(IndexFamily::Cpi).await;
        clock.advance(Duration::from_secs(DEFAULT_CACHE_TTL_SECS - 1));
        cache.get_factors(IndexFamily::Cpi).await;
        assert_eq!(source.fetches_for(IndexFamily::Cpi), 1);

        clock.advance(Duration::from_secs(1));
        cache.get_factors(IndexFamily::Cpi).await;
        cache.get_factors(IndexFamily::Cpi).await;
        assert_eq!(source.fetches_for(IndexFamily::Cpi), 2);
    }

    #[tokio::test]
    async fn test_expiry_invalidates_all_families() {
        let (cache, source, clock) = cache_with(MockSource::default());

        cache.get_factors(IndexFamily::Cpi).await;
        cache.get_factors(IndexFamily::Housing).await;
        clock.advance(Duration::from_secs(DEFAULT_CACHE_TTL_SECS));

        // Re-fetching cpi pushes the shared expiry forward but must not
        // revive the housing entry from the previous window.
        cache.get_factors(IndexFamily::Cpi).await;
        assert!(!cache.is_cached(IndexFamily::Housing));
        assert_eq!(cache.stats().entry_count, 1);

        cache.get_factors(IndexFamily::Housing).await;
        assert_eq!(source.fetches_for(IndexFamily::Housing), 2);
    }

    #[tokio::test]
    async fn test_fetch_straddling_expiry_invalidates_other_families() {
        let clock = Arc::new(TestClock::new());
        let source = Arc::new(SlowSource {
            clock: Arc::clone(&clock),
            latency: Duration::from_secs(10),
        });
        let ttl = Duration::from_secs(100);
        let cache = ChainingTableCache::with_clock(
            source,
            CacheConfig::new().with_ttl(ttl),
            clock.clone(),
        );

        // Cached at t0 (the fetch itself ends at t0 + 10).
        cache.get_factors(IndexFamily::Cpi).await;
        let first_expiry = cache.expires_at().unwrap();
        clock.advance(Duration::from_secs(95));

        // Starts inside the window, completes after it closed.
        let read = cache.get_factors_read(IndexFamily::Housing).await;
        assert_eq!(read.cached_at(), clock.now());

        assert!(!cache.is_cached(IndexFamily::Cpi));
        assert!(cache.is_cached(IndexFamily::Housing));
        assert_eq!(cache.stats().entry_count, 1);
        let second_expiry = cache.expires_at().unwrap();
        assert!(second_expiry > first_expiry);
        assert_eq!(second_expiry, clock.now() + TimeDelta::seconds(100));
    }

    #[tokio::test]
    async fn test_entry_count_excludes_expired_entries() {
        let (cache, _source, clock) = cache_with(MockSource::default());

        cache.get_factors(IndexFamily::Cpi).await;
        cache.get_factors(IndexFamily::Housing).await;
        assert_eq!(cache.stats().entry_count, 2);

        clock.advance(Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_shared_expiry_is_pushed_by_any_family() {
        let (cache, _source, clock) = cache_with(MockSource::default());

        cache.get_factors(IndexFamily::Cpi).await;
        let first_expiry = cache.expires_at().unwrap();
        clock.advance(Duration::from_secs(60));
        cache.get_factors(IndexFamily::Housing).await;
        let second_expiry = cache.expires_at().unwrap();
        assert_eq!(second_expiry - first_expiry, TimeDelta::seconds(60));
    }

    #[tokio::test]
    async fn test_fetch_failure_returns_empty_and_is_not_cached() {
        let source = MockSource::with(vec![record(IndexFamily::Cpi, "2018", "2020", 1.05)]);
        source.failing.store(true, Ordering::SeqCst);
        let (cache, source, _clock) = cache_with(source);

        let read = cache.get_factors_read(IndexFamily::Cpi).await;
        assert!(read.was_fetch_failure());
        assert!(read.value().is_empty());
        assert!(!cache.is_cached(IndexFamily::Cpi));
        assert_eq!(cache.stats().fetch_failures, 1);

        source.failing.store(false, Ordering::SeqCst);
        let table = cache.get_factors(IndexFamily::Cpi).await;
        assert_eq!(table.len(), 1);
        assert_eq!(source.fetches_for(IndexFamily::Cpi), 2);
    }

    #[tokio::test]
    async fn test_invalid_records_dropped_at_ingest() {
        let (cache, _source, _clock) = cache_with(MockSource::with(vec![
            record(IndexFamily::Cpi, "2018", "2020", 1.05),
            record(IndexFamily::Cpi, "2020", "2020", 1.02),
            record(IndexFamily::Cpi, "2012", "2018", 0.0),
            record(IndexFamily::Cpi, "2012", "2020", f64::NAN),
        ]));

        let table = cache.get_factors(IndexFamily::Cpi).await;
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].factor, 1.05);
        assert_eq!(cache.stats().dropped_records, 3);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let (cache, source, _clock) = cache_with(MockSource::default());

        cache.get_factors(IndexFamily::Cpi).await;
        cache.clear();
        assert!(cache.expires_at().is_none());
        cache.get_factors(IndexFamily::Cpi).await;
        assert_eq!(source.fetches_for(IndexFamily::Cpi), 2);
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new().with_ttl(Duration::from_secs(1800));
        assert_eq!(config.ttl, Duration::from_secs(1800));
        assert_eq!(CacheConfig::default().ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn test_expiry_after_saturates() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(
            expiry_after(now, Duration::from_secs(10)),
            now + TimeDelta::seconds(10)
        );
    }
}
