//! Rentlink Test Utilities
//!
//! Centralized test infrastructure for the rentlink workspace:
//! - Proptest generators for core types
//! - Mock chaining-table sources and a manual clock
//! - Fixtures for the documented worked examples

// Re-export core types for convenience
pub use rentlink_core::{
    ChainingFactorRecord, ChainingResult, EngineConfig, IndexFamily, LinkageCalculator,
    LinkageContext, LinkageResult, LinkageTerms, PeriodBoundary, ReferencePeriod,
    ReferencePeriodTable, SourceError, Timestamp,
};
pub use rentlink_storage::{
    CacheConfig, ChainingTableCache, ChainingTableSource, Clock, InMemoryChainingSource,
};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

// ============================================================================
// MOCK SOURCES
// ============================================================================

/// Chaining-table source that counts fetches per family.
///
/// Serves records from an inner [`InMemoryChainingSource`] and can be
/// switched into a failing mode to simulate an outage.
#[derive(Debug, Default)]
pub struct CountingSource {
    inner: InMemoryChainingSource,
    fetches: Mutex<HashMap<IndexFamily, usize>>,
    total: AtomicUsize,
    failing: AtomicBool,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = ChainingFactorRecord>) -> Self {
        Self {
            inner: InMemoryChainingSource::with_records(records),
            ..Default::default()
        }
    }

    /// Add a record; visible on the next fetch.
    pub fn insert(&self, record: ChainingFactorRecord) {
        self.inner.insert(record);
    }

    /// Make subsequent fetches fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fetches issued for `family`, successful or not.
    pub fn fetches_for(&self, family: IndexFamily) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .get(&family)
            .copied()
            .unwrap_or(0)
    }

    /// Fetches issued across all families.
    pub fn total_fetches(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainingTableSource for CountingSource {
    async fn fetch(&self, family: IndexFamily) -> Result<Vec<ChainingFactorRecord>, SourceError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.fetches.lock().unwrap().entry(family).or_default() += 1;

        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable {
                family: family.to_string(),
                reason: "simulated outage".to_string(),
            });
        }
        self.inner.fetch(family).await
    }
}

/// Chaining-table source that always fails.
#[derive(Debug, Default)]
pub struct FailingSource {
    attempts: AtomicUsize,
}

impl FailingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainingTableSource for FailingSource {
    async fn fetch(&self, family: IndexFamily) -> Result<Vec<ChainingFactorRecord>, SourceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Timeout {
            family: family.to_string(),
        })
    }
}

// ============================================================================
// CLOCK
// ============================================================================

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).expect("advance duration out of range");
        *self.now.lock().unwrap() += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Worked examples and a representative bureau chaining table.

    use super::*;

    pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
    }

    /// CPI 2018 → 2020 with factor 1.0534.
    pub fn cpi_2018_to_2020() -> ChainingFactorRecord {
        ChainingFactorRecord::new(IndexFamily::Cpi, "2018", "2020", 1.0534, ymd(2020, 1, 1))
    }

    /// A small table of direct, adjacent rebases for every family.
    pub fn bureau_table() -> Vec<ChainingFactorRecord> {
        let mut records = Vec::new();
        for (family, factors) in [
            (IndexFamily::Cpi, [1.0194, 1.0534, 1.0812]),
            (IndexFamily::Housing, [1.0411, 1.0702, 1.1265]),
            (IndexFamily::Construction, [1.0288, 1.0467, 1.0933]),
        ] {
            records.push(ChainingFactorRecord::new(family, "2012", "2018", factors[0], ymd(2018, 1, 1)));
            records.push(ChainingFactorRecord::new(family, "2018", "2020", factors[1], ymd(2020, 1, 1)));
            records.push(ChainingFactorRecord::new(family, "2020", "2024", factors[2], ymd(2024, 1, 1)));
        }
        records
    }

    /// Base rent 5000 at index 100, recalculated at `current`.
    pub fn context(current_index_value: f64) -> LinkageContext {
        LinkageContext {
            base_rent: 5000.0,
            base_index_value: 100.0,
            current_index_value,
            base_date: ymd(2024, 1, 1),
            target_date: ymd(2024, 6, 1),
        }
    }
}

// ============================================================================
// TRACING
// ============================================================================

static TRACING: Once = Once::new();

/// Install a fmt subscriber honoring `RUST_LOG`, once per process.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating rentlink types.

    use super::*;
    use proptest::prelude::*;

    /// Generate an IndexFamily variant.
    pub fn arb_index_family() -> impl Strategy<Value = IndexFamily> {
        prop_oneof![
            Just(IndexFamily::Cpi),
            Just(IndexFamily::Housing),
            Just(IndexFamily::Construction),
        ]
    }

    /// Generate a calendar date between 1900 and 9999.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (1900i32..=9999, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).expect("day <= 28 is always valid"))
    }

    /// Generate a date whose year falls in `years`.
    pub fn arb_date_in_year_range(years: std::ops::Range<i32>) -> impl Strategy<Value = NaiveDate> {
        (years, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).expect("day <= 28 is always valid"))
    }

    /// Generate a label from the default reference-period table.
    pub fn arb_reference_period() -> impl Strategy<Value = ReferencePeriod> {
        prop_oneof![
            Just(ReferencePeriod::new("2012")),
            Just(ReferencePeriod::new("2018")),
            Just(ReferencePeriod::new("2020")),
            Just(ReferencePeriod::new("2024")),
        ]
    }

    /// Generate a chaining factor in a realistic band.
    pub fn arb_factor() -> impl Strategy<Value = f64> {
        0.5f64..2.0
    }

    /// Generate a valid chaining record (distinct bases, positive factor).
    pub fn arb_chaining_record() -> impl Strategy<Value = ChainingFactorRecord> {
        (
            arb_index_family(),
            arb_reference_period(),
            arb_reference_period(),
            arb_factor(),
            arb_date_in_year_range(2012..2030),
        )
            .prop_filter("bases must differ", |(_, from, to, _, _)| from != to)
            .prop_map(|(family, from, to, factor, effective)| {
                ChainingFactorRecord::new(family, from, to, factor, effective)
            })
    }

    /// Generate a valid linkage context.
    pub fn arb_linkage_context() -> impl Strategy<Value = LinkageContext> {
        (
            1.0f64..100_000.0,
            1.0f64..1_000.0,
            1.0f64..1_000.0,
            arb_date_in_year_range(2000..2040),
            arb_date_in_year_range(2000..2040),
        )
            .prop_map(
                |(base_rent, base_index_value, current_index_value, base_date, target_date)| {
                    LinkageContext {
                        base_rent,
                        base_index_value,
                        current_index_value,
                        base_date,
                        target_date,
                    }
                },
            )
    }

    /// Generate valid linkage terms.
    pub fn arb_linkage_terms() -> impl Strategy<Value = LinkageTerms> {
        (
            0.0f64..=100.0,
            any::<bool>(),
            prop::option::of(0.1f64..20.0),
            prop::option::of(0.1f64..50.0),
        )
            .prop_map(|(partial, floor, ceiling, cap)| LinkageTerms {
                partial_linkage_pct: partial,
                base_index_floor: floor,
                annual_ceiling_pct: ceiling,
                max_increase_pct: cap,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counting_source_counts_and_fails() {
        let source = CountingSource::with_records([fixtures::cpi_2018_to_2020()]);
        assert_eq!(source.fetch(IndexFamily::Cpi).await.unwrap().len(), 1);
        assert_eq!(source.fetches_for(IndexFamily::Cpi), 1);

        source.set_failing(true);
        assert!(source.fetch(IndexFamily::Housing).await.is_err());
        assert_eq!(source.fetches_for(IndexFamily::Housing), 1);
        assert_eq!(source.total_fetches(), 2);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now() - start, TimeDelta::seconds(90));
    }

    #[test]
    fn test_bureau_table_records_are_valid() {
        let table = fixtures::bureau_table();
        assert_eq!(table.len(), 9);
        assert!(table.iter().all(ChainingFactorRecord::is_valid));
    }
}
