//! Chaining-factor resolution.
//!
//! Decides whether two dates straddle a bureau rebase and, if so, finds the
//! published multiplier converting the earlier base to the later one.
//! Only a direct `from → to` record is used; no multi-hop composition is
//! attempted when an intermediate base lacks a direct record.

use std::sync::Arc;

use chrono::NaiveDate;
use rentlink_core::{
    ChainingFactorRecord, ChainingResult, IndexFamily, ReferencePeriod, ReferencePeriodTable,
};

use crate::cache::ChainingTableCache;
use crate::source::ChainingTableSource;

/// Resolves chaining factors for pairs of dates.
pub struct ChainingFactorResolver<S: ChainingTableSource> {
    cache: Arc<ChainingTableCache<S>>,
    periods: Arc<ReferencePeriodTable>,
}

impl<S: ChainingTableSource> ChainingFactorResolver<S> {
    pub fn new(cache: Arc<ChainingTableCache<S>>, periods: Arc<ReferencePeriodTable>) -> Self {
        Self { cache, periods }
    }

    /// Resolver over the default reference-period table.
    pub fn with_default_periods(cache: Arc<ChainingTableCache<S>>) -> Self {
        Self::new(cache, Arc::new(ReferencePeriodTable::default()))
    }

    pub fn cache(&self) -> &ChainingTableCache<S> {
        &self.cache
    }

    pub fn periods(&self) -> &ReferencePeriodTable {
        &self.periods
    }

    /// Resolve the chaining factor between `base_date` and `target_date`.
    ///
    /// Same reference period: neutral result without touching the cache.
    /// Different periods: the published factor, or a neutral factor flagged
    /// `unresolved` when no record exists.
    pub async fn resolve(
        &self,
        family: IndexFamily,
        base_date: NaiveDate,
        target_date: NaiveDate,
    ) -> ChainingResult {
        let from_base = self.periods.resolve(base_date);
        let to_base = self.periods.resolve(target_date);

        if from_base == to_base {
            return ChainingResult::same_base(from_base);
        }

        let records = self.cache.get_factors(family).await;
        match find_record(&records, &from_base, &to_base) {
            Some(record) => {
                tracing::debug!(
                    family = %family,
                    from_base = %from_base,
                    to_base = %to_base,
                    factor = record.factor,
                    "Resolved chaining factor"
                );
                ChainingResult::chained(from_base, to_base, record.factor)
            }
            None => {
                tracing::warn!(
                    family = %family,
                    from_base = %from_base,
                    to_base = %to_base,
                    "No chaining factor found, falling back to 1.0"
                );
                ChainingResult::unresolved(from_base, to_base)
            }
        }
    }
}

impl<S: ChainingTableSource> Clone for ChainingFactorResolver<S> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            periods: Arc::clone(&self.periods),
        }
    }
}

/// The record converting `from` to `to`. When several overlap, the most
/// recently effective one wins.
fn find_record<'a>(
    records: &'a [ChainingFactorRecord],
    from: &ReferencePeriod,
    to: &ReferencePeriod,
) -> Option<&'a ChainingFactorRecord> {
    records
        .iter()
        .filter(|record| record.converts(from, to))
        .max_by_key(|record| record.effective_date)
}
