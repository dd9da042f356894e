//! Chaining-table source trait and in-memory implementation.
//!
//! The source is the remote collaborator that knows every published
//! chaining record for an index family. How those records are populated is
//! outside this crate; the cache only pulls from it.

use async_trait::async_trait;
use rentlink_core::{ChainingFactorRecord, IndexFamily, SourceError};
use std::collections::HashMap;
use std::sync::RwLock;

/// Remote source of chaining-factor records.
///
/// Implementations return every known record for `family`, ideally ordered
/// by effective date descending. Ordering is a freshness hint only; the
/// resolver does not depend on it for correctness. Network timeouts and
/// cancellation belong to the implementation.
#[async_trait]
pub trait ChainingTableSource: Send + Sync {
    /// Fetch all chaining records for an index family.
    async fn fetch(&self, family: IndexFamily) -> Result<Vec<ChainingFactorRecord>, SourceError>;
}

/// In-memory chaining-table source.
///
/// Holds records per family and serves them newest first. Useful for
/// embedding a fixed bureau table and for tests.
#[derive(Debug, Default)]
pub struct InMemoryChainingSource {
    records: RwLock<HashMap<IndexFamily, Vec<ChainingFactorRecord>>>,
}

impl InMemoryChainingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source preloaded with `records`, grouped by their family.
    pub fn with_records(records: impl IntoIterator<Item = ChainingFactorRecord>) -> Self {
        let source = Self::new();
        for record in records {
            source.insert(record);
        }
        source
    }

    /// Add a record under its own family.
    pub fn insert(&self, record: ChainingFactorRecord) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.entry(record.index_family).or_default().push(record);
    }

    /// Remove every record of a family. Returns how many were removed.
    pub fn clear_family(&self, family: IndexFamily) -> usize {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.remove(&family).map(|v| v.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ChainingTableSource for InMemoryChainingSource {
    async fn fetch(&self, family: IndexFamily) -> Result<Vec<ChainingFactorRecord>, SourceError> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut out = records.get(&family).cloned().unwrap_or_default();
        out.sort_by(|a, b| b.effective_date.cmp(&a.effective_date));
        Ok(out)
    }
}

#[async_trait]
impl<T: ChainingTableSource + ?Sized> ChainingTableSource for std::sync::Arc<T> {
    async fn fetch(&self, family: IndexFamily) -> Result<Vec<ChainingFactorRecord>, SourceError> {
        (**self).fetch(family).await
    }
}
