//! Chaining-table cache with explicit freshness metadata.
//!
//! The cache holds, per index family, the most recently fetched chaining
//! records, plus one expiry timestamp shared by all families. Reads return
//! [`CacheRead<T>`] so callers can tell a cache hit from a fresh fetch or a
//! substitute produced after a failed fetch.
//!
//! # Example
//!
//! ```ignore
//! let cache = ChainingTableCache::new(source, CacheConfig::default());
//!
//! let read = cache.get_factors_read(IndexFamily::Cpi).await;
//! if read.was_fetch_failure() {
//!     tracing::warn!("Chaining table unavailable, linkage may be approximate");
//! }
//! ```

pub mod freshness;
pub mod stats;
pub mod table;

pub use freshness::{CacheRead, ReadOrigin};
pub use stats::CacheStats;
pub use table::{CacheConfig, ChainingTable, ChainingTableCache};
