//! Rentlink Storage - Chaining Tables, Cache and Resolution
//!
//! Defines the chaining-table source abstraction, the per-family TTL cache
//! in front of it, the chaining-factor resolver, and the [`LinkageEngine`]
//! service facade that ties resolution to the pure calculator in
//! `rentlink-core`.

pub mod cache;
pub mod clock;
pub mod engine;
pub mod resolver;
pub mod source;

pub use cache::{
    CacheConfig, CacheRead, CacheStats, ChainingTable, ChainingTableCache, ReadOrigin,
};
pub use clock::{Clock, SystemClock};
pub use engine::{LinkageEngine, Recalculation, RecalculationRequest};
pub use resolver::ChainingFactorResolver;
pub use source::{ChainingTableSource, InMemoryChainingSource};
