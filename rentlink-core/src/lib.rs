//! Rentlink Core - Index Linkage Types and Math
//!
//! Pure data structures and pure functions. All other crates depend on this.
//! Nothing here performs I/O or holds shared state:
//! - [`ReferencePeriodTable`] maps calendar dates to bureau base-year regimes
//! - [`LinkageCalculator`] applies a chaining result and index values to a base rent
//!
//! Chaining-table fetching and caching live in `rentlink-storage`.

pub mod chaining;
pub mod config;
pub mod date;
pub mod error;
pub mod family;
pub mod linkage;
pub mod period;

pub use chaining::{ChainingFactorRecord, ChainingResult, MissingChainingFactor};
pub use config::{EngineConfig, DEFAULT_CACHE_TTL_SECS};
pub use date::{first_of_month, parse_date};
pub use error::{ConfigError, RentlinkError, RentlinkResult, SourceError, ValidationError};
pub use family::IndexFamily;
pub use linkage::{
    IndexTiming, LinkageCalculator, LinkageContext, LinkageResult, LinkageTerms, DAYS_PER_YEAR,
};
pub use period::{PeriodBoundary, ReferencePeriod, ReferencePeriodTable};

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
