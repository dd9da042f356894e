//! Configuration types

use crate::period::default_boundaries;
use crate::{ConfigError, PeriodBoundary, ReferencePeriodTable, RentlinkResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default chaining-table TTL: 24 hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Reference-period boundaries, most recent first.
    #[serde(default = "default_boundaries")]
    pub reference_periods: Vec<PeriodBoundary>,
    /// How long a fetched chaining table stays fresh, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_periods: default_boundaries(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> RentlinkResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidValue {
                field: "config".to_string(),
                value: json.chars().take(64).collect(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - the reference-period table is non-empty, strictly descending, with unique labels
    /// - cache_ttl_secs > 0
    pub fn validate(&self) -> RentlinkResult<()> {
        self.period_table()?;
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_ttl_secs".to_string(),
                value: self.cache_ttl_secs.to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Build the reference-period table described by this config.
    pub fn period_table(&self) -> Result<ReferencePeriodTable, ConfigError> {
        ReferencePeriodTable::new(self.reference_periods.clone())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
