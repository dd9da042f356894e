//! Reference-period resolution.
//!
//! A statistics bureau periodically rebases an index ("2012=100" becomes
//! "2020=100"). Every calendar date falls into exactly one such regime. The
//! [`ReferencePeriodTable`] maps a date to the label of its regime using an
//! explicitly ordered list of effective-year boundaries, so a new rebase is a
//! data change rather than a code change.

use crate::ConfigError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Opaque label of a bureau base-year regime (e.g. `"2018"`).
///
/// Compared only for equality; the ordering of regimes lives in the
/// [`ReferencePeriodTable`], not in the label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferencePeriod(String);

impl ReferencePeriod {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferencePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReferencePeriod {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// One row of the period table: dates whose year is at or after
/// `threshold_year` belong to `label`, unless a more recent row claims them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBoundary {
    pub threshold_year: i32,
    pub label: String,
}

impl PeriodBoundary {
    pub fn new(threshold_year: i32, label: impl Into<String>) -> Self {
        Self {
            threshold_year,
            label: label.into(),
        }
    }
}

/// Ordered table of reference-period boundaries, most recent first.
///
/// Invariants enforced at construction:
/// - at least one boundary
/// - thresholds strictly descending
/// - labels non-empty and unique
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePeriodTable {
    boundaries: Vec<PeriodBoundary>,
}

impl ReferencePeriodTable {
    /// Build a table from boundaries ordered most recent first.
    pub fn new(boundaries: Vec<PeriodBoundary>) -> Result<Self, ConfigError> {
        if boundaries.is_empty() {
            return Err(ConfigError::EmptyPeriodTable);
        }

        let mut seen = HashSet::with_capacity(boundaries.len());
        for (i, boundary) in boundaries.iter().enumerate() {
            if boundary.label.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "reference_periods.label".to_string(),
                    value: boundary.label.clone(),
                    reason: "label must not be empty".to_string(),
                });
            }
            if !seen.insert(boundary.label.as_str()) {
                return Err(ConfigError::DuplicatePeriodLabel {
                    label: boundary.label.clone(),
                });
            }
            if i > 0 {
                let previous = boundaries[i - 1].threshold_year;
                if boundary.threshold_year >= previous {
                    return Err(ConfigError::UnorderedPeriodTable {
                        previous,
                        next: boundary.threshold_year,
                    });
                }
            }
        }

        Ok(Self { boundaries })
    }

    /// Resolve the reference period a calendar date belongs to.
    ///
    /// Total over every representable date. Years before the oldest
    /// threshold saturate to the oldest label.
    pub fn resolve(&self, date: NaiveDate) -> ReferencePeriod {
        self.resolve_year(date.year())
    }

    /// Resolve by calendar year alone.
    pub fn resolve_year(&self, year: i32) -> ReferencePeriod {
        let boundary = self
            .boundaries
            .iter()
            .find(|b| year >= b.threshold_year)
            .unwrap_or_else(|| self.oldest_boundary());
        ReferencePeriod::new(boundary.label.as_str())
    }

    /// The oldest known reference period.
    pub fn oldest(&self) -> ReferencePeriod {
        ReferencePeriod::new(self.oldest_boundary().label.as_str())
    }

    /// The most recent known reference period.
    pub fn latest(&self) -> ReferencePeriod {
        ReferencePeriod::new(self.boundaries[0].label.as_str())
    }

    /// Labels in table order (most recent first).
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.boundaries.iter().map(|b| b.label.as_str())
    }

    pub fn boundaries(&self) -> &[PeriodBoundary] {
        &self.boundaries
    }

    fn oldest_boundary(&self) -> &PeriodBoundary {
        // Non-empty by construction.
        &self.boundaries[self.boundaries.len() - 1]
    }
}

impl Default for ReferencePeriodTable {
    /// Bureau rebases currently tracked: 2012, 2018, 2020, 2024.
    fn default() -> Self {
        Self {
            boundaries: default_boundaries(),
        }
    }
}

/// Boundaries of the default table, most recent first.
pub fn default_boundaries() -> Vec<PeriodBoundary> {
    vec![
        PeriodBoundary::new(2024, "2024"),
        PeriodBoundary::new(2020, "2020"),
        PeriodBoundary::new(2018, "2018"),
        PeriodBoundary::new(2012, "2012"),
    ]
}
