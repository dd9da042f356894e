//! Chaining-factor records and resolution results.

use crate::{IndexFamily, ReferencePeriod};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bureau-published multiplier converting index values from one base to a
/// later base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainingFactorRecord {
    pub index_family: IndexFamily,
    pub from_base: ReferencePeriod,
    pub to_base: ReferencePeriod,
    pub factor: f64,
    pub effective_date: NaiveDate,
}

impl ChainingFactorRecord {
    pub fn new(
        index_family: IndexFamily,
        from_base: impl Into<ReferencePeriod>,
        to_base: impl Into<ReferencePeriod>,
        factor: f64,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            index_family,
            from_base: from_base.into(),
            to_base: to_base.into(),
            factor,
            effective_date,
        }
    }

    /// Check the record invariants: distinct bases and a finite, positive
    /// factor. Returns the violated invariant, if any.
    pub fn invariant_violation(&self) -> Option<&'static str> {
        if self.from_base == self.to_base {
            Some("from_base equals to_base")
        } else if !self.factor.is_finite() {
            Some("factor is not finite")
        } else if self.factor <= 0.0 {
            Some("factor is not positive")
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        self.invariant_violation().is_none()
    }

    /// Does this record convert `from` to `to`?
    pub fn converts(&self, from: &ReferencePeriod, to: &ReferencePeriod) -> bool {
        &self.from_base == from && &self.to_base == to
    }
}

/// Outcome of chaining-factor resolution for a pair of dates.
///
/// Three shapes are possible:
/// - same base: `needs_chaining = false`, `factor = 1.0`
/// - published factor: `needs_chaining = true`, `unresolved = false`
/// - missing factor: `needs_chaining = true`, `factor = 1.0`, `unresolved = true`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainingResult {
    pub needs_chaining: bool,
    pub factor: f64,
    pub from_base: ReferencePeriod,
    pub to_base: ReferencePeriod,
    #[serde(default)]
    pub unresolved: bool,
}

impl ChainingResult {
    /// Both dates fall on the same base.
    pub fn same_base(period: ReferencePeriod) -> Self {
        Self {
            needs_chaining: false,
            factor: 1.0,
            from_base: period.clone(),
            to_base: period,
            unresolved: false,
        }
    }

    /// A published record converts `from_base` to `to_base`.
    pub fn chained(from_base: ReferencePeriod, to_base: ReferencePeriod, factor: f64) -> Self {
        Self {
            needs_chaining: true,
            factor,
            from_base,
            to_base,
            unresolved: false,
        }
    }

    /// The bases differ but no record was found; the factor is a neutral guess.
    pub fn unresolved(from_base: ReferencePeriod, to_base: ReferencePeriod) -> Self {
        Self {
            needs_chaining: true,
            factor: 1.0,
            from_base,
            to_base,
            unresolved: true,
        }
    }

    /// The multiplier to apply to the target index value.
    pub fn effective_factor(&self) -> f64 {
        if self.needs_chaining {
            self.factor
        } else {
            1.0
        }
    }

    /// Warning to surface to a human when the factor is a fallback.
    pub fn warning(&self, family: IndexFamily) -> Option<MissingChainingFactor> {
        self.unresolved.then(|| MissingChainingFactor {
            index_family: family,
            from_base: self.from_base.clone(),
            to_base: self.to_base.clone(),
        })
    }
}

/// A cross-base pair has no published chaining record.
///
/// Non-fatal: computation proceeds with a factor of 1.0 and the figure
/// should be presented as approximate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingChainingFactor {
    pub index_family: IndexFamily,
    pub from_base: ReferencePeriod,
    pub to_base: ReferencePeriod,
}

impl fmt::Display for MissingChainingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No chaining factor found for {} from {} to {}; figure may be approximate",
            self.index_family, self.from_base, self.to_base
        )
    }
}
