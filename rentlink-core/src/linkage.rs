//! Linkage application: turning index movement into adjusted rent.
//!
//! [`LinkageCalculator`] is a pure, stateless transformation. It never
//! divides by a non-positive index value; invalid input is reported as a
//! [`ValidationError`] before any arithmetic happens.

use crate::date::first_of_month;
use crate::error::require_positive;
use crate::{ChainingResult, ValidationError};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days per year used to prorate annual ceilings.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Inputs for one rent recalculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkageContext {
    pub base_rent: f64,
    pub base_index_value: f64,
    pub current_index_value: f64,
    pub base_date: NaiveDate,
    pub target_date: NaiveDate,
}

impl LinkageContext {
    /// Check that rent and both index values are finite and strictly positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive("base_rent", self.base_rent)?;
        require_positive("base_index_value", self.base_index_value)?;
        require_positive("current_index_value", self.current_index_value)?;
        Ok(())
    }

    /// Years elapsed between base and target date as a fraction of
    /// 365.25-day years, clamped at zero.
    pub fn elapsed_years(&self) -> f64 {
        let days = (self.target_date - self.base_date).num_days().max(0);
        days as f64 / DAYS_PER_YEAR
    }
}

/// Which month's published index applies to a payment month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexTiming {
    /// The latest index known on the payment date: the previous month's.
    #[default]
    Known,
    /// The index published for the payment month itself.
    RespectOf,
}

impl IndexTiming {
    /// First day of the month whose index applies to `payment_month`.
    pub fn index_month(&self, payment_month: NaiveDate) -> NaiveDate {
        let month = first_of_month(payment_month);
        match self {
            IndexTiming::RespectOf => month,
            IndexTiming::Known => month.checked_sub_months(Months::new(1)).unwrap_or(month),
        }
    }
}

/// Contractual modifiers applied on top of the raw index ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkageTerms {
    /// Share of the index movement passed through to rent, in percent.
    pub partial_linkage_pct: f64,
    /// Rent never drops below base rent.
    pub base_index_floor: bool,
    /// Cumulative ceiling in percent per year, prorated by elapsed time.
    pub annual_ceiling_pct: Option<f64>,
    /// Flat cap on the total increase, in percent.
    pub max_increase_pct: Option<f64>,
}

impl Default for LinkageTerms {
    fn default() -> Self {
        Self {
            partial_linkage_pct: 100.0,
            base_index_floor: false,
            annual_ceiling_pct: None,
            max_increase_pct: None,
        }
    }
}

impl LinkageTerms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partial_linkage(mut self, pct: f64) -> Self {
        self.partial_linkage_pct = pct;
        self
    }

    pub fn with_base_index_floor(mut self, enabled: bool) -> Self {
        self.base_index_floor = enabled;
        self
    }

    pub fn with_annual_ceiling(mut self, pct: f64) -> Self {
        self.annual_ceiling_pct = Some(pct);
        self
    }

    pub fn with_max_increase(mut self, pct: f64) -> Self {
        self.max_increase_pct = Some(pct);
        self
    }

    /// Full linkage with no floor or caps.
    pub fn is_full_linkage(&self) -> bool {
        self.partial_linkage_pct == 100.0
            && !self.base_index_floor
            && self.annual_ceiling_pct.is_none()
            && self.max_increase_pct.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let pct = self.partial_linkage_pct;
        if !pct.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "partial_linkage_pct".to_string(),
            });
        }
        if !(0.0..=100.0).contains(&pct) {
            return Err(ValidationError::OutOfRange {
                field: "partial_linkage_pct".to_string(),
                value: pct,
                reason: "must be between 0 and 100".to_string(),
            });
        }
        if let Some(ceiling) = self.annual_ceiling_pct {
            require_positive("annual_ceiling_pct", ceiling)?;
        }
        if let Some(cap) = self.max_increase_pct {
            require_positive("max_increase_pct", cap)?;
        }
        Ok(())
    }

    /// Prorated ceiling as a fraction of base rent, if an annual ceiling is set.
    pub fn prorated_ceiling(&self, context: &LinkageContext) -> Option<f64> {
        self.annual_ceiling_pct
            .map(|pct| pct / 100.0 * context.elapsed_years())
    }

    /// Apply the terms to a raw linkage change (`ratio - 1`).
    fn effective_change(&self, context: &LinkageContext, linkage_change: f64) -> f64 {
        let mut change = linkage_change * (self.partial_linkage_pct / 100.0);
        if self.base_index_floor {
            change = change.max(0.0);
        }
        if let Some(ceiling) = self.prorated_ceiling(context) {
            change = change.min(ceiling);
        }
        if let Some(cap) = self.max_increase_pct {
            change = change.min(cap / 100.0);
        }
        change
    }
}

/// Adjusted rent derived from a [`LinkageContext`]. Never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkageResult {
    pub adjusted_rent: f64,
    pub absolute_delta: f64,
    pub percentage_change: f64,
    /// Chained index ratio before contractual terms.
    pub ratio: f64,
    /// The chaining factor was a fallback; the figure may be approximate.
    pub approximate: bool,
}

impl LinkageResult {
    /// Adjusted rent rounded to whole currency units.
    pub fn rounded_rent(&self) -> f64 {
        self.adjusted_rent.round()
    }
}

/// Applies chaining results and index values to a base rent.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkageCalculator;

impl LinkageCalculator {
    /// Apply full linkage.
    ///
    /// `ratio = (current × factor) / base`, `adjusted_rent = base_rent × ratio`,
    /// `percentage_change = (ratio − 1) × 100`.
    pub fn apply(
        context: &LinkageContext,
        chaining: &ChainingResult,
    ) -> Result<LinkageResult, ValidationError> {
        let ratio = Self::chained_ratio(context, chaining)?;
        let adjusted_rent = require_finite_rent(context.base_rent * ratio)?;

        Ok(LinkageResult {
            adjusted_rent,
            absolute_delta: adjusted_rent - context.base_rent,
            percentage_change: (ratio - 1.0) * 100.0,
            ratio,
            approximate: chaining.unresolved,
        })
    }

    /// Apply linkage under contractual terms.
    ///
    /// Identical to [`LinkageCalculator::apply`] when the terms are full
    /// linkage.
    pub fn apply_with_terms(
        context: &LinkageContext,
        chaining: &ChainingResult,
        terms: &LinkageTerms,
    ) -> Result<LinkageResult, ValidationError> {
        terms.validate()?;
        if terms.is_full_linkage() {
            return Self::apply(context, chaining);
        }

        let ratio = Self::chained_ratio(context, chaining)?;
        let change = terms.effective_change(context, ratio - 1.0);
        let adjusted_rent = require_finite_rent(context.base_rent * (1.0 + change))?;

        Ok(LinkageResult {
            adjusted_rent,
            absolute_delta: adjusted_rent - context.base_rent,
            percentage_change: change * 100.0,
            ratio,
            approximate: chaining.unresolved,
        })
    }

    /// Human-readable derivation of a result.
    pub fn formula(
        context: &LinkageContext,
        chaining: &ChainingResult,
        terms: &LinkageTerms,
        result: &LinkageResult,
    ) -> String {
        let chain = if chaining.needs_chaining {
            format!(" × {}", chaining.factor)
        } else {
            String::new()
        };
        let passed_through = (result.ratio - 1.0) * terms.partial_linkage_pct;
        let limited = (result.percentage_change - passed_through).abs() > 1e-9;
        let mut line = if limited {
            format!(
                "{:.2} × (1 + {:.2}%) = {} (limited by contract terms)",
                context.base_rent,
                result.percentage_change,
                result.rounded_rent()
            )
        } else if terms.partial_linkage_pct == 100.0 {
            format!(
                "{:.2} × ({}{} / {}) = {}",
                context.base_rent,
                context.current_index_value,
                chain,
                context.base_index_value,
                result.rounded_rent()
            )
        } else {
            format!(
                "{:.2} × (1 + ({:.2}% × {}%)) = {}",
                context.base_rent,
                (result.ratio - 1.0) * 100.0,
                terms.partial_linkage_pct,
                result.rounded_rent()
            )
        };
        if result.approximate {
            line.push_str(" (approximate: chaining factor missing)");
        }
        line
    }

    fn chained_ratio(
        context: &LinkageContext,
        chaining: &ChainingResult,
    ) -> Result<f64, ValidationError> {
        context.validate()?;
        let adjusted_target = if chaining.needs_chaining {
            context.current_index_value * require_positive("chaining.factor", chaining.factor)?
        } else {
            context.current_index_value
        };
        Ok(adjusted_target / context.base_index_value)
    }
}

/// Positive finite inputs can still overflow to infinity.
fn require_finite_rent(adjusted_rent: f64) -> Result<f64, ValidationError> {
    if adjusted_rent.is_finite() {
        Ok(adjusted_rent)
    } else {
        Err(ValidationError::NonFinite {
            field: "adjusted_rent".to_string(),
        })
    }
}
