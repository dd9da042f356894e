//! Error types for rentlink operations

use thiserror::Error;

/// Configuration errors.
///
/// Raised for requests or settings the engine cannot serve. These are
/// surfaced to the caller immediately and never defaulted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unsupported index family: {family}")]
    UnsupportedIndexFamily { family: String },

    #[error("Reference period table is empty")]
    EmptyPeriodTable,

    #[error("Reference period table out of order: threshold {next} follows {previous}")]
    UnorderedPeriodTable { previous: i32, next: i32 },

    #[error("Duplicate reference period label: {label}")]
    DuplicatePeriodLabel { label: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Input validation errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be strictly positive, got {value}")]
    NonPositive { field: String, value: f64 },

    #[error("{field} must be a finite number")]
    NonFinite { field: String },

    #[error("Malformed date: {input:?}")]
    MalformedDate { input: String },

    #[error("Value {value} out of range for {field}: {reason}")]
    OutOfRange {
        field: String,
        value: f64,
        reason: String,
    },
}

/// Chaining-table source errors.
///
/// Produced by chaining-table source implementations. The cache recovers
/// from these locally; they never reach callers of the resolver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Chaining table for {family} unavailable: {reason}")]
    Unavailable { family: String, reason: String },

    #[error("Chaining table fetch for {family} timed out")]
    Timeout { family: String },
}

/// Master error type for all rentlink errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RentlinkError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Result type alias for rentlink operations.
pub type RentlinkResult<T> = Result<T, RentlinkError>;

/// Reject non-finite and non-positive numbers for `field`.
pub(crate) fn require_positive(field: &str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            field: field.to_string(),
        });
    }
    if value <= 0.0 {
        return Err(ValidationError::NonPositive {
            field: field.to_string(),
            value,
        });
    }
    Ok(value)
}

// =============================================================================
// TESTS
// =============================================================================
