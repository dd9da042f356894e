//! Calendar date parsing for contract and index dates.

use crate::ValidationError;
use chrono::{Datelike, NaiveDate};

/// Parse a contract or index date.
///
/// Accepts `YYYY-MM-DD` and month-granular `YYYY-MM` (first day of the
/// month). Anything else is [`ValidationError::MalformedDate`].
pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    let malformed = || ValidationError::MalformedDate {
        input: input.to_string(),
    };

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    // Month form: exactly one dash.
    if trimmed.matches('-').count() == 1 {
        return NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
            .map_err(|_| malformed());
    }

    Err(malformed())
}

/// First day of the month `date` falls in.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day0(0).unwrap_or(date)
}
