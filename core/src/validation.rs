use chrono::{Months, NaiveDate};
use thiserror::Error;

/// Number of years in the past a weight entry may be dated.
pub const MAX_YEARS_PAST: u32 = 5;

/// Input rejected before any storage access is attempted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Date {date} is outside the allowed range ({min} to {max})")]
    DateOutOfRange {
        date: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },
    #[error("Invalid date '{0}'. Must be YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Weight must be a number greater than 0")]
    NonPositiveWeight,
    #[error("Height must be a number greater than 0")]
    NonPositiveHeight,
    #[error("Invalid {kind} '{value}'. Must be one of: {allowed}")]
    UnsupportedValue {
        kind: &'static str,
        value: String,
        allowed: String,
    },
}

/// Earliest date a weight entry may carry, relative to `today`.
#[must_use]
pub fn min_allowed_date(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_months(Months::new(MAX_YEARS_PAST * 12))
        .unwrap_or(NaiveDate::MIN)
}

#[must_use]
pub fn max_allowed_date(today: NaiveDate) -> NaiveDate {
    today
}

/// Inclusive on both ends: `[today - 5 years, today]`.
#[must_use]
pub fn is_date_in_allowed_range(date: NaiveDate, today: NaiveDate) -> bool {
    date >= min_allowed_date(today) && date <= max_allowed_date(today)
}

pub fn ensure_date_in_allowed_range(
    date: NaiveDate,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    if is_date_in_allowed_range(date, today) {
        Ok(())
    } else {
        Err(ValidationError::DateOutOfRange {
            date,
            min: min_allowed_date(today),
            max: max_allowed_date(today),
        })
    }
}

/// A weight in kilograms must be a finite number above zero.
pub fn ensure_positive_weight(weight_kg: f64) -> Result<f64, ValidationError> {
    if weight_kg.is_finite() && weight_kg > 0.0 {
        Ok(weight_kg)
    } else {
        Err(ValidationError::NonPositiveWeight)
    }
}

pub fn ensure_positive_height(height_cm: f64) -> Result<f64, ValidationError> {
    if height_cm.is_finite() && height_cm > 0.0 {
        Ok(height_cm)
    } else {
        Err(ValidationError::NonPositiveHeight)
    }
}

pub fn parse_iso_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate(s.into()))
}
