//! Field checks applied before a record is built or patched.

use time::Date;
use time::macros::format_description;

use crate::error::StorageError;
use crate::models::AmountInput;

/// Largest amount accepted by any form.
pub const MAX_AMOUNT: f64 = 999_999_999.0;

/// Parse a user-typed amount: finite, greater than zero, at most `MAX_AMOUNT`.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    check_amount(value)
}

#[must_use]
pub fn is_valid_amount(raw: &str) -> bool {
    parse_amount(raw).is_some()
}

/// Bounds apply to the value as stored, after rounding to cents.
fn check_amount(value: f64) -> Option<f64> {
    let cents = round_cents(value);
    (cents.is_finite() && cents > 0.0 && cents <= MAX_AMOUNT).then_some(cents)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Coerce a string or numeric amount into a validated `f64`.
///
/// # Errors
///
/// Returns `ValidationFailed` when the amount is not a positive number up
/// to `MAX_AMOUNT`.
pub fn coerce_amount(input: &AmountInput) -> Result<f64, StorageError> {
    let parsed = match input {
        AmountInput::Number(value) => check_amount(*value),
        AmountInput::Text(raw) => parse_amount(raw),
    };
    parsed.ok_or_else(|| StorageError::ValidationFailed(format!("amount must be between 0.01 and {MAX_AMOUNT}")))
}

/// True for a `YYYY-MM-DD` calendar date that actually exists.
#[must_use]
pub fn is_valid_date(raw: &str) -> bool {
    Date::parse(raw, format_description!("[year]-[month]-[day]")).is_ok()
}

/// True for `#rgb` or `#rrggbb`.
#[must_use]
pub fn is_valid_hex_color(raw: &str) -> bool {
    let Some(hex) = raw.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Trim `value` and reject it when empty.
///
/// # Errors
///
/// Returns `ValidationFailed` naming `field`.
pub fn required(field: &str, value: &str) -> Result<String, StorageError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StorageError::ValidationFailed(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

/// # Errors
///
/// Returns `ValidationFailed` when `raw` is not a `YYYY-MM-DD` date.
pub fn required_date(raw: &str) -> Result<String, StorageError> {
    let trimmed = raw.trim();
    if !is_valid_date(trimmed) {
        return Err(StorageError::ValidationFailed(format!("date '{raw}' is not a valid YYYY-MM-DD date")));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
