//! Construction invariants shared by the entity factories.

use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_core::traits::EntityId;

/// Trim a required string, rejecting blanks.
pub fn required_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional string, mapping blanks to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reject negative integers.
pub fn non_negative(field: &str, value: i64) -> AppResult<i64> {
    if value < 0 {
        return Err(AppError::validation(format!(
            "{field} must not be negative (got {value})"
        )));
    }
    Ok(value)
}

/// Reject negative, infinite, and NaN measurements.
pub fn non_negative_measure(field: &str, value: f64) -> AppResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be a finite, non-negative number (got {value})"
        )));
    }
    Ok(value)
}

/// Reject foreign keys that cannot point at a stored row.
pub fn reference(field: &str, id: EntityId) -> AppResult<EntityId> {
    if id <= 0 {
        return Err(AppError::validation(format!(
            "{field} must reference a stored record (got {id})"
        )));
    }
    Ok(id)
}
