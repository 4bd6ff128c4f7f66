//! Utility functions shared across the application.

mod secret;

pub use secret::SecretString;

use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

static POSITIVE_INT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[1-9]\d*$").unwrap_or_else(|e| panic!("invalid built-in pattern: {e}"))
});

/// Parse a form value that must be a positive whole number.
///
/// Leading zeros, signs, decimals and blanks are rejected rather than coerced.
pub fn parse_positive_int(field: &'static str, value: &str) -> Result<u32, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }

    if !POSITIVE_INT.is_match(trimmed) {
        return Err(ValidationError::NotPositive {
            field,
            value: trimmed.to_string(),
        });
    }

    trimmed.parse().map_err(|_| ValidationError::NotPositive {
        field,
        value: trimmed.to_string(),
    })
}

/// Trim a required text field, rejecting blanks.
pub fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(trimmed.to_string())
    }
}
