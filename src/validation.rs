//! Validation of records and analysis parameters.
//!
//! Rules are expressed through the [`Validate`] trait and report every failure
//! at once as a list of [`ValidationError`]s, so a caller can show all problems
//! with a mapping or a parameter set in one pass.
//!
//! The cleaner uses [`Validate`] on [`CanonicalTransaction`] for its final
//! validity filter; configuration uses the [`validators`] helpers for range
//! checks.

use crate::records::CanonicalTransaction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for validation operations.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Types that can check their own invariants.
pub trait Validate {
    /// Validate this instance and return every violated rule.
    fn validate(&self) -> ValidationResult;

    /// Shorthand for `self.validate().is_ok()`.
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// The field that failed validation (optional)
    pub field: Option<String>,
    /// Human-readable error message
    pub message: String,
    /// Error code for categorization (optional)
    pub code: Option<String>,
}

impl ValidationError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            field: None,
            message: message.into(),
            code: None,
        }
    }

    pub fn field<S: Into<String>, M: Into<String>>(field: S, message: M) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code<S: Into<String>>(mut self, code: S) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref field) = self.field {
            write!(f, "[{}] {}", field, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(ref code) = self.code {
            write!(f, " (code: {})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Render a list of errors as one line, e.g. for an `anyhow` message.
#[must_use]
pub fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Validate for CanonicalTransaction {
    fn validate(&self) -> ValidationResult {
        combine_validations(vec![
            validators::not_blank("invoice_id", &self.invoice_id),
            validators::not_blank("description", &self.description),
            validators::positive("total_price", self.total_price),
        ])
    }
}

/// Reusable rule helpers.
pub mod validators {
    use super::{ValidationError, ValidationResult};
    use std::fmt;

    /// The string must contain something other than whitespace.
    pub fn not_blank(field: &str, value: &str) -> ValidationResult {
        if value.trim().is_empty() {
            Err(vec![ValidationError::field(field, "must not be empty")])
        } else {
            Ok(())
        }
    }

    /// The number must be finite and strictly greater than zero.
    pub fn positive(field: &str, value: f64) -> ValidationResult {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(vec![ValidationError::field(
                field,
                format!("must be a positive number, got {value}"),
            )])
        }
    }

    /// Inclusive range check. NaN never passes.
    pub fn in_range<T: PartialOrd + fmt::Display>(
        field: &str,
        value: T,
        min: T,
        max: T,
    ) -> ValidationResult {
        if value >= min && value <= max {
            Ok(())
        } else {
            Err(vec![ValidationError::field(
                field,
                format!("must be between {} and {}, got {}", min, max, value),
            )])
        }
    }

    /// Lower bound check. NaN never passes.
    pub fn at_least<T: PartialOrd + fmt::Display>(field: &str, value: T, min: T) -> ValidationResult {
        if value >= min {
            Ok(())
        } else {
            Err(vec![ValidationError::field(
                field,
                format!("must be at least {}, got {}", min, value),
            )])
        }
    }
}

/// Combine multiple validation results.
pub fn combine_validations(results: Vec<ValidationResult>) -> ValidationResult {
    let mut all_errors = Vec::new();
    for result in results {
        if let Err(mut errors) = result {
            all_errors.append(&mut errors);
        }
    }
    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::validators::*;
    use super::*;

    #[test]
    fn nan_fails_range_checks() {
        assert!(in_range("x", f64::NAN, 0.0, 1.0).is_err());
        assert!(at_least("x", f64::NAN, 0.0).is_err());
        assert!(positive("x", f64::NAN).is_err());
    }

    #[test]
    fn display_includes_field_and_code() {
        let e = ValidationError::field("quantity", "bad").with_code("c1");
        assert_eq!(e.to_string(), "[quantity] bad (code: c1)");
    }
}
