//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// A single broken rule, identified by the field path it concerns
/// (e.g. `projectName`, `items[2].amount`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl core::fmt::Display for Violation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every violation found in one validation pass.
///
/// Validation collects instead of failing fast, so a front end can present all
/// problems with a form at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Whether any violation concerns `field` exactly.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// `Ok(())` when nothing was collected, otherwise `DomainError::Validation`.
    pub fn into_result(self) -> DomainResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (idx, v) in self.violations.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conversion configuration). Storage concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more user-correctable problems.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// A currency that the record's rates cannot convert.
    #[error("unsupported currency '{currency}' in {field}")]
    UnsupportedCurrency { field: String, currency: String },

    /// A required exchange rate is absent or not positive.
    #[error("missing or non-positive rate: {field}")]
    MissingRate { field: String },

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested element was not found (domain-level).
    #[error("not found: {0}")]
    NotFound(String),
}

impl DomainError {
    /// Single-violation validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(field, message);
        Self::Validation(errors)
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unsupported_currency(field: impl Into<String>, currency: impl Into<String>) -> Self {
        Self::UnsupportedCurrency {
            field: field.into(),
            currency: currency.into(),
        }
    }

    pub fn missing_rate(field: impl Into<String>) -> Self {
        Self::MissingRate {
            field: field.into(),
        }
    }

    /// Field path the error points at, when it has one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnsupportedCurrency { field, .. } | Self::MissingRate { field } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_errors_are_ok() {
        assert_eq!(ValidationErrors::new().into_result(), Ok(()));
    }

    #[test]
    fn collected_errors_keep_every_violation() {
        let mut errors = ValidationErrors::new();
        errors.push("projectName", "is required");
        errors.push("items[0].amount", "must be greater than zero");

        let err = errors.into_result().unwrap_err();
        match err {
            DomainError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.has_field("projectName"));
                assert!(errors.has_field("items[0].amount"));
                assert_eq!(
                    errors.to_string(),
                    "projectName: is required; items[0].amount: must be greater than zero"
                );
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn conversion_errors_expose_their_field() {
        let err = DomainError::missing_rate("thirdCurrencyRate");
        assert_eq!(err.field(), Some("thirdCurrencyRate"));

        let err = DomainError::unsupported_currency("items[1].currency", "EUR");
        assert_eq!(err.field(), Some("items[1].currency"));
        assert_eq!(err.to_string(), "unsupported currency 'EUR' in items[1].currency");

        assert_eq!(DomainError::invariant("x").field(), None);
    }
}
