//! Constructor Validation - Collect, Don't Short-Circuit
//!
//! Drawable constructors run every check and report all violations at once.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every violation found while constructing one drawable.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{}", join(.violations))]
pub struct ValidationErrors {
    pub violations: Vec<Violation>,
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Vec<Violation>> for ValidationErrors {
    fn from(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

/// Accumulates violations for one drawable config.
#[derive(Debug, Default)]
pub struct Checks {
    violations: Vec<Violation>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.violations.push(Violation::new(field, message));
        }
        self
    }

    pub fn non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        self.require(!value.trim().is_empty(), field, "must not be empty")
    }

    pub fn positive(&mut self, field: &str, value: f64) -> &mut Self {
        self.require(value.is_finite() && value > 0.0, field, "must be a positive number")
    }

    pub fn non_negative(&mut self, field: &str, value: f64) -> &mut Self {
        self.require(
            value.is_finite() && value >= 0.0,
            field,
            "must be zero or a positive number",
        )
    }

    pub fn percent(&mut self, field: &str, value: f64) -> &mut Self {
        self.require(
            value.is_finite() && (0.0..=100.0).contains(&value),
            field,
            "must be between 0 and 100",
        )
    }

    pub fn finish<T>(&mut self, value: T) -> Result<T, ValidationErrors> {
        if self.violations.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors::from(std::mem::take(&mut self.violations)))
        }
    }
}
