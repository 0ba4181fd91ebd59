use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field-tagged validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted path of the offending field (e.g. `meta.nightFeeding`)
    pub field: String,
    /// Human-readable explanation
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

/// Push a violation when a trimmed string is empty.
pub(crate) fn require_text(field: &str, value: &str, violations: &mut Vec<Violation>) {
    if value.trim().is_empty() {
        violations.push(Violation::new(field, "must not be empty"));
    }
}

/// Push a violation when an optional trimmed string is present but empty.
pub(crate) fn optional_text(field: &str, value: Option<&str>, violations: &mut Vec<Violation>) {
    if let Some(value) = value {
        require_text(field, value, violations);
    }
}

/// Push a violation when a number is negative or not finite.
pub(crate) fn non_negative(field: &str, value: Option<f64>, violations: &mut Vec<Violation>) {
    if let Some(value) = value {
        if !value.is_finite() || value < 0.0 {
            violations.push(Violation::new(field, "must be a non-negative number"));
        }
    }
}
