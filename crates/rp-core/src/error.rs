//! Core error types
//!
//! Configuration failures and the field-keyed validation error collection used
//! when a query is assembled.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable not set: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Config file error: {0}")]
    FileError(String),
}

/// Validation errors collection
///
/// Field errors are kept in a sorted map so rendered messages are stable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: BTreeMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Get errors for a specific field
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// `Ok(())` when empty, otherwise the collected errors
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_messages().join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_collect() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.add("name", "is not a column of person");
        errors.add("name", "expects text");
        errors.add_base("projection is empty");

        assert!(!errors.is_empty());
        assert!(errors.has_error("name"));
        assert_eq!(errors.get("name").map(Vec::len), Some(2));
        assert_eq!(
            errors.full_messages(),
            vec![
                "projection is empty".to_string(),
                "name is not a column of person".to_string(),
                "name expects text".to_string(),
            ]
        );
    }

    #[test]
    fn test_validation_errors_display_is_sorted() {
        let mut errors = ValidationErrors::new();
        errors.add("zeta", "is unknown");
        errors.add("alpha", "is unknown");

        assert_eq!(errors.to_string(), "alpha is unknown; zeta is unknown");
    }

    #[test]
    fn test_merge_and_into_result() {
        let mut left = ValidationErrors::new();
        left.add("id", "expects bigint");
        let mut right = ValidationErrors::new();
        right.add("id", "is ambiguous");
        right.add_base("no columns");

        left.merge(right);
        assert_eq!(left.get("id").map(Vec::len), Some(2));
        assert_eq!(left.base_errors.len(), 1);

        assert!(left.into_result().is_err());
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
