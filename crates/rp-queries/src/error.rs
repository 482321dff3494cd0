//! Query errors

use rp_core::ValidationErrors;

/// Error raised while assembling a query
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    /// The query references things the relation does not have
    #[error("Invalid query on {relation}: {errors}")]
    Invalid {
        relation: String,
        errors: ValidationErrors,
    },

    #[error("Malformed filter: {0}")]
    MalformedFilter(String),
}

impl QueryError {
    pub fn invalid(relation: impl Into<String>, errors: ValidationErrors) -> Self {
        Self::Invalid {
            relation: relation.into(),
            errors,
        }
    }

    /// Collected validation errors, if any
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Invalid { errors, .. } => Some(errors),
            Self::MalformedFilter(_) => None,
        }
    }
}
