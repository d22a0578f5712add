use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EdenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid alert: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid device catalog entry {node_id}: {reason}")]
    Catalog { node_id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EdenError {
    /// Short error code string sent to clients in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            EdenError::Config(_) => "CONFIG_ERROR",
            EdenError::Validation(_) => "VALIDATION_ERROR",
            EdenError::Catalog { .. } => "CATALOG_ERROR",
            EdenError::Serialization(_) => "SERIALIZATION_ERROR",
            EdenError::Io(_) => "IO_ERROR",
            EdenError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, EdenError>;

/// One rejected field and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path into the payload, e.g. `location.lat`.
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// A raw alert was malformed or out of range. Carries every failing field,
/// not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, reason)],
        }
    }

    /// Turn an accumulated list into `Err` when it is non-empty.
    pub fn check(errors: Vec<FieldError>) -> std::result::Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self { errors })
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.field.as_str())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_passes_on_empty_list() {
        assert!(ValidationError::check(Vec::new()).is_ok());
    }

    #[test]
    fn display_joins_all_fields() {
        let err = ValidationError {
            errors: vec![
                FieldError::new("node_id", "must not be empty"),
                FieldError::new("confidence", "must be greater than 0 and at most 1"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "node_id: must not be empty; confidence: must be greater than 0 and at most 1"
        );
        assert_eq!(EdenError::from(err).code(), "VALIDATION_ERROR");
    }
}
