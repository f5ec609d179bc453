//! Error types shared by the serializers, stores and password hashing.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Reason messages, kept identical across record kinds.
pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";

/// One problem with one field of an incoming representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
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

/// Every field-level problem found while validating a representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {}", join_errors(.errors))]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn single(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(vec![FieldError::new(field, reason)])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Names of the offending fields, first occurrence order, no duplicates.
    pub fn fields(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in &self.errors {
            if !out.contains(&e.field.as_str()) {
                out.push(&e.field);
            }
        }
        out
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn reasons_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.reason.as_str())
            .collect()
    }

    /// `{"field": ["reason", ...]}`, the shape handed back to API callers.
    pub fn to_representation(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for field in self.fields() {
            let reasons = self
                .reasons_for(field)
                .into_iter()
                .map(|r| Value::String(r.to_string()))
                .collect();
            map.insert(field.to_string(), Value::Array(reasons));
        }
        map
    }
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures of the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} with key {key} already exists")]
    Conflict { kind: &'static str, key: String },

    #[error("{kind} with key {key} not found")]
    NotFound { kind: &'static str, key: String },

    /// A record without a key reached a store operation that needs one.
    #[error("{kind} record has no key")]
    MissingKey { kind: &'static str },

    /// The largest stored auto key leaves no room for another.
    #[error("{kind} has no free key left")]
    KeysExhausted { kind: &'static str },
}

/// Failures of the password hashing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Invalid hashing parameters: {0}")]
    InvalidParameters(String),
}

/// Anything a serializer operation touching the store can fail with.
#[derive(Debug, Error)]
pub enum SerializerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SerializerError {
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            SerializerError::Validation(v) => Some(v),
            SerializerError::Store(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_deduplicated_in_order() {
        let err = ValidationError::new(vec![
            FieldError::new("user_pw", REQUIRED),
            FieldError::new("user_age", "Ensure this value is less than or equal to 120."),
            FieldError::new("user_pw", NOT_BLANK),
        ]);
        assert_eq!(err.fields(), vec!["user_pw", "user_age"]);
        assert_eq!(err.reasons_for("user_pw"), vec![REQUIRED, NOT_BLANK]);
    }

    #[test]
    fn representation_groups_reasons_by_field() {
        let err = ValidationError::single("user_pw", REQUIRED);
        let rep = err.to_representation();
        assert_eq!(rep["user_pw"], serde_json::json!([REQUIRED]));
    }

    #[test]
    fn display_lists_every_field_error() {
        let err = ValidationError::new(vec![
            FieldError::new("user_id", REQUIRED),
            FieldError::new("user_pw", NOT_BLANK),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: user_id: This field is required.; user_pw: This field may not be blank."
        );
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }
}
