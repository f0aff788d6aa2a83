//! # Validation Errors
//!
//! Structured per-field validation errors.
//!
//! A failed validation is data, not an exception: the caller receives a
//! `ValidationErrors` and decides what the user sees. Each field keeps at
//! most one message.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Error code for categorizing validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Required field is missing
    Required,
    /// Value is invalid type
    InvalidType,
    /// Value is too short
    TooShort,
    /// Value is too long
    TooLong,
    /// Value doesn't match pattern
    InvalidFormat,
    /// Value differs from its confirmation
    Mismatch,
    /// Custom validation failed
    Custom,
}

/// A single validation error for a specific field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
}

impl FieldError {
    /// Create a new field error
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }
}

/// Per-field validation errors in rule-map order
///
/// Fields without a failing rule are absent. Serializes to
/// `{"field": {"error_message": "..."}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `error` for its field, replacing any earlier error for that field
    pub fn set(&mut self, error: FieldError) {
        match self.errors.iter_mut().find(|e| e.field == error.field) {
            Some(slot) => *slot = error,
            None => self.errors.push(error),
        }
    }

    /// Error recorded for `field`
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    /// Message recorded for `field`
    #[must_use]
    pub fn message(&self, field: &str) -> Option<&str> {
        self.get(field).map(|e| e.message.as_str())
    }

    /// Whether `field` failed
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of failing fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate errors in field order
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Convert to JSON response body
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            error_message: &'a str,
        }

        let mut map = serializer.serialize_map(Some(self.errors.len()))?;
        for error in &self.errors {
            map.serialize_entry(
                &error.field,
                &Entry {
                    error_message: &error.message,
                },
            )?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_keeps_one_error_per_field() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.set(FieldError::new("name", "first", ValidationCode::Required));
        errors.set(FieldError::new("email", "bad", ValidationCode::InvalidFormat));
        errors.set(FieldError::new("name", "second", ValidationCode::TooShort));

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.message("name"), Some("second"));
        assert_eq!(errors.get("name").map(|e| e.code), Some(ValidationCode::TooShort));
        assert!(!errors.has("password"));
    }

    #[test]
    fn test_order_is_insertion_order() {
        let mut errors = ValidationErrors::new();
        errors.set(FieldError::new("b", "x", ValidationCode::Custom));
        errors.set(FieldError::new("a", "y", ValidationCode::Custom));

        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["b", "a"]);
    }

    #[test]
    fn test_validation_errors_json_shape() {
        let mut errors = ValidationErrors::new();
        errors.set(FieldError::new(
            "email",
            "The field 'email' is required.",
            ValidationCode::Required,
        ));

        let value: serde_json::Value = serde_json::from_str(&errors.to_json()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"email": {"error_message": "The field 'email' is required."}})
        );
    }

    #[test]
    fn test_code_serialization() {
        let json = serde_json::to_string(&ValidationCode::TooShort).unwrap();
        assert_eq!(json, "\"TOO_SHORT\"");
    }
}
