//! Per-field request validation errors.
//!
//! Handlers collect shape problems into a [`FieldErrors`] map and bail with
//! a single 422 carrying every offending field, in the
//! `{"errors": {"field": ["message"]}}` form clients already consume.

use std::collections::BTreeMap;

use serde::Serialize;

/// A map of field name to validation messages.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty error map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// True if no field has errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when empty, otherwise `Err(self)` for `?`-style bailing.
    ///
    /// # Errors
    ///
    /// Returns `self` when any field has a recorded message.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_messages_accumulate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("email", "The email field is required.");
        errors.add("email", "The email must be a valid email address.");
        errors.add("password", "The password field is required.");

        let err = errors.into_result().unwrap_err();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["email"].as_array().unwrap().len(), 2);
        assert_eq!(json["password"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_serializes_transparently() {
        let mut errors = FieldErrors::new();
        errors.add("otp", "The otp must be 6 digits.");

        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(json, r#"{"otp":["The otp must be 6 digits."]}"#);
    }
}
