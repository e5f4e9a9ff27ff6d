//! Record error taxonomy.
//!
//! Every store and service operation fails with a `RecordError`. The
//! three client-facing variants map one-to-one onto HTTP statuses in
//! `adapters::http::error`; `Storage` carries infrastructure failures.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use super::record::RecordId;

/// Message attached to the `date` field when the uniqueness check fails.
pub const DUPLICATE_DATE_MESSAGE: &str = "skin record with this date already exists.";

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors with a single message on one field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` if nothing was collected, the validation error otherwise.
    pub fn into_result(self) -> Result<(), RecordError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(RecordError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Failure of a record operation.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Missing or malformed payload field.
    #[error("invalid payload: {0}")]
    Validation(FieldErrors),

    /// Another record already holds this date.
    #[error("skin record with date {0} already exists")]
    DuplicateDate(NaiveDate),

    /// No record with the given id.
    #[error("no skin record with id {0}")]
    NotFound(RecordId),

    /// Database or filesystem failure.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl RecordError {
    /// True for the errors a client can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_collect_and_display() {
        let mut errors = FieldErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.add("date", "This field is required.");
        errors.add("image", "The submitted file is empty.");
        assert_eq!(
            errors.to_string(),
            "date: This field is required.; image: The submitted file is empty."
        );
        assert_eq!(errors.get("date").map(<[String]>::len), Some(1));

        let err = errors.into_result().unwrap_err();
        assert!(matches!(err, RecordError::Validation(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_field_errors_serialize_as_map() {
        let errors = FieldErrors::single("date", "This field may not be null.");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["date"][0], "This field may not be null.");
    }

    #[test]
    fn test_storage_error_is_not_client_error() {
        let err = RecordError::from(anyhow::anyhow!("disk full"));
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "disk full");
    }
}
