//! Error taxonomy shared by the vehicle repository and the circle accessor.

use std::fmt;

use rusqlite::ErrorCode;
use serde::Serialize;
use thiserror::Error;

/// A single violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
  pub field: String,
  pub message: String,
}

impl FieldViolation {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      message: message.into(),
    }
  }
}

/// Every constraint a candidate record violated, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
  violations: Vec<FieldViolation>,
}

impl ValidationErrors {
  pub fn new() -> Self {
    Self::default()
  }

  /// Failure for a partial update that supplied nothing.
  pub fn no_fields() -> Self {
    let mut errors = Self::new();
    errors.push("*", "No fields to update");
    errors
  }

  pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.violations.push(FieldViolation::new(field, message));
  }

  pub fn is_empty(&self) -> bool {
    self.violations.is_empty()
  }

  pub fn violations(&self) -> &[FieldViolation] {
    &self.violations
  }

  /// Whether any violation was reported against `field`.
  pub fn has(&self, field: &str) -> bool {
    self.violations.iter().any(|v| v.field == field)
  }

  /// `Ok(value)` when nothing was reported, otherwise the collected errors.
  pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
    if self.is_empty() {
      Ok(value)
    } else {
      Err(self)
    }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self
      .violations
      .iter()
      .map(|v| {
        if v.field == "*" {
          v.message.clone()
        } else {
          format!("{}: {}", v.field, v.message)
        }
      })
      .collect();
    write!(f, "{}", parts.join(", "))
  }
}

impl std::error::Error for ValidationErrors {}

/// Failures that cross the repository / accessor boundary.
#[derive(Error, Debug)]
pub enum ServiceError {
  #[error("Validation failed: {0}")]
  Validation(#[from] ValidationErrors),

  #[error("{0} not found")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Remote unreachable: {0}")]
  RemoteUnreachable(String),

  #[error("Remote rejected request ({status}): {message}")]
  RemoteRejected { status: u16, message: String },

  #[error("Storage unavailable: {0}")]
  StorageUnavailable(String),
}

impl ServiceError {
  /// Stable, machine-readable name of the failure class.
  pub fn kind(&self) -> &'static str {
    match self {
      ServiceError::Validation(_) => "validation-error",
      ServiceError::NotFound(_) => "not-found",
      ServiceError::Conflict(_) => "conflict",
      ServiceError::RemoteUnreachable(_) => "remote-unreachable",
      ServiceError::RemoteRejected { .. } => "remote-rejected",
      ServiceError::StorageUnavailable(_) => "storage-unavailable",
    }
  }

  /// Single-field validation failure.
  pub fn invalid(field: &str, message: &str) -> Self {
    let mut errors = ValidationErrors::new();
    errors.push(field, message);
    ServiceError::Validation(errors)
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, ServiceError::NotFound(_))
  }

  pub fn is_conflict(&self) -> bool {
    matches!(self, ServiceError::Conflict(_))
  }

  pub fn is_validation(&self) -> bool {
    matches!(self, ServiceError::Validation(_))
  }
}

impl From<rusqlite::Error> for ServiceError {
  fn from(e: rusqlite::Error) -> Self {
    match e {
      rusqlite::Error::SqliteFailure(ref err, ref detail)
        if err.code == ErrorCode::ConstraintViolation =>
      {
        ServiceError::Conflict(detail.clone().unwrap_or_else(|| e.to_string()))
      }
      other => ServiceError::StorageUnavailable(other.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validation_display_lists_every_field() {
    let mut errors = ValidationErrors::new();
    errors.push("make", "Make is required");
    errors.push("year", "Year must be 1900 or later");
    assert_eq!(
      errors.to_string(),
      "make: Make is required, year: Year must be 1900 or later"
    );
  }

  #[test]
  fn test_no_fields_display() {
    assert_eq!(ValidationErrors::no_fields().to_string(), "No fields to update");
  }

  #[test]
  fn test_kind_names() {
    assert_eq!(
      ServiceError::NotFound("Vehicle 1".into()).kind(),
      "not-found"
    );
    assert_eq!(
      ServiceError::invalid("id", "bad").kind(),
      "validation-error"
    );
    assert_eq!(
      ServiceError::RemoteRejected {
        status: 400,
        message: "bad".into()
      }
      .kind(),
      "remote-rejected"
    );
  }

  #[test]
  fn test_constraint_violation_maps_to_conflict() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn
      .execute_batch("CREATE TABLE t (v TEXT UNIQUE); INSERT INTO t (v) VALUES ('a');")
      .unwrap();
    let err = conn
      .execute("INSERT INTO t (v) VALUES ('a')", [])
      .unwrap_err();
    assert!(ServiceError::from(err).is_conflict());
  }

  #[test]
  fn test_other_sqlite_errors_are_storage_unavailable() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let err = conn.execute("SELECT * FROM missing", []).unwrap_err();
    assert_eq!(ServiceError::from(err).kind(), "storage-unavailable");
  }
}
