//! Uniform success/data/error wrapper returned across the UI boundary.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Response envelope.
///
/// Exactly one of three shapes goes over the wire:
/// `{"success":true,"data":...}`, `{"success":true}` for void operations,
/// or `{"success":false,"error":"..."}`. Callers check `success` before
/// reading `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<T>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl<T> Envelope<T> {
  pub fn ok(data: T) -> Self {
    Self {
      success: true,
      data: Some(data),
      error: None,
    }
  }

  /// Successful envelope with no payload (e.g. delete).
  pub fn ok_empty() -> Self {
    Self {
      success: true,
      data: None,
      error: None,
    }
  }

  pub fn fail(error: impl Into<String>) -> Self {
    Self {
      success: false,
      data: None,
      error: Some(error.into()),
    }
  }

  /// Back to a `Result`; a successful void envelope yields `Ok(None)`.
  pub fn into_result(self) -> Result<Option<T>, String> {
    if self.success {
      Ok(self.data)
    } else {
      Err(self.error.unwrap_or_else(|| "Unknown error".to_string()))
    }
  }
}

impl<T> From<Result<T, ServiceError>> for Envelope<T> {
  fn from(result: Result<T, ServiceError>) -> Self {
    match result {
      Ok(data) => Envelope::ok(data),
      Err(e) => Envelope::fail(e.to_string()),
    }
  }
}

impl From<Result<(), ServiceError>> for Envelope<serde_json::Value> {
  fn from(result: Result<(), ServiceError>) -> Self {
    match result {
      Ok(()) => Envelope::ok_empty(),
      Err(e) => Envelope::fail(e.to_string()),
    }
  }
}
