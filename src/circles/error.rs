use thiserror::Error;

use crate::cache::RemoteFailure;
use crate::error::ServiceError;

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("Network error: {0}")]
  Unreachable(String),

  #[error("Resource not found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Request rejected ({status}): {body}")]
  Rejected { status: u16, body: String },

  #[error("Service unavailable ({status}): {body}")]
  Unavailable { status: u16, body: String },

  #[error("Invalid response: {0}")]
  InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
  /// Truncate a response body to avoid logging excessive data
  fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
      body.to_string()
    } else {
      let mut end = MAX_ERROR_BODY_LENGTH;
      while !body.is_char_boundary(end) {
        end -= 1;
      }
      format!(
        "{}... (truncated, {} total bytes)",
        &body[..end],
        body.len()
      )
    }
  }

  pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
    let truncated = Self::truncate_body(body);
    match status.as_u16() {
      404 => ApiError::NotFound(truncated),
      409 => ApiError::Conflict(truncated),
      // The backend or a gateway in front of it is not serving requests
      502..=504 => ApiError::Unavailable {
        status: status.as_u16(),
        body: truncated,
      },
      code => ApiError::Rejected {
        status: code,
        body: truncated,
      },
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      ApiError::InvalidResponse(e.to_string())
    } else if let Some(status) = e.status() {
      ApiError::from_status(status, &e.to_string())
    } else {
      ApiError::Unreachable(e.to_string())
    }
  }
}

impl RemoteFailure for ApiError {
  fn is_unreachable(&self) -> bool {
    matches!(
      self,
      ApiError::Unreachable(_) | ApiError::Unavailable { .. } | ApiError::InvalidResponse(_)
    )
  }

  fn is_missing(&self) -> bool {
    matches!(self, ApiError::NotFound(_))
  }
}

impl From<ApiError> for ServiceError {
  fn from(e: ApiError) -> Self {
    match e {
      ApiError::NotFound(body) => ServiceError::NotFound(body),
      ApiError::Conflict(body) => ServiceError::Conflict(body),
      ApiError::Rejected { status, body } => ServiceError::RemoteRejected {
        status,
        message: body,
      },
      other => ServiceError::RemoteUnreachable(other.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::StatusCode;

  #[test]
  fn test_status_mapping() {
    assert!(matches!(
      ApiError::from_status(StatusCode::NOT_FOUND, ""),
      ApiError::NotFound(_)
    ));
    assert!(matches!(
      ApiError::from_status(StatusCode::CONFLICT, "dup"),
      ApiError::Conflict(_)
    ));
    assert!(matches!(
      ApiError::from_status(StatusCode::BAD_REQUEST, "name required"),
      ApiError::Rejected { status: 400, .. }
    ));
    assert!(matches!(
      ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, ""),
      ApiError::Rejected { status: 500, .. }
    ));
    assert!(matches!(
      ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, ""),
      ApiError::Unavailable { status: 503, .. }
    ));
  }

  #[test]
  fn test_fallback_classification() {
    assert!(ApiError::Unreachable("refused".into()).is_unreachable());
    assert!(ApiError::InvalidResponse("empty".into()).is_unreachable());
    assert!(!ApiError::from_status(StatusCode::BAD_REQUEST, "").is_unreachable());
    assert!(ApiError::NotFound(String::new()).is_missing());
  }

  #[test]
  fn test_body_truncation() {
    let body = "x".repeat(2000);
    let msg = ApiError::truncate_body(&body);
    assert!(msg.starts_with(&"x".repeat(500)));
    assert!(msg.ends_with("(truncated, 2000 total bytes)"));
  }

  #[test]
  fn test_into_service_error() {
    let err: ServiceError = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad").into();
    assert_eq!(err.kind(), "remote-rejected");
    let err: ServiceError = ApiError::Unreachable("refused".into()).into();
    assert_eq!(err.kind(), "remote-unreachable");
  }
}
