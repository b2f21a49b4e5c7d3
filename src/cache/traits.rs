//! Core traits and types for the shadow cache.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Display;

/// Trait for entities whose authoritative copy lives on a remote service.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique identifier for this entity (e.g., circle id)
  fn cache_key(&self) -> String;

  /// Entity type name for storage organization (e.g., "circle")
  fn entity_type() -> &'static str;
}

/// A shadow copy together with the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntity<T> {
  pub entity: T,
  pub cached_at: DateTime<Utc>,
}

impl<T> CachedEntity<T> {
  pub fn new(entity: T, cached_at: DateTime<Utc>) -> Self {
    Self { entity, cached_at }
  }
}

/// Where a result came from.
///
/// `Remote` data is authoritative. `Cached` data is a best-effort local copy,
/// either read back from the shadow cache or synthesized while offline.
#[derive(Debug, Clone, PartialEq)]
pub enum Sourced<T> {
  Remote(T),
  Cached(CachedEntity<T>),
}

impl<T> Sourced<T> {
  pub fn data(&self) -> &T {
    match self {
      Sourced::Remote(data) => data,
      Sourced::Cached(cached) => &cached.entity,
    }
  }

  pub fn into_inner(self) -> T {
    match self {
      Sourced::Remote(data) => data,
      Sourced::Cached(cached) => cached.entity,
    }
  }

  pub fn is_remote(&self) -> bool {
    matches!(self, Sourced::Remote(_))
  }

  /// When the local copy was written; `None` for remote data.
  pub fn cached_at(&self) -> Option<DateTime<Utc>> {
    match self {
      Sourced::Remote(_) => None,
      Sourced::Cached(cached) => Some(cached.cached_at),
    }
  }
}

/// Classification a remote error must expose so the cache layer can decide
/// whether to fall back.
pub trait RemoteFailure: Display {
  /// The remote could not be reached or gave no usable answer.
  fn is_unreachable(&self) -> bool;

  /// The remote answered that the record does not exist.
  fn is_missing(&self) -> bool;
}

/// When a failed remote call may be replaced by local data.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
  /// Only transport failures, timeouts and unavailable responses
  #[default]
  Unreachable,
  /// Any failure, including requests the remote rejected
  Any,
}

impl FallbackPolicy {
  /// Whether `error` permits the local path. Reads also fall back when the
  /// remote reports the record missing, since the shadow may hold a record
  /// the remote has never seen.
  pub fn permits<E: RemoteFailure>(self, error: &E, is_read: bool) -> bool {
    match self {
      FallbackPolicy::Any => true,
      FallbackPolicy::Unreachable => error.is_unreachable() || (is_read && error.is_missing()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Failure {
    unreachable: bool,
    missing: bool,
  }

  impl Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      write!(f, "failure")
    }
  }

  impl RemoteFailure for Failure {
    fn is_unreachable(&self) -> bool {
      self.unreachable
    }

    fn is_missing(&self) -> bool {
      self.missing
    }
  }

  const OFFLINE: Failure = Failure {
    unreachable: true,
    missing: false,
  };
  const MISSING: Failure = Failure {
    unreachable: false,
    missing: true,
  };
  const REJECTED: Failure = Failure {
    unreachable: false,
    missing: false,
  };

  #[test]
  fn test_strict_policy() {
    let policy = FallbackPolicy::Unreachable;
    assert!(policy.permits(&OFFLINE, false));
    assert!(policy.permits(&MISSING, true));
    assert!(!policy.permits(&MISSING, false));
    assert!(!policy.permits(&REJECTED, true));
  }

  #[test]
  fn test_any_policy() {
    assert!(FallbackPolicy::Any.permits(&REJECTED, false));
  }

  #[test]
  fn test_sourced_accessors() {
    let remote = Sourced::Remote(1);
    assert!(remote.is_remote());
    assert_eq!(remote.cached_at(), None);

    let now = Utc::now();
    let cached = Sourced::Cached(CachedEntity::new(2, now));
    assert!(!cached.is_remote());
    assert_eq!(*cached.data(), 2);
    assert_eq!(cached.cached_at(), Some(now));
  }
}
