//! Cache layer that puts a remote authority in front of a local shadow.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ServiceError;

use super::storage::CacheStorage;
use super::traits::{CachedEntity, Cacheable, FallbackPolicy, RemoteFailure, Sourced};

/// Cache layer that manages the remote-first, local-fallback strategy.
///
/// Every call goes to the remote first. A success refreshes the shadow and is
/// returned as [`Sourced::Remote`]. A failure that the [`FallbackPolicy`]
/// permits is answered from the shadow as [`Sourced::Cached`]; any other
/// failure is returned to the caller.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  policy: FallbackPolicy,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      policy: FallbackPolicy::default(),
    }
  }

  /// Set the fallback policy.
  pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Fetch a single entity.
  ///
  /// `Ok(None)` means the remote failed in a way that permits fallback and the
  /// shadow has no entry for `key` either.
  pub async fn fetch_one<T, E, F, Fut>(
    &self,
    key: &str,
    fetcher: F,
  ) -> Result<Option<Sourced<T>>, ServiceError>
  where
    T: Cacheable,
    E: RemoteFailure + Into<ServiceError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    match fetcher().await {
      Ok(data) => {
        self.refresh(std::slice::from_ref(&data));
        Ok(Some(Sourced::Remote(data)))
      }
      Err(e) if self.policy.permits(&e, true) => {
        warn!(entity = T::entity_type(), key, error = %e, "Remote fetch failed, using shadow cache");
        Ok(self.get::<T>(key)?.map(Sourced::Cached))
      }
      Err(e) => Err(e.into()),
    }
  }

  /// Fetch a full list. On permitted failure every shadow of type `T` is
  /// returned, in no particular order.
  pub async fn fetch_list<T, E, F, Fut>(&self, fetcher: F) -> Result<Sourced<Vec<T>>, ServiceError>
  where
    T: Cacheable,
    E: RemoteFailure + Into<ServiceError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
  {
    match fetcher().await {
      Ok(data) => {
        self.refresh(&data);
        Ok(Sourced::Remote(data))
      }
      Err(e) if self.policy.permits(&e, true) => {
        warn!(entity = T::entity_type(), error = %e, "Remote list failed, using shadow cache");
        let cached = self.all::<T>()?;
        let cached_at = cached
          .iter()
          .map(|c| c.cached_at)
          .min()
          .unwrap_or_else(Utc::now);
        let entities = cached.into_iter().map(|c| c.entity).collect();
        Ok(Sourced::Cached(CachedEntity::new(entities, cached_at)))
      }
      Err(e) => Err(e.into()),
    }
  }

  /// Perform a remote write. On permitted failure, `fallback` builds a local
  /// record which is written to the shadow and returned.
  pub async fn write_through<T, E, F, Fut, L>(
    &self,
    writer: F,
    fallback: L,
  ) -> Result<Sourced<T>, ServiceError>
  where
    T: Cacheable,
    E: RemoteFailure + Into<ServiceError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    L: FnOnce() -> T,
  {
    match writer().await {
      Ok(data) => {
        self.refresh(std::slice::from_ref(&data));
        Ok(Sourced::Remote(data))
      }
      Err(e) if self.policy.permits(&e, false) => {
        warn!(entity = T::entity_type(), error = %e, "Remote write failed, keeping local record");
        let local = fallback();
        self.put(&local)?;
        Ok(Sourced::Cached(CachedEntity::new(local, Utc::now())))
      }
      Err(e) => Err(e.into()),
    }
  }

  /// Read one shadow without contacting the remote.
  pub fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CachedEntity<T>>, ServiceError> {
    self
      .storage
      .get_entity::<T>(key)
      .map_err(|e| ServiceError::StorageUnavailable(e.to_string()))
  }

  /// Every shadow of type `T`, without contacting the remote.
  pub fn all<T: Cacheable>(&self) -> Result<Vec<CachedEntity<T>>, ServiceError> {
    self
      .storage
      .all_entities::<T>()
      .map_err(|e| ServiceError::StorageUnavailable(e.to_string()))
  }

  /// Write one shadow directly.
  pub fn put<T: Cacheable>(&self, entity: &T) -> Result<(), ServiceError> {
    self
      .storage
      .store_entity(entity)
      .map_err(|e| ServiceError::StorageUnavailable(e.to_string()))
  }

  /// Best-effort refresh after a remote success. A failed shadow write never
  /// fails the call that already has authoritative data.
  fn refresh<T: Cacheable>(&self, entities: &[T]) {
    match self.storage.store_entities(entities) {
      Ok(()) => debug!(entity = T::entity_type(), count = entities.len(), "Refreshed shadow cache"),
      Err(e) => warn!(entity = T::entity_type(), error = %e, "Failed to refresh shadow cache"),
    }
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      policy: self.policy,
    }
  }
}
