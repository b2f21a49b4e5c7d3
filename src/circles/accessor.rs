use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{CacheLayer, CacheStorage, CachedEntity, Sourced};
use crate::error::ServiceError;

use super::api::CircleRemote;
use super::error::ApiError;
use super::types::{Circle, CircleDraft, Member};
use super::{invite, seed, validation};

/// A seeded circle and the background attempt to create it remotely.
///
/// `sync` resolves to the remote record on success and `None` when the
/// remote could not take it. Dropping the handle detaches the task.
pub struct Seeded {
  pub circle: Circle,
  pub sync: JoinHandle<Option<Circle>>,
}

/// Remote-first access to circles with a local shadow.
pub struct CircleAccessor<R: CircleRemote, S: CacheStorage> {
  remote: Arc<R>,
  cache: CacheLayer<S>,
}

impl<R, S> CircleAccessor<R, S>
where
  R: CircleRemote + 'static,
  S: CacheStorage + 'static,
{
  pub fn new(remote: R, cache: CacheLayer<S>) -> Self {
    Self {
      remote: Arc::new(remote),
      cache,
    }
  }

  pub async fn create(&self, draft: CircleDraft) -> Result<Sourced<Circle>, ServiceError> {
    let draft = validation::validate_create(&draft)?;
    let local = draft.clone();

    let result = self
      .cache
      .write_through(
        || self.remote.create_circle(&draft),
        || seed::synthesize(local),
      )
      .await?;

    if !result.is_remote() {
      info!(id = %result.data().id, "Created circle locally");
    }
    Ok(result)
  }

  pub async fn get(&self, id: &str) -> Result<Sourced<Circle>, ServiceError> {
    require_id(id)?;
    self
      .cache
      .fetch_one(id, || self.remote.get_circle(id))
      .await?
      .ok_or_else(|| ServiceError::NotFound(format!("Circle {}", id)))
  }

  pub async fn list(&self) -> Result<Sourced<Vec<Circle>>, ServiceError> {
    self.cache.fetch_list(|| self.remote.list_circles()).await
  }

  /// Store a sample circle locally right away and try to create it remotely
  /// in the background. A remote success is cached under the remote's id; a
  /// failure leaves only the local record.
  ///
  /// Must be called from within a tokio runtime; otherwise nothing is stored
  /// and an error is returned.
  pub fn seed(&self, overrides: CircleDraft) -> Result<Seeded, ServiceError> {
    let runtime = Handle::try_current().map_err(|e| {
      ServiceError::RemoteUnreachable(format!("No runtime for the remote create: {}", e))
    })?;
    let draft = validation::validate_create(&seed::seed_draft(overrides))?;
    let circle = seed::synthesize(draft.clone());
    self.cache.put(&circle)?;

    let remote = Arc::clone(&self.remote);
    let cache = self.cache.clone();
    let sync = runtime.spawn(async move {
      match remote.create_circle(&draft).await {
        Ok(created) => {
          if let Err(e) = cache.put(&created) {
            warn!(id = %created.id, error = %e, "Failed to cache seeded circle");
          }
          Some(created)
        }
        Err(e) => {
          warn!(error = %e, "Seeded circle stays local-only");
          None
        }
      }
    });

    Ok(Seeded { circle, sync })
  }

  /// Add a member through the remote. The shadow, if any, gains the member.
  pub async fn add_member(&self, circle_id: &str, member: Member) -> Result<Member, ServiceError> {
    require_id(circle_id)?;
    let member = validation::validate_member(&member)?;
    let added = self
      .remote
      .add_member(circle_id, &member)
      .await
      .map_err(|e| match e {
        ApiError::Conflict(_) => ServiceError::Conflict(format!(
          "User {} is already a member of circle {}",
          member.user_id, circle_id
        )),
        other => other.into(),
      })?;

    if let Some(CachedEntity { mut entity, .. }) = self.cache.get::<Circle>(circle_id)? {
      if entity.member(&added.user_id).is_none() {
        entity.members.push(added.clone());
        self.cache.put(&entity)?;
      }
    }
    Ok(added)
  }

  pub async fn join_by_invite_code(
    &self,
    code: &str,
    member: Member,
  ) -> Result<Circle, ServiceError> {
    if !invite::is_valid(code) {
      return Err(ServiceError::invalid("code", "Invalid invite code format"));
    }
    let member = validation::validate_member(&member)?;
    let code = code.replace('-', "");

    let circle = self
      .remote
      .join_by_code(&code, &member)
      .await
      .map_err(|e| match e {
        ApiError::NotFound(_) => ServiceError::NotFound(format!("Invite code {}", code)),
        other => other.into(),
      })?;
    self.cache.put(&circle)?;
    Ok(circle)
  }

  /// The shadow copy of one circle, without contacting the remote.
  pub fn cached(&self, id: &str) -> Result<Option<CachedEntity<Circle>>, ServiceError> {
    self.cache.get(id)
  }

  pub fn cached_all(&self) -> Result<Vec<CachedEntity<Circle>>, ServiceError> {
    self.cache.all()
  }
}

/// An empty id would address the collection instead of one circle.
fn require_id(id: &str) -> Result<(), ServiceError> {
  if id.trim().is_empty() {
    return Err(ServiceError::invalid("id", "Circle ID is required"));
  }
  Ok(())
}
