//! Channel dispatch: operation name plus positional JSON arguments in,
//! response envelope out.

use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheStorage, Sourced};
use crate::circles::{Circle, CircleAccessor, CircleDraft, CircleRemote, Member};
use crate::commands::{self, Op};
use crate::envelope::Envelope;
use crate::error::ServiceError;
use crate::vehicles::{VehicleDraft, VehicleRepository};

const INVALID_ID: &str = "Invalid vehicle ID: must be a positive integer";

pub struct Bridge<R: CircleRemote, S: CacheStorage> {
  vehicles: VehicleRepository,
  circles: CircleAccessor<R, S>,
  /// Background remote creates started by `circle:seed`
  pending: Mutex<Vec<JoinHandle<Option<Circle>>>>,
}

impl<R, S> Bridge<R, S>
where
  R: CircleRemote + 'static,
  S: CacheStorage + 'static,
{
  pub fn new(vehicles: VehicleRepository, circles: CircleAccessor<R, S>) -> Self {
    Self {
      vehicles,
      circles,
      pending: Mutex::new(Vec::new()),
    }
  }

  /// Run one channel call. Never fails outside the envelope.
  pub async fn handle(&self, channel: &str, args: &[Value]) -> Envelope<Value> {
    let Some(ch) = commands::resolve(channel) else {
      return Envelope::fail(unknown_channel(channel));
    };

    debug!(channel = ch.name, args = args.len(), "Handling channel call");
    match self.dispatch(ch.op, args).await {
      Ok(Some(data)) => Envelope::from(Ok::<_, ServiceError>(data)),
      Ok(None) => Envelope::from(Ok::<(), ServiceError>(())),
      Err(e) => {
        warn!(channel = ch.name, kind = e.kind(), error = %e, "Channel call failed");
        Envelope::from(Err::<(), _>(e))
      }
    }
  }

  /// Wait for every background remote create started so far. Call before
  /// the runtime shuts down, or those creates are cancelled.
  pub async fn drain(&self) -> usize {
    let handles = match self.pending.lock() {
      Ok(mut pending) => std::mem::take(&mut *pending),
      Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    };

    let mut synced = 0;
    for handle in handles {
      match handle.await {
        Ok(Some(circle)) => {
          info!(id = %circle.id, "Seeded circle reached the remote");
          synced += 1;
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Seed task did not finish"),
      }
    }
    synced
  }

  async fn dispatch(&self, op: Op, args: &[Value]) -> Result<Option<Value>, ServiceError> {
    match op {
      Op::VehicleList => to_json(&self.vehicles.list()?),
      Op::VehicleGet => to_json(&self.vehicles.get_by_id(arg_id(args, 0)?)?),
      Op::VehicleCreate => {
        let draft: VehicleDraft = decode_arg(args, 0, "vehicle")?;
        to_json(&self.vehicles.create(&draft)?)
      }
      Op::VehicleUpdate => {
        let id = arg_id(args, 0)?;
        let draft: VehicleDraft = decode_arg(args, 1, "fields")?;
        to_json(&self.vehicles.update(id, &draft)?)
      }
      Op::VehicleDelete => {
        self.vehicles.delete(arg_id(args, 0)?)?;
        Ok(None)
      }
      Op::CircleCreate => {
        let draft: CircleDraft = decode_arg(args, 0, "circle")?;
        sourced_json(self.circles.create(draft).await?)
      }
      Op::CircleGet => {
        let id: String = decode_arg(args, 0, "id")?;
        sourced_json(self.circles.get(&id).await?)
      }
      Op::CircleList => sourced_json(self.circles.list().await?),
      Op::CircleSeed => {
        let overrides: CircleDraft = match args.first() {
          None | Some(Value::Null) => CircleDraft::default(),
          Some(_) => decode_arg(args, 0, "overrides")?,
        };
        let seeded = self.circles.seed(overrides)?;
        self.track(seeded.sync);
        to_json(&seeded.circle)
      }
      Op::CircleAddMember => {
        let id: String = decode_arg(args, 0, "id")?;
        let member: Member = decode_arg(args, 1, "member")?;
        to_json(&self.circles.add_member(&id, member).await?)
      }
      Op::CircleJoin => {
        let code: String = decode_arg(args, 0, "code")?;
        let member: Member = decode_arg(args, 1, "member")?;
        to_json(&self.circles.join_by_invite_code(&code, member).await?)
      }
    }
  }

  fn track(&self, handle: JoinHandle<Option<Circle>>) {
    match self.pending.lock() {
      Ok(mut pending) => pending.push(handle),
      Err(poisoned) => poisoned.into_inner().push(handle),
    }
  }
}

fn unknown_channel(channel: &str) -> String {
  let suggestions: Vec<&str> = commands::get_suggestions(channel)
    .into_iter()
    .take(3)
    .map(|ch| ch.name)
    .collect();
  if suggestions.is_empty() {
    format!("Unknown channel '{}'", channel)
  } else {
    format!(
      "Unknown channel '{}' (did you mean: {})",
      channel,
      suggestions.join(", ")
    )
  }
}

/// Vehicle ids must arrive as JSON integers.
fn arg_id(args: &[Value], index: usize) -> Result<i64, ServiceError> {
  match args.get(index).and_then(Value::as_i64) {
    Some(id) if id > 0 => Ok(id),
    _ => Err(ServiceError::invalid("id", INVALID_ID)),
  }
}

fn decode_arg<T: DeserializeOwned>(
  args: &[Value],
  index: usize,
  name: &str,
) -> Result<T, ServiceError> {
  let value = args
    .get(index)
    .ok_or_else(|| ServiceError::invalid(name, &format!("Missing argument '{}'", name)))?;
  serde_json::from_value(value.clone())
    .map_err(|e| ServiceError::invalid(name, &format!("Invalid {}: {}", name, e)))
}

fn to_json<T: Serialize>(data: &T) -> Result<Option<Value>, ServiceError> {
  serde_json::to_value(data)
    .map(Some)
    .map_err(|e| ServiceError::StorageUnavailable(format!("Failed to encode response: {}", e)))
}

fn sourced_json<T: Serialize>(result: Sourced<T>) -> Result<Option<Value>, ServiceError> {
  if let Some(cached_at) = result.cached_at() {
    debug!(%cached_at, "Answering from local shadow");
  }
  to_json(result.data())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheLayer, MemoryStorage};
  use crate::circles::ApiError;
  use crate::db::Database;
  use async_trait::async_trait;
  use serde_json::json;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  /// Remote that is never reachable.
  struct Offline;

  #[async_trait]
  impl CircleRemote for Offline {
    async fn create_circle(&self, _: &CircleDraft) -> Result<Circle, ApiError> {
      Err(ApiError::Unreachable("offline".into()))
    }

    async fn get_circle(&self, _: &str) -> Result<Circle, ApiError> {
      Err(ApiError::Unreachable("offline".into()))
    }

    async fn list_circles(&self) -> Result<Vec<Circle>, ApiError> {
      Err(ApiError::Unreachable("offline".into()))
    }

    async fn add_member(&self, _: &str, _: &Member) -> Result<Member, ApiError> {
      Err(ApiError::Unreachable("offline".into()))
    }

    async fn join_by_code(&self, _: &str, _: &Member) -> Result<Circle, ApiError> {
      Err(ApiError::Unreachable("offline".into()))
    }
  }

  /// Remote whose creates take a while and are counted once they land.
  struct Slow {
    created: Arc<AtomicUsize>,
  }

  #[async_trait]
  impl CircleRemote for Slow {
    async fn create_circle(&self, draft: &CircleDraft) -> Result<Circle, ApiError> {
      tokio::time::sleep(Duration::from_millis(50)).await;
      self.created.fetch_add(1, Ordering::SeqCst);
      let mut circle = crate::circles::seed::synthesize(draft.clone());
      circle.id = format!("remote-{}", circle.id);
      Ok(circle)
    }

    async fn get_circle(&self, _: &str) -> Result<Circle, ApiError> {
      Err(ApiError::Unreachable("slow".into()))
    }

    async fn list_circles(&self) -> Result<Vec<Circle>, ApiError> {
      Err(ApiError::Unreachable("slow".into()))
    }

    async fn add_member(&self, _: &str, _: &Member) -> Result<Member, ApiError> {
      Err(ApiError::Unreachable("slow".into()))
    }

    async fn join_by_code(&self, _: &str, _: &Member) -> Result<Circle, ApiError> {
      Err(ApiError::Unreachable("slow".into()))
    }
  }

  fn bridge() -> Bridge<Offline, MemoryStorage> {
    let db = Arc::new(Database::open_in_memory().unwrap());
    Bridge::new(
      VehicleRepository::new(db),
      CircleAccessor::new(Offline, CacheLayer::new(MemoryStorage::new())),
    )
  }

  #[tokio::test]
  async fn test_vehicle_lifecycle() {
    let bridge = bridge();

    let created = bridge
      .handle(
        "vehicle:create",
        &[json!({"make": "Honda", "model": "Civic", "year": 2021, "mileage": 15000})],
      )
      .await;
    assert!(created.success, "{:?}", created.error);
    let data = created.data.unwrap();
    assert_eq!(data["id"], 1);
    assert!(data["created_at"].is_string());

    let updated = bridge
      .handle("vehicle:update", &[json!(1), json!({"mileage": 22000})])
      .await;
    let data = updated.data.unwrap();
    assert_eq!(data["mileage"], 22000);
    assert_eq!(data["model"], "Civic");

    let deleted = bridge.handle("vehicle:delete", &[json!(1)]).await;
    assert_eq!(serde_json::to_value(&deleted).unwrap(), json!({"success": true}));

    let missing = bridge.handle("vehicle:getById", &[json!(1)]).await;
    assert!(!missing.success);
    assert_eq!(missing.error.as_deref(), Some("Vehicle with ID 1 not found"));
  }

  #[tokio::test]
  async fn test_bad_vehicle_id() {
    let bridge = bridge();
    for arg in [json!("abc"), json!(1.5), json!(0), json!(-3)] {
      let env = bridge.handle("vehicle:getById", &[arg]).await;
      assert!(!env.success);
      assert_eq!(env.error.as_deref(), Some(format!("Validation failed: id: {}", INVALID_ID).as_str()));
    }
  }

  #[tokio::test]
  async fn test_alias_and_unknown_channel() {
    let bridge = bridge();
    let env = bridge.handle("car:getAll", &[]).await;
    assert_eq!(env.data, Some(json!([])));

    let env = bridge.handle("vehicle:remove", &[]).await;
    assert!(!env.success);
    assert!(env.error.unwrap().starts_with("Unknown channel 'vehicle:remove'"));
  }

  #[tokio::test]
  async fn test_circle_offline_create_and_get() {
    let bridge = bridge();
    let created = bridge
      .handle("circle:create", &[json!({"name": "Hiking"})])
      .await;
    let circle = created.data.unwrap();
    assert_eq!(circle["privacy"], "PUBLIC");
    assert!(circle["inviteCode"].is_string());

    let fetched = bridge.handle("circle:getById", &[circle["id"].clone()]).await;
    assert_eq!(fetched.data, Some(circle));
  }

  #[tokio::test]
  async fn test_circle_seed_without_args() {
    let bridge = bridge();
    let seeded = bridge.handle("circle:seed", &[]).await;
    assert_eq!(seeded.data.unwrap()["circleType"], "HOBBY");
  }

  #[tokio::test]
  async fn test_missing_argument() {
    let bridge = bridge();
    let env = bridge.handle("circle:create", &[]).await;
    assert!(!env.success);
    assert!(env.error.unwrap().contains("Missing argument 'circle'"));
  }

  #[test]
  fn test_drained_seed_survives_runtime_shutdown() {
    let created = Arc::new(AtomicUsize::new(0));
    let db = Arc::new(Database::open_in_memory().unwrap());
    let bridge = Bridge::new(
      VehicleRepository::new(db),
      CircleAccessor::new(
        Slow {
          created: Arc::clone(&created),
        },
        CacheLayer::new(MemoryStorage::new()),
      ),
    );

    let rt = tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .unwrap();
    let synced = rt.block_on(async {
      let env = bridge.handle("circle:seed", &[]).await;
      assert!(env.success, "{:?}", env.error);
      bridge.drain().await
    });
    drop(rt);

    assert_eq!(synced, 1);
    assert_eq!(created.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_drain_with_nothing_pending() {
    let bridge = bridge();
    assert_eq!(bridge.drain().await, 0);

    bridge.handle("circle:seed", &[]).await;
    assert_eq!(bridge.drain().await, 0);
    assert_eq!(bridge.drain().await, 0);
  }
}
