//! Cache storage trait with in-memory and SQLite implementations.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use super::traits::{CachedEntity, Cacheable};

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get a single entity by key.
  fn get_entity<T: Cacheable>(&self, entity_key: &str) -> Result<Option<CachedEntity<T>>>;

  /// Store a single entity, replacing any previous copy with the same key.
  fn store_entity<T: Cacheable>(&self, entity: &T) -> Result<()>;

  /// Store several entities (upsert by key).
  fn store_entities<T: Cacheable>(&self, entities: &[T]) -> Result<()> {
    for entity in entities {
      self.store_entity(entity)?;
    }
    Ok(())
  }

  /// Every cached entity of type `T`. Order is not meaningful.
  fn all_entities<T: Cacheable>(&self) -> Result<Vec<CachedEntity<T>>>;
}

#[derive(Debug, Clone)]
struct StoredEntry {
  data: serde_json::Value,
  cached_at: DateTime<Utc>,
}

/// Process-local storage. Contents are lost when the owner is dropped.
#[derive(Default)]
pub struct MemoryStorage {
  entries: RwLock<HashMap<(&'static str, String), StoredEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryStorage {
  fn get_entity<T: Cacheable>(&self, entity_key: &str) -> Result<Option<CachedEntity<T>>> {
    let entries = self
      .entries
      .read()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    match entries.get(&(T::entity_type(), entity_key.to_string())) {
      Some(entry) => {
        let entity: T = serde_json::from_value(entry.data.clone())
          .map_err(|e| eyre!("Failed to deserialize entity: {}", e))?;
        Ok(Some(CachedEntity::new(entity, entry.cached_at)))
      }
      None => Ok(None),
    }
  }

  fn store_entity<T: Cacheable>(&self, entity: &T) -> Result<()> {
    let data =
      serde_json::to_value(entity).map_err(|e| eyre!("Failed to serialize entity: {}", e))?;
    let mut entries = self
      .entries
      .write()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    entries.insert(
      (T::entity_type(), entity.cache_key()),
      StoredEntry {
        data,
        cached_at: Utc::now(),
      },
    );
    Ok(())
  }

  fn all_entities<T: Cacheable>(&self) -> Result<Vec<CachedEntity<T>>> {
    let entries = self
      .entries
      .read()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let entity_type = T::entity_type();

    entries
      .iter()
      .filter(|((kind, _), _)| *kind == entity_type)
      .map(|(_, entry)| -> Result<CachedEntity<T>> {
        let entity: T = serde_json::from_value(entry.data.clone())
          .map_err(|e| eyre!("Failed to deserialize entity: {}", e))?;
        Ok(CachedEntity::new(entity, entry.cached_at))
      })
      .collect()
  }
}

/// SQLite-based cache storage, for shadows that should outlive the process.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Generic entity cache (stores serialized JSON)
CREATE TABLE IF NOT EXISTS entity_cache (
    entity_type TEXT NOT NULL,
    entity_key TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (entity_type, entity_key)
);
"#;

impl CacheStorage for SqliteStorage {
  fn get_entity<T: Cacheable>(&self, entity_key: &str) -> Result<Option<CachedEntity<T>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let result: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT data, cached_at FROM entity_cache
         WHERE entity_type = ? AND entity_key = ?",
        params![T::entity_type(), entity_key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query cache: {}", e))?;

    match result {
      Some((data, cached_at_str)) => {
        let entity: T = serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize entity: {}", e))?;
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CachedEntity::new(entity, cached_at)))
      }
      None => Ok(None),
    }
  }

  fn store_entity<T: Cacheable>(&self, entity: &T) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let data =
      serde_json::to_vec(entity).map_err(|e| eyre!("Failed to serialize entity: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO entity_cache (entity_type, entity_key, data, cached_at)
         VALUES (?, ?, ?, datetime('now'))",
        params![T::entity_type(), entity.cache_key(), data],
      )
      .map_err(|e| eyre!("Failed to store entity: {}", e))?;

    Ok(())
  }

  fn store_entities<T: Cacheable>(&self, entities: &[T]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for entity in entities {
      let data =
        serde_json::to_vec(entity).map_err(|e| eyre!("Failed to serialize entity: {}", e))?;
      tx.execute(
        "INSERT OR REPLACE INTO entity_cache (entity_type, entity_key, data, cached_at)
         VALUES (?, ?, ?, datetime('now'))",
        params![T::entity_type(), entity.cache_key(), data],
      )
      .map_err(|e| eyre!("Failed to store entity: {}", e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    Ok(())
  }

  fn all_entities<T: Cacheable>(&self) -> Result<Vec<CachedEntity<T>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT data, cached_at FROM entity_cache
         WHERE entity_type = ?
         ORDER BY cached_at",
      )
      .map_err(|e| eyre!("Failed to prepare entity query: {}", e))?;

    let rows: Vec<(Vec<u8>, String)> = stmt
      .query_map(params![T::entity_type()], |row| Ok((row.get(0)?, row.get(1)?)))
      .map_err(|e| eyre!("Failed to query entities: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    let mut entities = Vec::with_capacity(rows.len());
    for (data, cached_at_str) in rows {
      // Skip rows written by an incompatible version
      if let Ok(entity) = serde_json::from_slice::<T>(&data) {
        entities.push(CachedEntity::new(entity, parse_datetime(&cached_at_str)?));
      }
    }
    Ok(entities)
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::{Deserialize, Serialize};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Note {
    id: String,
    body: String,
  }

  impl Cacheable for Note {
    fn cache_key(&self) -> String {
      self.id.clone()
    }

    fn entity_type() -> &'static str {
      "note"
    }
  }

  fn note(id: &str, body: &str) -> Note {
    Note {
      id: id.to_string(),
      body: body.to_string(),
    }
  }

  fn exercise<S: CacheStorage>(storage: S) {
    assert!(storage.get_entity::<Note>("a").unwrap().is_none());

    storage.store_entity(&note("a", "first")).unwrap();
    storage.store_entity(&note("a", "second")).unwrap();
    storage
      .store_entities(&[note("b", "bee"), note("c", "sea")])
      .unwrap();

    let a = storage.get_entity::<Note>("a").unwrap().unwrap();
    assert_eq!(a.entity.body, "second");

    let mut all: Vec<String> = storage
      .all_entities::<Note>()
      .unwrap()
      .into_iter()
      .map(|c| c.entity.id)
      .collect();
    all.sort();
    assert_eq!(all, vec!["a", "b", "c"]);
  }

  #[test]
  fn test_memory_storage() {
    exercise(MemoryStorage::new());
  }

  #[test]
  fn test_sqlite_storage() {
    exercise(SqliteStorage::open_in_memory().unwrap());
  }

  #[test]
  fn test_parse_datetime() {
    let dt = parse_datetime("2024-05-01 12:30:00").unwrap();
    assert_eq!(dt.to_rfc3339(), "2024-05-01T12:30:00+00:00");
    assert!(parse_datetime("yesterday").is_err());
  }
}
