//! CRUD over the `vehicles` table.

use std::sync::Arc;

use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::ServiceError;

use super::types::{NewVehicle, Vehicle, VehicleDraft, VehiclePatch};
use super::validation::{self, current_year};

const SELECT_VEHICLE: &str =
  "SELECT id, make, model, year, color, vin, mileage, created_at FROM vehicles";

/// Repository for locally owned vehicles.
///
/// Each operation runs against the shared connection inside one transaction,
/// so an insert and its read-back (or a check and its delete) are never
/// interleaved with another call.
#[derive(Clone)]
pub struct VehicleRepository {
  db: Arc<Database>,
}

impl VehicleRepository {
  pub fn new(db: Arc<Database>) -> Self {
    Self { db }
  }

  /// All vehicles, most recently created first.
  pub fn list(&self) -> Result<Vec<Vehicle>, ServiceError> {
    let conn = self.db.conn()?;
    let mut stmt = conn.prepare(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_VEHICLE))?;
    let vehicles = stmt
      .query_map([], row_to_vehicle)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!(count = vehicles.len(), "Listed vehicles");
    Ok(vehicles)
  }

  pub fn get_by_id(&self, id: i64) -> Result<Vehicle, ServiceError> {
    validation::validate_id(id)?;
    let conn = self.db.conn()?;
    fetch(&conn, id)?.ok_or_else(|| not_found(id))
  }

  /// Validate and insert, returning the row as storage recorded it.
  pub fn create(&self, draft: &VehicleDraft) -> Result<Vehicle, ServiceError> {
    let new = validation::validate_create(draft, current_year())?;

    let mut conn = self.db.conn()?;
    let tx = conn.transaction()?;
    insert(&tx, &new).map_err(|e| vin_conflict(e, new.vin.as_deref()))?;
    let id = tx.last_insert_rowid();
    let vehicle = fetch(&tx, id)?.ok_or_else(|| not_found(id))?;
    tx.commit()?;

    info!(id = vehicle.id, make = %vehicle.make, model = %vehicle.model, "Created vehicle");
    Ok(vehicle)
  }

  /// Apply only the supplied fields, returning the re-read row.
  pub fn update(&self, id: i64, draft: &VehicleDraft) -> Result<Vehicle, ServiceError> {
    validation::validate_id(id)?;
    let patch = validation::validate_update(draft, current_year())?;

    let (assignments, mut values) = patch_assignments(&patch);
    let sql = format!("UPDATE vehicles SET {} WHERE id = ?", assignments.join(", "));
    values.push(Box::new(id));
    let bind_refs: Vec<&dyn ToSql> = values.iter().map(|b| b.as_ref()).collect();

    let mut conn = self.db.conn()?;
    let tx = conn.transaction()?;
    let vin = patch.vin.clone().flatten();
    tx.execute(&sql, bind_refs.as_slice())
      .map_err(|e| vin_conflict(e, vin.as_deref()))?;
    let vehicle = fetch(&tx, id)?.ok_or_else(|| not_found(id))?;
    tx.commit()?;

    debug!(id, fields = ?assignments, "Updated vehicle");
    Ok(vehicle)
  }

  /// Hard delete. Fails with not-found when the row is already gone.
  pub fn delete(&self, id: i64) -> Result<(), ServiceError> {
    validation::validate_id(id)?;

    let mut conn = self.db.conn()?;
    let tx = conn.transaction()?;
    let exists: Option<i64> = tx
      .query_row("SELECT id FROM vehicles WHERE id = ?", params![id], |row| row.get(0))
      .optional()?;
    if exists.is_none() {
      return Err(not_found(id));
    }
    tx.execute("DELETE FROM vehicles WHERE id = ?", params![id])?;
    tx.commit()?;

    info!(id, "Deleted vehicle");
    Ok(())
  }

  pub fn count(&self) -> Result<i64, ServiceError> {
    let conn = self.db.conn()?;
    let count = conn.query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;
    Ok(count)
  }

  /// Insert the sample fleet when the table is empty. Returns rows inserted.
  pub fn seed_samples(&self) -> Result<usize, ServiceError> {
    let mut conn = self.db.conn()?;
    let tx = conn.transaction()?;
    let count: i64 = tx.query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;
    if count > 0 {
      debug!(count, "Vehicles present, skipping sample data");
      return Ok(0);
    }

    let samples = sample_vehicles();
    for sample in &samples {
      insert(&tx, sample)?;
    }
    tx.commit()?;

    info!(count = samples.len(), "Inserted sample vehicles");
    Ok(samples.len())
  }
}

fn insert(conn: &Connection, new: &NewVehicle) -> rusqlite::Result<usize> {
  match new.mileage {
    Some(mileage) => conn.execute(
      "INSERT INTO vehicles (make, model, year, color, vin, mileage) VALUES (?, ?, ?, ?, ?, ?)",
      params![new.make, new.model, new.year, new.color, new.vin, mileage],
    ),
    // Leave mileage to the column default
    None => conn.execute(
      "INSERT INTO vehicles (make, model, year, color, vin) VALUES (?, ?, ?, ?, ?)",
      params![new.make, new.model, new.year, new.color, new.vin],
    ),
  }
}

fn fetch(conn: &Connection, id: i64) -> rusqlite::Result<Option<Vehicle>> {
  conn
    .query_row(
      &format!("{} WHERE id = ?", SELECT_VEHICLE),
      params![id],
      row_to_vehicle,
    )
    .optional()
}

fn row_to_vehicle(row: &Row<'_>) -> rusqlite::Result<Vehicle> {
  Ok(Vehicle {
    id: row.get(0)?,
    make: row.get(1)?,
    model: row.get(2)?,
    year: row.get(3)?,
    color: row.get(4)?,
    vin: row.get(5)?,
    mileage: row.get(6)?,
    created_at: row.get(7)?,
  })
}

/// Allow-list of updatable columns, in a fixed order.
fn patch_assignments(patch: &VehiclePatch) -> (Vec<&'static str>, Vec<Box<dyn ToSql>>) {
  let mut assignments = Vec::new();
  let mut values: Vec<Box<dyn ToSql>> = Vec::new();

  if let Some(make) = &patch.make {
    assignments.push("make = ?");
    values.push(Box::new(make.clone()));
  }
  if let Some(model) = &patch.model {
    assignments.push("model = ?");
    values.push(Box::new(model.clone()));
  }
  if let Some(year) = patch.year {
    assignments.push("year = ?");
    values.push(Box::new(year));
  }
  if let Some(color) = &patch.color {
    assignments.push("color = ?");
    values.push(Box::new(color.clone()));
  }
  if let Some(vin) = &patch.vin {
    assignments.push("vin = ?");
    values.push(Box::new(vin.clone()));
  }
  if let Some(mileage) = patch.mileage {
    assignments.push("mileage = ?");
    values.push(Box::new(mileage));
  }

  (assignments, values)
}

fn not_found(id: i64) -> ServiceError {
  ServiceError::NotFound(format!("Vehicle with ID {}", id))
}

/// The only unique column is `vin`, so a constraint failure names it.
fn vin_conflict(e: rusqlite::Error, vin: Option<&str>) -> ServiceError {
  match ServiceError::from(e) {
    ServiceError::Conflict(detail) => {
      warn!(vin = ?vin, %detail, "Duplicate VIN rejected by storage");
      ServiceError::Conflict(format!(
        "A vehicle with VIN {} already exists",
        vin.unwrap_or_default()
      ))
    }
    other => other,
  }
}

fn sample_vehicles() -> Vec<NewVehicle> {
  [
    ("Toyota", "Camry", 2022, "Silver", "1HGBH41JXMN109186", 15000),
    ("Honda", "Civic", 2021, "Blue", "2HGFC2F59MH123456", 22000),
    ("Ford", "F-150", 2023, "Black", "1FTFW1ET5MFC12345", 8500),
    ("Tesla", "Model 3", 2023, "White", "5YJ3E1EA5MF123456", 5000),
  ]
  .into_iter()
  .map(|(make, model, year, color, vin, mileage)| NewVehicle {
    make: make.to_string(),
    model: model.to_string(),
    year,
    color: Some(color.to_string()),
    vin: Some(vin.to_string()),
    mileage: Some(mileage),
  })
  .collect()
}
