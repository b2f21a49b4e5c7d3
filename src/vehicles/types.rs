use serde::{Deserialize, Serialize};

/// A stored vehicle, exactly as storage reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
  pub id: i64,
  pub make: String,
  pub model: String,
  pub year: i32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub vin: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mileage: Option<i64>,
  pub created_at: String,
}

/// Candidate vehicle data as received from a caller.
///
/// Every field is optional so that missing required fields surface as
/// validation failures rather than decode errors. Keys outside this set are
/// ignored. Numbers are wide so out-of-range values can be reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDraft {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub make: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub model: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub year: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub vin: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mileage: Option<i64>,
}

impl VehicleDraft {
  pub fn new(make: &str, model: &str, year: i64) -> Self {
    Self {
      make: Some(make.to_string()),
      model: Some(model.to_string()),
      year: Some(year),
      ..Default::default()
    }
  }

  pub fn with_color(mut self, color: &str) -> Self {
    self.color = Some(color.to_string());
    self
  }

  pub fn with_vin(mut self, vin: &str) -> Self {
    self.vin = Some(vin.to_string());
    self
  }

  pub fn with_mileage(mut self, mileage: i64) -> Self {
    self.mileage = Some(mileage);
    self
  }
}

/// Validated input for a new row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVehicle {
  pub make: String,
  pub model: String,
  pub year: i32,
  pub color: Option<String>,
  /// `None` when no VIN or an empty VIN was supplied.
  pub vin: Option<String>,
  /// `None` leaves the column at its storage default.
  pub mileage: Option<i64>,
}

/// Validated partial update; `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehiclePatch {
  pub make: Option<String>,
  pub model: Option<String>,
  pub year: Option<i32>,
  pub color: Option<String>,
  /// `Some(None)` clears the stored VIN.
  pub vin: Option<Option<String>>,
  pub mileage: Option<i64>,
}

impl VehiclePatch {
  pub fn is_empty(&self) -> bool {
    self.make.is_none()
      && self.model.is_none()
      && self.year.is_none()
      && self.color.is_none()
      && self.vin.is_none()
      && self.mileage.is_none()
  }
}
