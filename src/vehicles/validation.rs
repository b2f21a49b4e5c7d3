//! Pure checks for vehicle input. Nothing here touches storage.

use chrono::{Datelike, Utc};

use crate::error::ValidationErrors;

use super::types::{NewVehicle, VehicleDraft, VehiclePatch};

pub const MIN_YEAR: i64 = 1900;
const MAX_NAME_LEN: usize = 100;
const MAX_COLOR_LEN: usize = 50;
const VIN_LEN: usize = 17;

/// Calendar year used for the upper `year` bound.
pub fn current_year() -> i32 {
  Utc::now().year()
}

/// Reject ids that storage could never have assigned.
pub fn validate_id(id: i64) -> Result<i64, ValidationErrors> {
  let mut errors = ValidationErrors::new();
  if id <= 0 {
    errors.push("id", "Invalid vehicle ID: must be a positive integer");
  }
  errors.into_result(id)
}

/// VIN alphabet: digits and uppercase letters except I, O and Q.
pub fn is_valid_vin(vin: &str) -> bool {
  vin.chars().count() == VIN_LEN
    && vin
      .chars()
      .all(|c| c.is_ascii_digit() || (c.is_ascii_uppercase() && !matches!(c, 'I' | 'O' | 'Q')))
}

/// Check a full record for insertion.
pub fn validate_create(
  draft: &VehicleDraft,
  current_year: i32,
) -> Result<NewVehicle, ValidationErrors> {
  let mut errors = ValidationErrors::new();

  let make = required_name(&mut errors, "make", "Make", draft.make.as_deref());
  let model = required_name(&mut errors, "model", "Model", draft.model.as_deref());
  let year = match draft.year {
    Some(year) => check_year(&mut errors, year, current_year),
    None => {
      errors.push("year", "Year is required");
      None
    }
  };
  check_color(&mut errors, draft.color.as_deref());
  let vin = check_vin(&mut errors, draft.vin.as_deref());
  check_mileage(&mut errors, draft.mileage);

  match (make, model, year) {
    (Some(make), Some(model), Some(year)) if errors.is_empty() => Ok(NewVehicle {
      make,
      model,
      year,
      color: draft.color.clone(),
      vin: vin.flatten(),
      mileage: draft.mileage,
    }),
    _ => Err(errors),
  }
}

/// Check a partial update. At least one recognized field must be supplied.
pub fn validate_update(
  draft: &VehicleDraft,
  current_year: i32,
) -> Result<VehiclePatch, ValidationErrors> {
  let mut errors = ValidationErrors::new();
  let mut patch = VehiclePatch::default();

  if let Some(make) = draft.make.as_deref() {
    patch.make = optional_name(&mut errors, "make", "Make", make);
  }
  if let Some(model) = draft.model.as_deref() {
    patch.model = optional_name(&mut errors, "model", "Model", model);
  }
  if let Some(year) = draft.year {
    patch.year = check_year(&mut errors, year, current_year);
  }
  if draft.color.is_some() {
    check_color(&mut errors, draft.color.as_deref());
    patch.color = draft.color.clone();
  }
  patch.vin = check_vin(&mut errors, draft.vin.as_deref());
  if draft.mileage.is_some() {
    check_mileage(&mut errors, draft.mileage);
    patch.mileage = draft.mileage;
  }

  if !errors.is_empty() {
    return Err(errors);
  }
  if patch.is_empty() {
    return Err(ValidationErrors::no_fields());
  }
  Ok(patch)
}

fn required_name(
  errors: &mut ValidationErrors,
  field: &str,
  label: &str,
  value: Option<&str>,
) -> Option<String> {
  match value {
    None | Some("") => {
      errors.push(field, format!("{} is required", label));
      None
    }
    Some(v) if v.chars().count() > MAX_NAME_LEN => {
      errors.push(
        field,
        format!("{} must be at most {} characters", label, MAX_NAME_LEN),
      );
      None
    }
    Some(v) => Some(v.to_string()),
  }
}

fn optional_name(
  errors: &mut ValidationErrors,
  field: &str,
  label: &str,
  value: &str,
) -> Option<String> {
  if value.is_empty() {
    errors.push(field, format!("{} cannot be empty", label));
    return None;
  }
  required_name(errors, field, label, Some(value))
}

fn check_year(errors: &mut ValidationErrors, year: i64, current_year: i32) -> Option<i32> {
  if year < MIN_YEAR {
    errors.push("year", "Year must be 1900 or later");
    return None;
  }
  if year > i64::from(current_year) + 1 {
    errors.push("year", "Year cannot be in the future");
    return None;
  }
  i32::try_from(year).ok()
}

fn check_color(errors: &mut ValidationErrors, color: Option<&str>) {
  if let Some(color) = color {
    if color.chars().count() > MAX_COLOR_LEN {
      errors.push(
        "color",
        format!("Color must be at most {} characters", MAX_COLOR_LEN),
      );
    }
  }
}

/// `None`: not supplied. `Some(None)`: supplied empty. `Some(Some(v))`: a VIN.
fn check_vin(errors: &mut ValidationErrors, vin: Option<&str>) -> Option<Option<String>> {
  match vin {
    None => None,
    Some("") => Some(None),
    Some(v) if is_valid_vin(v) => Some(Some(v.to_string())),
    Some(_) => {
      errors.push("vin", "VIN must be 17 alphanumeric characters");
      None
    }
  }
}

fn check_mileage(errors: &mut ValidationErrors, mileage: Option<i64>) {
  if matches!(mileage, Some(m) if m < 0) {
    errors.push("mileage", "Mileage cannot be negative");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const YEAR: i32 = 2026;

  #[test]
  fn test_valid_create_is_normalized() {
    let draft = VehicleDraft::new("Honda", "Civic", 2021).with_vin("2HGFC2F59MH123456");
    let new = validate_create(&draft, YEAR).unwrap();
    assert_eq!(new.make, "Honda");
    assert_eq!(new.year, 2021);
    assert_eq!(new.vin.as_deref(), Some("2HGFC2F59MH123456"));
    assert_eq!(new.mileage, None);
  }

  #[test]
  fn test_year_bounds() {
    for (year, ok) in [(1899, false), (1900, true), (2027, true), (2028, false)] {
      let draft = VehicleDraft::new("Ford", "Model T", year);
      assert_eq!(validate_create(&draft, YEAR).is_ok(), ok, "year {}", year);
    }
  }

  #[test]
  fn test_create_reports_every_violation() {
    let draft = VehicleDraft {
      make: Some(String::new()),
      model: None,
      year: Some(1800),
      color: Some("x".repeat(51)),
      vin: Some("SHORT".into()),
      mileage: Some(-1),
    };
    let errors = validate_create(&draft, YEAR).unwrap_err();
    for field in ["make", "model", "year", "color", "vin", "mileage"] {
      assert!(errors.has(field), "missing violation for {}", field);
    }
    assert_eq!(errors.violations().len(), 6);
  }

  #[test]
  fn test_empty_vin_means_no_vin() {
    let draft = VehicleDraft::new("Tesla", "Model 3", 2023).with_vin("");
    assert_eq!(validate_create(&draft, YEAR).unwrap().vin, None);
  }

  #[test]
  fn test_vin_alphabet() {
    assert!(is_valid_vin("1HGBH41JXMN109186"));
    assert!(!is_valid_vin("1HGBH41JXMN10918")); // 16 chars
    assert!(!is_valid_vin("1HGBH41JXMN1091O6")); // O
    assert!(!is_valid_vin("1HGBH41JXMN1091I6")); // I
    assert!(!is_valid_vin("1HGBH41JXMN1091Q6")); // Q
    assert!(!is_valid_vin("1hgbh41jxmn109186")); // lowercase
  }

  #[test]
  fn test_name_length_limit() {
    let draft = VehicleDraft::new(&"M".repeat(101), "X", 2020);
    let errors = validate_create(&draft, YEAR).unwrap_err();
    assert!(errors.has("make"));
    let draft = VehicleDraft::new(&"M".repeat(100), "X", 2020);
    assert!(validate_create(&draft, YEAR).is_ok());
  }

  #[test]
  fn test_update_requires_a_field() {
    let errors = validate_update(&VehicleDraft::default(), YEAR).unwrap_err();
    assert_eq!(errors.to_string(), "No fields to update");
  }

  #[test]
  fn test_update_single_field() {
    let draft = VehicleDraft {
      mileage: Some(22000),
      ..Default::default()
    };
    let patch = validate_update(&draft, YEAR).unwrap();
    assert_eq!(patch.mileage, Some(22000));
    assert!(patch.make.is_none());
    assert!(patch.vin.is_none());
  }

  #[test]
  fn test_update_rejects_empty_make() {
    let draft = VehicleDraft {
      make: Some(String::new()),
      ..Default::default()
    };
    let errors = validate_update(&draft, YEAR).unwrap_err();
    assert_eq!(errors.to_string(), "make: Make cannot be empty");
  }

  #[test]
  fn test_update_empty_vin_clears() {
    let draft = VehicleDraft {
      vin: Some(String::new()),
      ..Default::default()
    };
    assert_eq!(validate_update(&draft, YEAR).unwrap().vin, Some(None));
  }

  #[test]
  fn test_validate_id() {
    assert!(validate_id(1).is_ok());
    assert!(validate_id(0).is_err());
    assert!(validate_id(-4).is_err());
  }
}
