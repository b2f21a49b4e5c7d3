//! Locally owned vehicle records.
//!
//! Candidate input arrives as a [`VehicleDraft`], is checked by the pure
//! functions in [`validation`], and only then reaches SQLite through the
//! [`VehicleRepository`]. Every write reads the affected row back so callers
//! always see storage's own view of the record.

pub mod repository;
pub mod types;
pub mod validation;

pub use repository::VehicleRepository;
pub use types::{NewVehicle, Vehicle, VehicleDraft, VehiclePatch};
