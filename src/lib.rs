//! Local vehicle store plus an offline-tolerant client for shared circles.

pub mod bridge;
pub mod cache;
pub mod circles;
pub mod commands;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod vehicles;
