//! Generic shadow cache for remotely owned data.
//!
//! This module provides a domain-agnostic mechanism that:
//! - Treats a remote service as the system of record
//! - Keeps a local shadow of every record the remote returned
//! - Serves the shadow when the remote cannot be reached
//! - Reports provenance through [`Sourced`] so callers never mistake a
//!   local copy for authoritative data

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, MemoryStorage, SqliteStorage};
pub use traits::{CachedEntity, Cacheable, FallbackPolicy, RemoteFailure, Sourced};
