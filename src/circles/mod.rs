//! Circles: shared groups owned by the remote service.
//!
//! [`CircleAccessor`] talks to the service through a [`CircleRemote`] and
//! keeps a shadow of every record it sees in a [`crate::cache::CacheLayer`].
//! When the service is out of reach, reads are answered from the shadow and
//! creates are completed locally with a synthesized record.

pub mod accessor;
pub mod api;
pub mod error;
pub mod invite;
pub mod seed;
pub mod types;
pub mod validation;

pub use accessor::{CircleAccessor, Seeded};
pub use api::{CircleApiClient, CircleRemote};
pub use error::ApiError;
pub use types::{Circle, CircleDraft, CircleType, Member, MemberRole, Privacy};
