//! Services layer for the timeline access-control core.
//!
//! Snapshot loading, enforcement helpers, the organization registry,
//! membership administration and topic/event guards, over a pluggable store.

mod context;
mod database;
pub mod error;
mod membership;
mod memory;
mod principal;
mod registry;
mod store;
mod topics;

pub use context::{enforce, fetch_membership_snapshot, RequestContext};
pub use database::PgStore;
pub use error::{AuthzError, AuthzResult};
pub use membership::MembershipAdmin;
pub use memory::MemoryStore;
pub use principal::{bearer_token, AccessTokenClaims, PrincipalResolver};
pub use registry::OrganizationRegistry;
pub use store::{AuthzStore, StoreTransaction};
pub use topics::TopicGuard;
