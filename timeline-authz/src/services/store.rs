//! Data-access seam for the authorization core.
//!
//! The policy evaluator never touches a store; services use these traits to
//! fetch snapshots and to apply administrative mutations atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::AuthzResult;
use crate::models::{
    Event, Membership, MembershipRecord, OrgRole, Organization, OrganizationStatus, Topic,
};

/// Persistent storage for organizations, memberships, topics and events.
#[async_trait]
pub trait AuthzStore: Send + Sync {
    /// Open a write transaction. Dropping it without `commit` rolls back.
    async fn begin(&self) -> AuthzResult<Box<dyn StoreTransaction>>;

    /// Memberships of a user joined with their organization's status.
    async fn membership_records(&self, user_id: Uuid) -> AuthzResult<Vec<MembershipRecord>>;

    async fn find_organization(&self, organization_id: Uuid) -> AuthzResult<Option<Organization>>;

    /// Organizations in `status`, oldest first.
    async fn list_organizations_by_status(
        &self,
        status: OrganizationStatus,
    ) -> AuthzResult<Vec<Organization>>;

    /// Organizations a user created or holds a membership in.
    async fn list_organizations_for_user(&self, user_id: Uuid) -> AuthzResult<Vec<Organization>>;

    async fn list_memberships(&self, organization_id: Uuid) -> AuthzResult<Vec<Membership>>;

    async fn find_topic(&self, topic_id: Uuid) -> AuthzResult<Option<Topic>>;

    async fn insert_topic(&self, topic: &Topic) -> AuthzResult<()>;

    async fn find_event(&self, event_id: Uuid) -> AuthzResult<Option<Event>>;

    async fn insert_event(&self, event: &Event) -> AuthzResult<()>;

    async fn health_check(&self) -> AuthzResult<()>;
}

/// A single write transaction over organization and membership rows.
///
/// Every mutation of an organization or its memberships first takes the
/// organization row with `lock_organization`. Reads made after that lock see
/// the state the mutation will commit against.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Memberships of a user joined with their organization's status.
    async fn membership_records(&mut self, user_id: Uuid) -> AuthzResult<Vec<MembershipRecord>>;

    /// Exclusive until commit. The only lock a membership mutation waits on.
    async fn lock_organization(&mut self, organization_id: Uuid)
    -> AuthzResult<Option<Organization>>;

    async fn insert_organization(&mut self, organization: &Organization) -> AuthzResult<()>;

    async fn set_organization_status(
        &mut self,
        organization_id: Uuid,
        status: OrganizationStatus,
        reviewed_utc: DateTime<Utc>,
    ) -> AuthzResult<()>;

    /// Unlocked read, used to find which organization to lock.
    async fn find_membership(&mut self, membership_id: Uuid) -> AuthzResult<Option<Membership>>;

    async fn lock_membership(&mut self, membership_id: Uuid) -> AuthzResult<Option<Membership>>;

    /// Insert unless the user already belongs to the organization.
    /// Returns whether a row was inserted.
    async fn insert_membership_if_absent(&mut self, membership: &Membership) -> AuthzResult<bool>;

    async fn update_membership_role(&mut self, membership_id: Uuid, role: OrgRole)
    -> AuthzResult<()>;

    async fn delete_membership(&mut self, membership_id: Uuid) -> AuthzResult<()>;

    async fn commit(&mut self) -> AuthzResult<()>;
}
