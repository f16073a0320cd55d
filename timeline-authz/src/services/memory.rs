//! In-memory store for tests and embedders without Postgres.
//!
//! Transactions hold the state lock from `begin` until they are dropped, so
//! every write transaction is serialized against all other access.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::error::{AuthzError, AuthzResult};
use super::store::{AuthzStore, StoreTransaction};
use crate::models::{
    Event, Membership, MembershipRecord, OrgRole, Organization, OrganizationStatus, Topic,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    organizations: HashMap<Uuid, Organization>,
    memberships: HashMap<Uuid, Membership>,
    topics: HashMap<Uuid, Topic>,
    events: HashMap<Uuid, Event>,
}

impl MemoryState {
    fn membership_records(&self, user_id: Uuid) -> Vec<MembershipRecord> {
        self.memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                self.organizations
                    .get(&m.organization_id)
                    .map(|org| MembershipRecord {
                        organization_id: m.organization_id,
                        role: m.role,
                        organization_status: org.status,
                    })
            })
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an organization as-is, bypassing the review lifecycle.
    pub async fn seed_organization(&self, organization: Organization) {
        self.state
            .lock()
            .await
            .organizations
            .insert(organization.organization_id, organization);
    }

    /// Insert a membership as-is, bypassing authorization.
    pub async fn seed_membership(&self, membership: Membership) {
        self.state
            .lock()
            .await
            .memberships
            .insert(membership.membership_id, membership);
    }

    /// Force an organization's status, bypassing the review lifecycle.
    pub async fn force_status(&self, organization_id: Uuid, status: OrganizationStatus) {
        if let Some(org) = self.state.lock().await.organizations.get_mut(&organization_id) {
            org.status = status;
        }
    }
}

#[async_trait]
impl AuthzStore for MemoryStore {
    async fn begin(&self) -> AuthzResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn membership_records(&self, user_id: Uuid) -> AuthzResult<Vec<MembershipRecord>> {
        Ok(self.state.lock().await.membership_records(user_id))
    }

    async fn find_organization(&self, organization_id: Uuid) -> AuthzResult<Option<Organization>> {
        Ok(self.state.lock().await.organizations.get(&organization_id).cloned())
    }

    async fn list_organizations_by_status(
        &self,
        status: OrganizationStatus,
    ) -> AuthzResult<Vec<Organization>> {
        let state = self.state.lock().await;
        let mut orgs: Vec<Organization> = state
            .organizations
            .values()
            .filter(|org| org.status == status)
            .cloned()
            .collect();
        orgs.sort_by_key(|org| org.created_utc);
        Ok(orgs)
    }

    async fn list_organizations_for_user(&self, user_id: Uuid) -> AuthzResult<Vec<Organization>> {
        let state = self.state.lock().await;
        let mut orgs: Vec<Organization> = state
            .organizations
            .values()
            .filter(|org| {
                org.created_by_user_id == user_id
                    || state.memberships.values().any(|m| {
                        m.user_id == user_id && m.organization_id == org.organization_id
                    })
            })
            .cloned()
            .collect();
        orgs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(orgs)
    }

    async fn list_memberships(&self, organization_id: Uuid) -> AuthzResult<Vec<Membership>> {
        let state = self.state.lock().await;
        let mut members: Vec<Membership> = state
            .memberships
            .values()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.created_utc);
        Ok(members)
    }

    async fn find_topic(&self, topic_id: Uuid) -> AuthzResult<Option<Topic>> {
        Ok(self.state.lock().await.topics.get(&topic_id).cloned())
    }

    async fn insert_topic(&self, topic: &Topic) -> AuthzResult<()> {
        let mut state = self.state.lock().await;
        if let Some(org_id) = topic.organization_id
            && !state.organizations.contains_key(&org_id)
        {
            return Err(AuthzError::NotFound("Organization"));
        }
        state.topics.insert(topic.topic_id, topic.clone());
        Ok(())
    }

    async fn find_event(&self, event_id: Uuid) -> AuthzResult<Option<Event>> {
        Ok(self.state.lock().await.events.get(&event_id).cloned())
    }

    async fn insert_event(&self, event: &Event) -> AuthzResult<()> {
        let mut state = self.state.lock().await;
        if !state.topics.contains_key(&event.topic_id) {
            return Err(AuthzError::NotFound("Topic"));
        }
        state.events.insert(event.event_id, event.clone());
        Ok(())
    }

    async fn health_check(&self) -> AuthzResult<()> {
        Ok(())
    }
}

/// Works on a copy of the state; `commit` publishes it under the held lock.
struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn membership_records(&mut self, user_id: Uuid) -> AuthzResult<Vec<MembershipRecord>> {
        Ok(self.working.membership_records(user_id))
    }

    async fn lock_organization(
        &mut self,
        organization_id: Uuid,
    ) -> AuthzResult<Option<Organization>> {
        Ok(self.working.organizations.get(&organization_id).cloned())
    }

    async fn insert_organization(&mut self, organization: &Organization) -> AuthzResult<()> {
        if self
            .working
            .organizations
            .contains_key(&organization.organization_id)
        {
            return Err(AuthzError::Conflict("Organization already exists".to_string()));
        }
        self.working
            .organizations
            .insert(organization.organization_id, organization.clone());
        Ok(())
    }

    async fn set_organization_status(
        &mut self,
        organization_id: Uuid,
        status: OrganizationStatus,
        reviewed_utc: DateTime<Utc>,
    ) -> AuthzResult<()> {
        let org = self
            .working
            .organizations
            .get_mut(&organization_id)
            .ok_or(AuthzError::NotFound("Organization"))?;
        org.status = status;
        org.reviewed_utc = Some(reviewed_utc);
        Ok(())
    }

    async fn find_membership(&mut self, membership_id: Uuid) -> AuthzResult<Option<Membership>> {
        Ok(self.working.memberships.get(&membership_id).cloned())
    }

    async fn lock_membership(&mut self, membership_id: Uuid) -> AuthzResult<Option<Membership>> {
        Ok(self.working.memberships.get(&membership_id).cloned())
    }

    async fn insert_membership_if_absent(&mut self, membership: &Membership) -> AuthzResult<bool> {
        let exists = self.working.memberships.values().any(|m| {
            m.organization_id == membership.organization_id && m.user_id == membership.user_id
        });
        if exists {
            return Ok(false);
        }
        self.working
            .memberships
            .insert(membership.membership_id, membership.clone());
        Ok(true)
    }

    async fn update_membership_role(
        &mut self,
        membership_id: Uuid,
        role: OrgRole,
    ) -> AuthzResult<()> {
        let membership = self
            .working
            .memberships
            .get_mut(&membership_id)
            .ok_or(AuthzError::NotFound("Membership"))?;
        membership.role = role;
        Ok(())
    }

    async fn delete_membership(&mut self, membership_id: Uuid) -> AuthzResult<()> {
        self.working
            .memberships
            .remove(&membership_id)
            .map(|_| ())
            .ok_or(AuthzError::NotFound("Membership"))
    }

    async fn commit(&mut self) -> AuthzResult<()> {
        *self.guard = self.working.clone();
        Ok(())
    }
}
