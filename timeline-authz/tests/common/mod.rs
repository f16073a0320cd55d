//! Test helpers for timeline-authz integration tests.
//!
//! Builds the service set over an in-memory store and seeds fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use timeline_authz::{
    models::{Membership, OrgRole, Organization, OrganizationStatus, Principal, Topic},
    services::{AuthzStore, MemoryStore},
    AuthzServices, RequestContext,
};
use uuid::Uuid;

pub struct TestApp {
    pub store: MemoryStore,
    pub services: AuthzServices,
}

impl TestApp {
    pub fn spawn() -> Self {
        let store = MemoryStore::new();
        let services = AuthzServices::new(Arc::new(store.clone()));
        Self { store, services }
    }

    /// Seed an approved organization with `admin` as its OrgAdmin.
    pub async fn approved_org(&self, admin: Uuid) -> Organization {
        let mut org = Organization::new(format!("Org {}", Uuid::new_v4()), admin);
        org.status = OrganizationStatus::Approved;
        self.store.seed_organization(org.clone()).await;
        self.store
            .seed_membership(Membership::new(admin, org.organization_id, OrgRole::OrgAdmin))
            .await;
        org
    }

    pub async fn pending_org(&self, creator: Uuid) -> Organization {
        let org = Organization::new(format!("Org {}", Uuid::new_v4()), creator);
        self.store.seed_organization(org.clone()).await;
        org
    }

    pub async fn add_member(&self, user: Uuid, org: &Organization, role: OrgRole) -> Membership {
        let membership = Membership::new(user, org.organization_id, role);
        self.store.seed_membership(membership.clone()).await;
        membership
    }

    pub async fn org_topic(&self, org: &Organization, is_public: bool) -> Topic {
        let topic = Topic::new(
            Some(org.organization_id),
            "Organization topic".to_string(),
            is_public,
            org.created_by_user_id,
        );
        self.store
            .insert_topic(&topic)
            .await
            .expect("Failed to seed topic");
        topic
    }

    pub async fn legacy_topic(&self, owner: Uuid, is_public: bool) -> Topic {
        let topic = Topic::new(None, "Legacy topic".to_string(), is_public, owner);
        self.store
            .insert_topic(&topic)
            .await
            .expect("Failed to seed topic");
        topic
    }

    pub async fn context(&self, principal: Principal) -> RequestContext {
        self.services
            .context(principal)
            .await
            .expect("Failed to load request context")
    }
}
