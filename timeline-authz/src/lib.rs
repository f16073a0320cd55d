//! Access control for timeline topics, events and organizations.
//!
//! A request resolves its principal, captures a membership snapshot once and
//! evaluates every decision with the pure [`policy::PolicyEvaluator`].
//! Administrative operations run their check and mutation in one store
//! transaction.

pub mod config;
pub mod db;
pub mod models;
pub mod policy;
pub mod services;

use std::sync::Arc;

use crate::services::{AuthzStore, MembershipAdmin, OrganizationRegistry, TopicGuard};

pub use crate::models::{OrgRole, OrganizationStatus, Principal};
pub use crate::policy::{Decision, DenyReason, PolicyEvaluator};
pub use crate::services::{AuthzError, AuthzResult, RequestContext};

/// The service set sharing one store.
#[derive(Clone)]
pub struct AuthzServices {
    pub store: Arc<dyn AuthzStore>,
    pub registry: OrganizationRegistry,
    pub members: MembershipAdmin,
    pub topics: TopicGuard,
}

impl AuthzServices {
    pub fn new(store: Arc<dyn AuthzStore>) -> Self {
        Self {
            registry: OrganizationRegistry::new(store.clone()),
            members: MembershipAdmin::new(store.clone()),
            topics: TopicGuard::new(store.clone()),
            store,
        }
    }

    /// Capture the request context for `principal`.
    pub async fn context(&self, principal: Principal) -> AuthzResult<RequestContext> {
        RequestContext::load(self.store.as_ref(), principal).await
    }
}
