//! Request-scoped authorization context.
//!
//! The principal and its membership snapshot are captured once per request;
//! every decision for that request is evaluated against the same capture.

use uuid::Uuid;

use super::error::{AuthzError, AuthzResult};
use super::store::{AuthzStore, StoreTransaction};
use crate::models::{MembershipSnapshot, Operation, Principal, ResourceDescriptor};
use crate::policy::{Decision, DenyReason, PolicyEvaluator};

/// Fetch the effective memberships of `user_id`.
pub async fn fetch_membership_snapshot(
    store: &dyn AuthzStore,
    user_id: Uuid,
) -> AuthzResult<MembershipSnapshot> {
    let records = store.membership_records(user_id).await?;
    Ok(MembershipSnapshot::from_records(user_id, records))
}

/// Fetch the snapshot for `principal` inside a write transaction.
///
/// Call after `lock_organization` on the organization being mutated, so the
/// principal's role there cannot change before commit.
pub(crate) async fn transaction_snapshot(
    tx: &mut dyn StoreTransaction,
    principal: &Principal,
) -> AuthzResult<MembershipSnapshot> {
    match principal.user_id() {
        Some(user_id) => {
            let records = tx.membership_records(user_id).await?;
            Ok(MembershipSnapshot::from_records(user_id, records))
        }
        None => Ok(MembershipSnapshot::anonymous()),
    }
}

/// Turn a decision into a result for `principal`.
///
/// Anonymous callers get `NotAuthenticated` so they can be sent to sign-in;
/// everyone else gets a reason-free `NotAuthorized`.
pub fn enforce(
    principal: &Principal,
    resource: &ResourceDescriptor,
    op: Operation,
    decision: Decision,
) -> AuthzResult<()> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::Deny(_) if principal.is_anonymous() => Err(AuthzError::NotAuthenticated),
        Decision::Deny(reason) => {
            tracing::warn!(
                user_id = ?principal.user_id(),
                resource = resource.kind(),
                operation = %op,
                reason = %reason,
                "Permission denied"
            );
            Err(AuthzError::NotAuthorized(reason))
        }
    }
}

/// Principal plus its membership snapshot for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    principal: Principal,
    snapshot: MembershipSnapshot,
}

impl RequestContext {
    /// Pair a principal with a snapshot captured for the same user.
    pub fn new(principal: Principal, snapshot: MembershipSnapshot) -> AuthzResult<Self> {
        if snapshot.user_id() != principal.user_id() {
            tracing::error!(
                principal = ?principal.user_id(),
                snapshot_user = ?snapshot.user_id(),
                "Membership snapshot captured for a different user"
            );
            return Err(AuthzError::MalformedRequest(
                "membership snapshot does not belong to the principal".to_string(),
            ));
        }
        Ok(Self {
            principal,
            snapshot,
        })
    }

    /// Capture the snapshot for `principal` from `store`.
    pub async fn load(store: &dyn AuthzStore, principal: Principal) -> AuthzResult<Self> {
        let snapshot = match principal.user_id() {
            Some(user_id) => fetch_membership_snapshot(store, user_id).await?,
            None => MembershipSnapshot::anonymous(),
        };
        Ok(Self {
            principal,
            snapshot,
        })
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn snapshot(&self) -> &MembershipSnapshot {
        &self.snapshot
    }

    pub fn decide(&self, resource: &ResourceDescriptor, op: Operation) -> Decision {
        PolicyEvaluator::decide(&self.principal, &self.snapshot, resource, op)
    }

    pub fn authorize(&self, resource: &ResourceDescriptor, op: Operation) -> AuthzResult<()> {
        enforce(&self.principal, resource, op, self.decide(resource, op))
    }

    /// The error a caller gets for a resource that does not exist.
    ///
    /// Only super-admins learn that it is missing; everyone else sees the
    /// same outcome as a deny.
    pub fn missing(&self, what: &'static str) -> AuthzError {
        if self.principal.is_super_admin() {
            AuthzError::NotFound(what)
        } else if self.principal.is_anonymous() {
            AuthzError::NotAuthenticated
        } else {
            AuthzError::NotAuthorized(DenyReason::NoMatchingRule)
        }
    }
}
