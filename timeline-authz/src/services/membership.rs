//! Membership administration within approved organizations.

use std::sync::Arc;

use uuid::Uuid;

use super::context::{enforce, transaction_snapshot, RequestContext};
use super::error::{AuthzError, AuthzResult};
use super::store::{AuthzStore, StoreTransaction};
use crate::models::{
    Membership, MembershipDescriptor, MembershipSnapshot, NewMember, Operation, OrgRole,
    OrganizationStatus, Principal, ResourceDescriptor,
};
use crate::policy::PolicyEvaluator;

#[derive(Clone)]
pub struct MembershipAdmin {
    store: Arc<dyn AuthzStore>,
}

impl MembershipAdmin {
    pub fn new(store: Arc<dyn AuthzStore>) -> Self {
        Self { store }
    }

    /// Add `req.user_id` to an approved organization.
    pub async fn add_member(
        &self,
        organization_id: Uuid,
        req: NewMember,
        actor: &Principal,
    ) -> AuthzResult<Membership> {
        let mut tx = self.store.begin().await?;
        let organization = tx.lock_organization(organization_id).await?;
        let snapshot = transaction_snapshot(tx.as_mut(), actor).await?;
        authorize_membership(
            actor,
            &snapshot,
            MembershipDescriptor {
                organization_id,
                user_id: req.user_id,
            },
            Operation::Create,
        )?;

        let organization = organization.ok_or(AuthzError::NotFound("Organization"))?;
        if organization.status != OrganizationStatus::Approved {
            return Err(AuthzError::InvalidState {
                organization_id,
                status: organization.status,
            });
        }

        let membership = Membership::new(req.user_id, organization_id, req.role);
        if !tx.insert_membership_if_absent(&membership).await? {
            return Err(AuthzError::Conflict(
                "User is already a member of this organization".to_string(),
            ));
        }
        tx.commit().await?;

        tracing::info!(
            organization_id = %organization_id,
            user_id = %membership.user_id,
            role = %membership.role,
            added_by = ?actor.user_id(),
            "Member added"
        );

        Ok(membership)
    }

    /// Change the role of an existing membership.
    pub async fn update_member_role(
        &self,
        membership_id: Uuid,
        role: OrgRole,
        actor: &Principal,
    ) -> AuthzResult<Membership> {
        let mut tx = self.store.begin().await?;
        let (snapshot, mut membership) = lock_target(tx.as_mut(), membership_id, actor).await?;
        authorize_membership(actor, &snapshot, descriptor(&membership), Operation::Update)?;

        if membership.role == role {
            return Ok(membership);
        }

        tx.update_membership_role(membership_id, role).await?;
        tx.commit().await?;

        tracing::info!(
            membership_id = %membership_id,
            organization_id = %membership.organization_id,
            from = %membership.role,
            to = %role,
            changed_by = ?actor.user_id(),
            "Member role updated"
        );

        membership.role = role;
        Ok(membership)
    }

    /// Remove a membership. Members may always remove themselves.
    pub async fn remove_member(&self, membership_id: Uuid, actor: &Principal) -> AuthzResult<()> {
        let mut tx = self.store.begin().await?;
        let (snapshot, membership) = lock_target(tx.as_mut(), membership_id, actor).await?;
        authorize_membership(actor, &snapshot, descriptor(&membership), Operation::Delete)?;

        tx.delete_membership(membership_id).await?;
        tx.commit().await?;

        tracing::info!(
            membership_id = %membership_id,
            organization_id = %membership.organization_id,
            user_id = %membership.user_id,
            removed_by = ?actor.user_id(),
            "Member removed"
        );

        Ok(())
    }

    /// Members of an organization the actor can read.
    pub async fn list_members(
        &self,
        organization_id: Uuid,
        actor: &Principal,
    ) -> AuthzResult<Vec<Membership>> {
        let ctx = RequestContext::load(self.store.as_ref(), *actor).await?;
        let organization = self
            .store
            .find_organization(organization_id)
            .await?
            .ok_or_else(|| ctx.missing("Organization"))?;
        ctx.authorize(
            &ResourceDescriptor::Organization(organization.descriptor()),
            Operation::Read,
        )?;
        self.store.list_memberships(organization_id).await
    }
}

/// Lock the organization owning `membership_id`, then read the actor's
/// snapshot and the target membership under that lock.
async fn lock_target(
    tx: &mut dyn StoreTransaction,
    membership_id: Uuid,
    actor: &Principal,
) -> AuthzResult<(MembershipSnapshot, Membership)> {
    let organization_id = tx
        .find_membership(membership_id)
        .await?
        .ok_or(AuthzError::NotFound("Membership"))?
        .organization_id;
    tx.lock_organization(organization_id).await?;

    let snapshot = transaction_snapshot(tx, actor).await?;
    // Removed while we waited for the organization lock.
    let membership = tx
        .lock_membership(membership_id)
        .await?
        .ok_or(AuthzError::NotFound("Membership"))?;
    Ok((snapshot, membership))
}

fn descriptor(membership: &Membership) -> MembershipDescriptor {
    MembershipDescriptor {
        organization_id: membership.organization_id,
        user_id: membership.user_id,
    }
}

fn authorize_membership(
    actor: &Principal,
    snapshot: &MembershipSnapshot,
    target: MembershipDescriptor,
    op: Operation,
) -> AuthzResult<()> {
    let resource = ResourceDescriptor::Membership(target);
    enforce(
        actor,
        &resource,
        op,
        PolicyEvaluator::decide(actor, snapshot, &resource, op),
    )
}
