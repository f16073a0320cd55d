//! Organization registry and review lifecycle.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::context::{enforce, transaction_snapshot, RequestContext};
use super::error::{AuthzError, AuthzResult};
use super::store::AuthzStore;
use crate::models::{
    Membership, NewOrganization, Operation, OrgRole, Organization, OrganizationStatus, Principal,
    ResourceDescriptor,
};
use crate::policy::PolicyEvaluator;

#[derive(Clone)]
pub struct OrganizationRegistry {
    store: Arc<dyn AuthzStore>,
}

impl OrganizationRegistry {
    pub fn new(store: Arc<dyn AuthzStore>) -> Self {
        Self { store }
    }

    /// Create a Pending organization owned by `actor`.
    pub async fn register_organization(
        &self,
        req: NewOrganization,
        actor: &Principal,
    ) -> AuthzResult<Organization> {
        req.validate()?;
        let creator = actor.require_authenticated()?;
        let organization = Organization::new(req.name.trim().to_string(), creator);

        let mut tx = self.store.begin().await?;
        let snapshot = transaction_snapshot(tx.as_mut(), actor).await?;
        let resource = ResourceDescriptor::Organization(organization.descriptor());
        enforce(
            actor,
            &resource,
            Operation::Create,
            PolicyEvaluator::decide(actor, &snapshot, &resource, Operation::Create),
        )?;

        tx.insert_organization(&organization).await?;
        tx.commit().await?;

        tracing::info!(
            organization_id = %organization.organization_id,
            created_by = %creator,
            "Organization registered for review"
        );

        Ok(organization)
    }

    /// Approve a Pending organization and make its creator an OrgAdmin.
    pub async fn approve_organization(
        &self,
        organization_id: Uuid,
        actor: &Principal,
    ) -> AuthzResult<Organization> {
        self.review(organization_id, actor, OrganizationStatus::Approved)
            .await
    }

    /// Reject a Pending organization. No membership is created.
    pub async fn reject_organization(
        &self,
        organization_id: Uuid,
        actor: &Principal,
    ) -> AuthzResult<Organization> {
        self.review(organization_id, actor, OrganizationStatus::Rejected)
            .await
    }

    /// Status change, creator membership and authorization check share one
    /// transaction; the organization row stays locked until commit.
    async fn review(
        &self,
        organization_id: Uuid,
        actor: &Principal,
        next: OrganizationStatus,
    ) -> AuthzResult<Organization> {
        let mut tx = self.store.begin().await?;
        let snapshot = transaction_snapshot(tx.as_mut(), actor).await?;
        let resource = ResourceDescriptor::OrganizationReview;
        enforce(
            actor,
            &resource,
            Operation::Update,
            PolicyEvaluator::decide(actor, &snapshot, &resource, Operation::Update),
        )?;

        let mut organization = tx
            .lock_organization(organization_id)
            .await?
            .ok_or(AuthzError::NotFound("Organization"))?;

        if !organization.status.can_transition_to(next) {
            return Err(AuthzError::InvalidState {
                organization_id,
                status: organization.status,
            });
        }

        let reviewed_utc = Utc::now();
        tx.set_organization_status(organization_id, next, reviewed_utc)
            .await?;

        if next == OrganizationStatus::Approved {
            let admin = Membership::new(
                organization.created_by_user_id,
                organization_id,
                OrgRole::OrgAdmin,
            );
            if !tx.insert_membership_if_absent(&admin).await? {
                tracing::debug!(
                    organization_id = %organization_id,
                    user_id = %organization.created_by_user_id,
                    "Creator already a member; keeping existing role"
                );
            }
        }

        tx.commit().await?;

        organization.status = next;
        organization.reviewed_utc = Some(reviewed_utc);

        tracing::info!(
            organization_id = %organization_id,
            status = %next,
            reviewed_by = ?actor.user_id(),
            "Organization reviewed"
        );

        Ok(organization)
    }

    /// Organizations awaiting review, oldest first.
    ///
    /// Callers who may not review see an empty queue rather than an error.
    pub async fn list_pending_organizations(
        &self,
        actor: &Principal,
    ) -> AuthzResult<Vec<Organization>> {
        let ctx = RequestContext::load(self.store.as_ref(), *actor).await?;
        let queue = ResourceDescriptor::OrganizationReview;
        match ctx.authorize(&queue, Operation::Read) {
            Ok(()) => {}
            Err(AuthzError::NotAuthorized(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        }
        self.store
            .list_organizations_by_status(OrganizationStatus::Pending)
            .await
    }

    /// Organizations `actor` created (any status) or belongs to (approved only).
    pub async fn list_my_organizations(
        &self,
        actor: &Principal,
    ) -> AuthzResult<Vec<Organization>> {
        let user_id = actor.require_authenticated()?;
        let organizations = self.store.list_organizations_for_user(user_id).await?;
        Ok(organizations
            .into_iter()
            .filter(|org| org.created_by_user_id == user_id || org.is_approved())
            .collect())
    }

    /// Load an organization visible to `actor`.
    pub async fn find_organization(
        &self,
        organization_id: Uuid,
        actor: &Principal,
    ) -> AuthzResult<Organization> {
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
        Ok(organization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    fn registry() -> (MemoryStore, OrganizationRegistry) {
        let store = MemoryStore::new();
        let registry = OrganizationRegistry::new(Arc::new(store.clone()));
        (store, registry)
    }

    #[tokio::test]
    async fn test_register_requires_authentication() {
        let (_, registry) = registry();
        let result = registry
            .register_organization(
                NewOrganization {
                    name: "Archive".to_string(),
                },
                &Principal::anonymous(),
            )
            .await;
        assert!(matches!(result, Err(AuthzError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_register_rejects_empty_name() {
        let (_, registry) = registry();
        let result = registry
            .register_organization(
                NewOrganization {
                    name: String::new(),
                },
                &Principal::user(Uuid::new_v4()),
            )
            .await;
        assert!(matches!(result, Err(AuthzError::Validation(_))));
    }

    #[tokio::test]
    async fn test_approve_inserts_creator_admin_membership() {
        let (store, registry) = registry();
        let creator = Uuid::new_v4();
        let org = registry
            .register_organization(
                NewOrganization {
                    name: "Historians".to_string(),
                },
                &Principal::user(creator),
            )
            .await
            .unwrap();
        assert_eq!(org.status, OrganizationStatus::Pending);

        let approved = registry
            .approve_organization(org.organization_id, &Principal::super_admin(Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(approved.status, OrganizationStatus::Approved);
        assert!(approved.reviewed_utc.is_some());

        let members = store.list_memberships(org.organization_id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, creator);
        assert_eq!(members[0].role, OrgRole::OrgAdmin);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_review() {
        let (store, registry) = registry();
        let org = Organization::new("Pending".to_string(), Uuid::new_v4());
        store.seed_organization(org.clone()).await;

        let err = registry
            .approve_organization(org.organization_id, &Principal::user(org.created_by_user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::NotAuthorized(_)));

        let stored = store.find_organization(org.organization_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrganizationStatus::Pending);
    }

    #[tokio::test]
    async fn test_review_of_unknown_organization_is_not_found() {
        let (_, registry) = registry();
        let err = registry
            .reject_organization(Uuid::new_v4(), &Principal::super_admin(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::NotFound("Organization")));
    }

    #[tokio::test]
    async fn test_pending_queue_is_empty_for_organization_admins() {
        let (store, registry) = registry();
        let admin = Uuid::new_v4();
        let mut approved = Organization::new("Approved".to_string(), admin);
        approved.status = OrganizationStatus::Approved;
        store.seed_organization(approved.clone()).await;
        store
            .seed_membership(Membership::new(admin, approved.organization_id, OrgRole::OrgAdmin))
            .await;
        store
            .seed_organization(Organization::new("Waiting".to_string(), admin))
            .await;

        let queue = registry
            .list_pending_organizations(&Principal::user(admin))
            .await
            .unwrap();
        assert!(queue.is_empty());

        let queue = registry
            .list_pending_organizations(&Principal::super_admin(Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);

        let err = registry
            .list_pending_organizations(&Principal::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_list_my_organizations_hides_unapproved_memberships() {
        let (store, registry) = registry();
        let user = Uuid::new_v4();

        let own_pending = Organization::new("Mine".to_string(), user);
        let foreign_pending = Organization::new("Theirs".to_string(), Uuid::new_v4());
        store.seed_organization(own_pending.clone()).await;
        store.seed_organization(foreign_pending.clone()).await;
        store
            .seed_membership(Membership::new(
                user,
                foreign_pending.organization_id,
                OrgRole::OrgEditor,
            ))
            .await;

        let mine = registry
            .list_my_organizations(&Principal::user(user))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].organization_id, own_pending.organization_id);
    }
}
