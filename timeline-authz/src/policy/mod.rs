//! Policy evaluator.
//!
//! A pure function from (principal, membership snapshot, resource, operation)
//! to a [`Decision`]. It performs no I/O: every fact it needs is in its
//! arguments, so a rule can never re-enter the store or itself.
//!
//! Rules, first match wins:
//! 1. Super-admins are allowed everything.
//! 2. Topics: read if public, if a member of the topic's organization, or if
//!    the owner of a legacy topic. Writes on organization topics need
//!    `OrgAdmin`/`OrgEditor`. Any authenticated caller may create a legacy
//!    topic; updates and deletes need ownership and a private topic. Legacy
//!    public topics are never modified.
//! 3. Events delegate to their parent topic, with event creation judged as
//!    an update of that topic; anonymous principals never write.
//! 4. Organizations, memberships and the review queue follow the
//!    administrative rules below.
//! 5. Anything else is denied.

mod decision;

pub use decision::{Decision, DenyReason};

use uuid::Uuid;

use crate::models::{
    EventDescriptor, MembershipDescriptor, MembershipSnapshot, Operation, OrganizationDescriptor,
    Principal, ResourceDescriptor, TopicDescriptor,
};

/// Stateless policy evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEvaluator;

impl PolicyEvaluator {
    /// Decide whether `principal` may perform `op` on `resource`.
    pub fn decide(
        principal: &Principal,
        snapshot: &MembershipSnapshot,
        resource: &ResourceDescriptor,
        op: Operation,
    ) -> Decision {
        if principal.is_super_admin() {
            return Decision::Allow;
        }

        if snapshot.user_id() != principal.user_id() {
            tracing::error!(
                principal = ?principal.user_id(),
                snapshot_user = ?snapshot.user_id(),
                resource = resource.kind(),
                operation = %op,
                "Membership snapshot does not belong to the principal"
            );
            return Decision::Deny(DenyReason::SnapshotMismatch);
        }

        let decision = match resource {
            ResourceDescriptor::Topic(topic) => decide_topic(principal, snapshot, topic, op),
            ResourceDescriptor::Event(event) => decide_event(principal, snapshot, event, op),
            ResourceDescriptor::Organization(org) => {
                decide_organization(principal, snapshot, org, op)
            }
            ResourceDescriptor::OrganizationReview => Decision::Deny(DenyReason::SuperAdminOnly),
            ResourceDescriptor::Membership(membership) => {
                decide_membership(principal, snapshot, membership, op)
            }
        };

        if let Decision::Deny(reason) = decision {
            tracing::debug!(
                principal = ?principal.user_id(),
                resource = resource.kind(),
                operation = %op,
                reason = %reason,
                "Policy denied"
            );
        }

        decision
    }
}

fn decide_topic(
    principal: &Principal,
    snapshot: &MembershipSnapshot,
    topic: &TopicDescriptor,
    op: Operation,
) -> Decision {
    match op {
        Operation::Read => {
            if topic.is_public {
                return Decision::Allow;
            }
            match topic.organization_id {
                Some(org) => Decision::allow_if(snapshot.is_member_of(org), DenyReason::NotAMember),
                None => owner_of(principal, topic.created_by_user_id),
            }
        }
        Operation::Create => match topic.organization_id {
            Some(org) => content_editor_in(snapshot, org),
            // The owner of a new legacy topic is always the caller.
            None => Decision::allow_if(!principal.is_anonymous(), DenyReason::AnonymousWrite),
        },
        Operation::Update | Operation::Delete => match topic.organization_id {
            Some(org) => content_editor_in(snapshot, org),
            None if topic.is_public => Decision::Deny(DenyReason::PublicTopicReadOnly),
            None => owner_of(principal, topic.created_by_user_id),
        },
    }
}

fn decide_event(
    principal: &Principal,
    snapshot: &MembershipSnapshot,
    event: &EventDescriptor,
    op: Operation,
) -> Decision {
    if op.is_write() && principal.is_anonymous() {
        return Decision::Deny(DenyReason::AnonymousWrite);
    }
    // Adding an event modifies the existing parent topic.
    let topic_op = match op {
        Operation::Create => Operation::Update,
        other => other,
    };
    decide_topic(principal, snapshot, &event.topic, topic_op)
}

fn decide_organization(
    principal: &Principal,
    snapshot: &MembershipSnapshot,
    org: &OrganizationDescriptor,
    op: Operation,
) -> Decision {
    match op {
        // Creators keep read access to their own organization in every status.
        Operation::Read => Decision::allow_if(
            principal.is_user(org.created_by_user_id),
            DenyReason::NotAMember,
        )
        .or_else(|| {
            Decision::allow_if(snapshot.is_member_of(org.organization_id), DenyReason::NotAMember)
        }),
        Operation::Create => {
            Decision::allow_if(!principal.is_anonymous(), DenyReason::AnonymousWrite)
        }
        Operation::Update => member_manager_in(snapshot, org.organization_id),
        Operation::Delete => Decision::Deny(DenyReason::SuperAdminOnly),
    }
}

fn decide_membership(
    principal: &Principal,
    snapshot: &MembershipSnapshot,
    membership: &MembershipDescriptor,
    op: Operation,
) -> Decision {
    let is_self = principal.is_user(membership.user_id);
    match op {
        Operation::Read => Decision::allow_if(is_self, DenyReason::NotAMember).or_else(|| {
            Decision::allow_if(
                snapshot.is_member_of(membership.organization_id),
                DenyReason::NotAMember,
            )
        }),
        Operation::Create | Operation::Update => {
            member_manager_in(snapshot, membership.organization_id)
        }
        Operation::Delete => member_manager_in(snapshot, membership.organization_id)
            .or_else(|| Decision::allow_if(is_self, DenyReason::InsufficientRole)),
    }
}

fn owner_of(principal: &Principal, created_by: Option<Uuid>) -> Decision {
    match (principal.user_id(), created_by) {
        (Some(user), Some(owner)) if user == owner => Decision::Allow,
        _ => Decision::Deny(DenyReason::NotOwner),
    }
}

fn content_editor_in(snapshot: &MembershipSnapshot, organization_id: Uuid) -> Decision {
    match snapshot.role_in(organization_id) {
        Some(role) => Decision::allow_if(role.can_edit_content(), DenyReason::InsufficientRole),
        None => Decision::Deny(DenyReason::NotAMember),
    }
}

fn member_manager_in(snapshot: &MembershipSnapshot, organization_id: Uuid) -> Decision {
    match snapshot.role_in(organization_id) {
        Some(role) => Decision::allow_if(role.can_manage_members(), DenyReason::InsufficientRole),
        None => Decision::Deny(DenyReason::NotAMember),
    }
}
