//! Resource descriptors handed to the policy evaluator.
//!
//! A descriptor carries every fact a decision needs, so evaluation never has
//! to go back to the store. Event descriptors embed their parent topic.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operation requested on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Operation::Read)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access-relevant facts about a topic.
///
/// `created_by_user_id` is `None` for a topic that does not exist yet (the
/// target of a create, whose owner will be the requesting principal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TopicDescriptor {
    pub organization_id: Option<Uuid>,
    pub is_public: bool,
    pub created_by_user_id: Option<Uuid>,
}

/// Access-relevant facts about an event: its parent topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventDescriptor {
    pub event_id: Option<Uuid>,
    pub topic: TopicDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrganizationDescriptor {
    pub organization_id: Uuid,
    pub created_by_user_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MembershipDescriptor {
    pub organization_id: Uuid,
    pub user_id: Uuid,
}

/// Target of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceDescriptor {
    Topic(TopicDescriptor),
    Event(EventDescriptor),
    Organization(OrganizationDescriptor),
    /// The organization review queue and its lifecycle transitions.
    OrganizationReview,
    Membership(MembershipDescriptor),
}

impl ResourceDescriptor {
    /// Short resource kind for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceDescriptor::Topic(_) => "topic",
            ResourceDescriptor::Event(_) => "event",
            ResourceDescriptor::Organization(_) => "organization",
            ResourceDescriptor::OrganizationReview => "organization_review",
            ResourceDescriptor::Membership(_) => "membership",
        }
    }
}

impl From<TopicDescriptor> for ResourceDescriptor {
    fn from(topic: TopicDescriptor) -> Self {
        ResourceDescriptor::Topic(topic)
    }
}

impl From<EventDescriptor> for ResourceDescriptor {
    fn from(event: EventDescriptor) -> Self {
        ResourceDescriptor::Event(event)
    }
}

impl From<OrganizationDescriptor> for ResourceDescriptor {
    fn from(organization: OrganizationDescriptor) -> Self {
        ResourceDescriptor::Organization(organization)
    }
}

impl From<MembershipDescriptor> for ResourceDescriptor {
    fn from(membership: MembershipDescriptor) -> Self {
        ResourceDescriptor::Membership(membership)
    }
}
